//! Octocrab client wrapper scoped to a specific repository.
//!
//! Effects don't carry repository information, so the client that executes
//! them does. One `OctocrabClient` serves one run against one repository.

use octocrab::Octocrab;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::types::RepoId;

use super::error::{GitHubApiError, GraphQlError};
use super::retry::RetryConfig;

/// A GitHub API client scoped to a single repository.
#[derive(Clone)]
pub struct OctocrabClient {
    client: Octocrab,
    repo: RepoId,
    retry: RetryConfig,
}

/// The top-level shape of every GraphQL response.
#[derive(Debug, serde::Deserialize)]
struct GraphQlEnvelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

impl OctocrabClient {
    /// Wraps a pre-configured Octocrab instance.
    ///
    /// Use this when authentication is set up elsewhere (GitHub App
    /// installation tokens, custom base URLs for GitHub Enterprise).
    pub fn new(client: Octocrab, repo: RepoId) -> Self {
        Self {
            client,
            repo,
            retry: RetryConfig::DEFAULT,
        }
    }

    /// Creates a client authenticated with a bearer token.
    pub fn from_token(token: impl Into<String>, repo: RepoId) -> Result<Self, octocrab::Error> {
        let client = Octocrab::builder().personal_token(token.into()).build()?;
        Ok(Self::new(client, repo))
    }

    /// Replaces the retry configuration used by the effect interpreter.
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the retry configuration used by the effect interpreter.
    pub fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    /// Returns a reference to the underlying octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.client
    }

    /// Returns the repository this client is scoped to.
    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    /// Returns the repository owner.
    pub fn owner(&self) -> &str {
        &self.repo.owner
    }

    /// Returns the repository name.
    pub fn repo_name(&self) -> &str {
        &self.repo.repo
    }

    /// Runs a GraphQL query and unwraps the `data` member.
    ///
    /// Partial responses (data plus errors) are accepted and the errors are
    /// logged, because a batched query can legitimately fail for a single
    /// alias (e.g. a transferred issue) while the rest succeed.
    pub async fn graphql<T, V>(&self, query: &str, variables: &V) -> Result<T, GitHubApiError>
    where
        T: DeserializeOwned,
        V: Serialize + ?Sized,
    {
        let payload = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        // octocrab only parses the body as JSON; an error there means the
        // server sent something else. Our own schema is applied afterwards so
        // that a shape mismatch is not mistaken for a server failure.
        let body: serde_json::Value = self
            .client
            .graphql(&payload)
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        let envelope = decode_envelope::<T>(body)?;

        match envelope.data {
            Some(data) => {
                for error in &envelope.errors {
                    tracing::debug!(
                        error_type = error.error_type.as_deref().unwrap_or("unknown"),
                        message = %error.message,
                        "Partial GraphQL error"
                    );
                }
                Ok(data)
            }
            None => Err(GitHubApiError::from_graphql_errors(&envelope.errors)),
        }
    }
}

fn decode_envelope<T: DeserializeOwned>(body: serde_json::Value) -> Result<GraphQlEnvelope<T>, GitHubApiError> {
    serde_json::from_value(body).map_err(|e| {
        GitHubApiError::permanent_without_source(format!("unexpected GraphQL response shape: {e}"))
    })
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient")
            .field("repo", &self.repo)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::GitHubErrorKind;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Viewer {
        login: String,
    }

    #[test]
    fn envelope_with_data_decodes() {
        let envelope =
            decode_envelope::<Viewer>(json!({ "data": { "login": "octocat" } })).unwrap();
        assert_eq!(envelope.data.unwrap().login, "octocat");
        assert!(envelope.errors.is_empty());
    }

    #[test]
    fn schema_mismatch_is_permanent() {
        let err = decode_envelope::<Viewer>(json!({ "data": { "login": 7 } })).unwrap_err();
        assert_eq!(err.kind, GitHubErrorKind::Permanent);
        assert!(err.message.starts_with("unexpected GraphQL response shape"));
    }
}
