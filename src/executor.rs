//! Effect execution with cancellation support.
//!
//! `TrackerExecutor` is the only path from the traversal and scans to the
//! tracker. Every call is raced against the run's `CancellationToken`, so an
//! operator interrupt stops a long stale scan mid-request (including mid
//! backoff sleep) instead of after it.

use std::fmt;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse, IssuePage, SubIssueList};
use crate::types::{Issue, IssueNumber};

/// Errors from effect execution.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Operation was cancelled via CancellationToken.
    #[error("operation cancelled")]
    Cancelled,

    /// The interpreter failed (after its own retries).
    #[error("{0}")]
    Remote(String),

    /// The interpreter answered with a response for a different effect.
    #[error("unexpected response '{actual}' to {effect}")]
    UnexpectedResponse {
        effect: &'static str,
        actual: &'static str,
    },
}

impl ExecError {
    /// Returns true if this is a cancellation error.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecError::Cancelled)
    }
}

/// Executes effects with cancellation support.
///
/// # Type Parameters
///
/// * `G` - The GitHub interpreter type
pub struct TrackerExecutor<G> {
    github: G,
    cancel: CancellationToken,
}

impl<G> TrackerExecutor<G>
where
    G: GitHubInterpreter,
    G::Error: fmt::Display,
{
    /// Creates a new executor.
    pub fn new(github: G, cancel: CancellationToken) -> Self {
        TrackerExecutor { github, cancel }
    }

    /// Returns true if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns the cancellation token shared with this executor.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the wrapped interpreter.
    pub fn interpreter(&self) -> &G {
        &self.github
    }

    /// Executes an effect, racing it against cancellation.
    ///
    /// Returns `Err(ExecError::Cancelled)` if the token was triggered before
    /// or during execution.
    #[instrument(level = "trace", skip(self), fields(effect = ?effect))]
    pub async fn execute(&self, effect: GitHubEffect) -> Result<GitHubResponse, ExecError> {
        if self.cancel.is_cancelled() {
            debug!("Cancellation detected before effect execution");
            return Err(ExecError::Cancelled);
        }

        trace!("Executing GitHub effect");

        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => {
                debug!("GitHub effect cancelled");
                Err(ExecError::Cancelled)
            }
            result = self.github.interpret(effect) => {
                result.map_err(|e| ExecError::Remote(e.to_string()))
            }
        }
    }

    // ─── Typed helpers ────────────────────────────────────────────────────────

    /// Fetches one issue's own metadata.
    pub async fn get_issue(&self, issue: IssueNumber) -> Result<Option<Issue>, ExecError> {
        match self.execute(GitHubEffect::GetIssue { issue }).await? {
            GitHubResponse::Issue(issue) => Ok(issue),
            other => Err(unexpected("get_issue", &other)),
        }
    }

    /// Fetches the sub-issues of several parents in one request.
    pub async fn get_sub_issues(
        &self,
        parents: Vec<IssueNumber>,
        per_parent: u32,
    ) -> Result<Vec<SubIssueList>, ExecError> {
        let effect = GitHubEffect::GetSubIssues {
            parents,
            per_parent,
        };
        match self.execute(effect).await? {
            GitHubResponse::SubIssues(lists) => Ok(lists),
            other => Err(unexpected("get_sub_issues", &other)),
        }
    }

    /// Searches open issues by label and type.
    pub async fn search_open_issues(
        &self,
        labels: Vec<String>,
        issue_types: Vec<String>,
        limit: u32,
    ) -> Result<Vec<Issue>, ExecError> {
        let effect = GitHubEffect::SearchOpenIssues {
            labels,
            issue_types,
            limit,
        };
        match self.execute(effect).await? {
            GitHubResponse::IssueList(issues) => Ok(issues),
            other => Err(unexpected("search_open_issues", &other)),
        }
    }

    /// Lists one page of open issues, least recently updated first.
    pub async fn list_open_issues_by_updated(
        &self,
        after: Option<String>,
        per_page: u32,
    ) -> Result<IssuePage, ExecError> {
        let effect = GitHubEffect::ListOpenIssuesByUpdated { after, per_page };
        match self.execute(effect).await? {
            GitHubResponse::IssuePage(page) => Ok(page),
            other => Err(unexpected("list_open_issues_by_updated", &other)),
        }
    }

    /// Posts a comment and returns its id.
    pub async fn post_comment(&self, issue: IssueNumber, body: String) -> Result<u64, ExecError> {
        match self.execute(GitHubEffect::PostComment { issue, body }).await? {
            GitHubResponse::CommentPosted { id } => Ok(id),
            other => Err(unexpected("post_comment", &other)),
        }
    }
}

fn unexpected(effect: &'static str, actual: &GitHubResponse) -> ExecError {
    ExecError::UnexpectedResponse {
        effect,
        actual: actual.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::time::Duration;

    /// Mock GitHub interpreter for testing.
    struct MockGitHubInterpreter {
        response: GitHubResponse,
    }

    impl GitHubInterpreter for MockGitHubInterpreter {
        type Error = String;

        fn interpret(
            &self,
            _effect: GitHubEffect,
        ) -> impl Future<Output = Result<GitHubResponse, Self::Error>> + Send {
            let response = self.response.clone();
            async move { Ok(response) }
        }
    }

    /// Mock interpreter that delays before returning, allowing cancellation to happen during execution.
    struct DelayingGitHubInterpreter {
        delay_ms: u64,
    }

    impl GitHubInterpreter for DelayingGitHubInterpreter {
        type Error = String;

        fn interpret(
            &self,
            _effect: GitHubEffect,
        ) -> impl Future<Output = Result<GitHubResponse, Self::Error>> + Send {
            let delay_ms = self.delay_ms;
            async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(GitHubResponse::CommentPosted { id: 1 })
            }
        }
    }

    struct FailingGitHubInterpreter;

    impl GitHubInterpreter for FailingGitHubInterpreter {
        type Error = String;

        fn interpret(
            &self,
            _effect: GitHubEffect,
        ) -> impl Future<Output = Result<GitHubResponse, Self::Error>> + Send {
            async { Err("502 bad gateway".to_string()) }
        }
    }

    #[tokio::test]
    async fn typed_helper_unwraps_matching_response() {
        let mock = MockGitHubInterpreter {
            response: GitHubResponse::CommentPosted { id: 77 },
        };
        let executor = TrackerExecutor::new(mock, CancellationToken::new());

        let id = executor
            .post_comment(IssueNumber(1), "hello".into())
            .await
            .unwrap();
        assert_eq!(id, 77);
    }

    #[tokio::test]
    async fn typed_helper_rejects_mismatched_response() {
        let mock = MockGitHubInterpreter {
            response: GitHubResponse::CommentPosted { id: 77 },
        };
        let executor = TrackerExecutor::new(mock, CancellationToken::new());

        let result = executor.get_issue(IssueNumber(1)).await;
        assert!(matches!(
            result,
            Err(ExecError::UnexpectedResponse {
                effect: "get_issue",
                actual: "comment_posted"
            })
        ));
    }

    #[tokio::test]
    async fn remote_errors_are_stringified() {
        let executor = TrackerExecutor::new(FailingGitHubInterpreter, CancellationToken::new());

        let err = executor.get_issue(IssueNumber(5)).await.unwrap_err();
        assert!(matches!(err, ExecError::Remote(ref msg) if msg == "502 bad gateway"));
        assert!(!err.is_cancelled());
    }

    #[tokio::test]
    async fn execute_cancelled_before_start() {
        let mock = MockGitHubInterpreter {
            response: GitHubResponse::CommentPosted { id: 1 },
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let executor = TrackerExecutor::new(mock, cancel);
        let result = executor.execute(GitHubEffect::GetIssue { issue: IssueNumber(1) }).await;
        assert!(matches!(result, Err(ExecError::Cancelled)));
    }

    #[tokio::test]
    async fn cancellation_interrupts_inflight_effect() {
        let mock = DelayingGitHubInterpreter { delay_ms: 1000 };
        let cancel = CancellationToken::new();
        let executor = TrackerExecutor::new(mock, cancel.clone());

        let result = tokio::select! {
            result = executor.execute(GitHubEffect::GetIssue { issue: IssueNumber(1) }) => result,
            _ = async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
                tokio::time::sleep(Duration::from_millis(100)).await;
            } => {
                unreachable!("The effect should be cancelled before this completes")
            }
        };

        assert!(
            matches!(result, Err(ExecError::Cancelled)),
            "Effect should be cancelled: {:?}",
            result
        );
    }
}
