//! GitHub effect interpreter using octocrab.
//!
//! Reads go through GraphQL (sub-issues and aliased batching are only
//! available there); the one write, creating a comment, uses REST. Every
//! effect runs inside `retry_with_backoff`.

use serde::Serialize;

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse, IssuePage, SubIssueList};
use crate::types::IssueNumber;

use super::client::OctocrabClient;
use super::error::GitHubApiError;
use super::queries::{
    self, ISSUE_QUERY, IssueQueryData, SEARCH_QUERY, STALE_PAGE_QUERY, SearchData, StalePageData,
    SubIssuesData,
};
use super::retry::{RetryConfig, RetryPolicy, retry_with_backoff};

// ─── Interpreter Implementation ───────────────────────────────────────────────

impl GitHubInterpreter for OctocrabClient {
    type Error = GitHubApiError;

    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, Self::Error> {
        interpret_github_effect(
            self,
            effect,
            self.retry_config(),
            RetryPolicy::RetryTransient,
        )
        .await
    }
}

/// Interprets a GitHub effect, executing it against the GitHub API.
///
/// This is the main entry point for effect interpretation. It handles retry
/// logic and proper error categorization.
pub async fn interpret_github_effect(
    client: &OctocrabClient,
    effect: GitHubEffect,
    retry_config: RetryConfig,
    retry_policy: RetryPolicy,
) -> Result<GitHubResponse, GitHubApiError> {
    let result = retry_with_backoff(retry_config, retry_policy, || {
        execute_effect(client, effect.clone())
    })
    .await;

    result.into_result()
}

/// Executes a single effect without retry logic.
async fn execute_effect(
    client: &OctocrabClient,
    effect: GitHubEffect,
) -> Result<GitHubResponse, GitHubApiError> {
    match effect {
        GitHubEffect::GetIssue { issue } => get_issue(client, issue).await,
        GitHubEffect::GetSubIssues {
            parents,
            per_parent,
        } => get_sub_issues(client, &parents, per_parent).await,
        GitHubEffect::SearchOpenIssues {
            labels,
            issue_types,
            limit,
        } => search_open_issues(client, &labels, &issue_types, limit).await,
        GitHubEffect::ListOpenIssuesByUpdated { after, per_page } => {
            list_open_issues_by_updated(client, after, per_page).await
        }
        GitHubEffect::PostComment { issue, body } => post_comment(client, issue, body).await,
    }
}

#[derive(Serialize)]
struct RepoVariables<'a> {
    owner: &'a str,
    name: &'a str,
}

// ─── Issue Queries ────────────────────────────────────────────────────────────

async fn get_issue(
    client: &OctocrabClient,
    issue: IssueNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    #[derive(Serialize)]
    struct Variables<'a> {
        owner: &'a str,
        name: &'a str,
        number: i64,
    }

    let variables = Variables {
        owner: client.owner(),
        name: client.repo_name(),
        number: issue.0 as i64,
    };

    let data: IssueQueryData = client
        .graphql(&queries::with_issue_fields(ISSUE_QUERY), &variables)
        .await?;

    let issue = data
        .repository
        .and_then(|r| r.issue)
        .and_then(|node| node.into_issue());
    Ok(GitHubResponse::Issue(issue))
}

async fn get_sub_issues(
    client: &OctocrabClient,
    parents: &[IssueNumber],
    per_parent: u32,
) -> Result<GitHubResponse, GitHubApiError> {
    if parents.is_empty() {
        return Ok(GitHubResponse::SubIssues(Vec::new()));
    }

    #[derive(Serialize)]
    struct Variables<'a> {
        #[serde(flatten)]
        repo: RepoVariables<'a>,
        first: u32,
    }

    let variables = Variables {
        repo: RepoVariables {
            owner: client.owner(),
            name: client.repo_name(),
        },
        first: per_parent,
    };

    let data: SubIssuesData = client
        .graphql(&queries::sub_issues_query(parents), &variables)
        .await?;

    let mut by_alias = data.repository.ok_or_else(|| {
        GitHubApiError::permanent_without_source(format!(
            "repository {} not found",
            client.repo()
        ))
    })?;

    let lists = parents
        .iter()
        .enumerate()
        .map(|(index, &parent)| {
            let node = by_alias.remove(&queries::parent_alias(index)).flatten();
            match node.and_then(|n| n.sub_issues) {
                Some(connection) => SubIssueList {
                    parent,
                    children: Some(queries::decode_issue_nodes(connection.nodes)),
                    has_more: connection.page_info.has_next_page,
                },
                None => SubIssueList {
                    parent,
                    children: None,
                    has_more: false,
                },
            }
        })
        .collect();

    Ok(GitHubResponse::SubIssues(lists))
}

async fn search_open_issues(
    client: &OctocrabClient,
    labels: &[String],
    issue_types: &[String],
    limit: u32,
) -> Result<GitHubResponse, GitHubApiError> {
    #[derive(Serialize)]
    struct Variables {
        query: String,
        first: u32,
    }

    let variables = Variables {
        query: queries::search_string(client.owner(), client.repo_name(), labels, issue_types),
        first: limit,
    };
    tracing::debug!(query = %variables.query, "Searching for candidate parents");

    let data: SearchData = client
        .graphql(&queries::with_issue_fields(SEARCH_QUERY), &variables)
        .await?;

    let issues = data
        .search
        .map(|connection| {
            connection
                .into_nodes()
                .filter_map(|node| node.into_issue())
                .filter(|issue| issue.state.is_open())
                .collect()
        })
        .unwrap_or_default();

    Ok(GitHubResponse::IssueList(issues))
}

async fn list_open_issues_by_updated(
    client: &OctocrabClient,
    after: Option<String>,
    per_page: u32,
) -> Result<GitHubResponse, GitHubApiError> {
    #[derive(Serialize)]
    struct Variables<'a> {
        #[serde(flatten)]
        repo: RepoVariables<'a>,
        first: u32,
        after: Option<String>,
    }

    let variables = Variables {
        repo: RepoVariables {
            owner: client.owner(),
            name: client.repo_name(),
        },
        first: per_page,
        after,
    };

    let data: StalePageData = client
        .graphql(&queries::with_issue_fields(STALE_PAGE_QUERY), &variables)
        .await?;

    let issues = data
        .repository
        .and_then(|r| r.issues)
        .ok_or_else(|| {
            GitHubApiError::permanent_without_source(format!(
                "repository {} not found",
                client.repo()
            ))
        })?;

    let next_cursor = if issues.page_info.has_next_page {
        issues.page_info.end_cursor
    } else {
        None
    };

    Ok(GitHubResponse::IssuePage(IssuePage {
        issues: queries::decode_issue_nodes(issues.nodes),
        next_cursor,
    }))
}

// ─── Comments ─────────────────────────────────────────────────────────────────

async fn post_comment(
    client: &OctocrabClient,
    issue: IssueNumber,
    body: String,
) -> Result<GitHubResponse, GitHubApiError> {
    let result = client
        .inner()
        .issues(client.owner(), client.repo_name())
        .create_comment(issue.0, body)
        .await;

    match result {
        Ok(comment) => Ok(GitHubResponse::CommentPosted {
            id: comment.id.into_inner(),
        }),
        Err(e) => Err(GitHubApiError::from_octocrab(e)),
    }
}
