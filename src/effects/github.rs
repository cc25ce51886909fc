//! GitHub API effect types.
//!
//! These types describe tracker operations as data, without executing them.
//! The octocrab interpreter in `crate::github` executes them against the real
//! API; `crate::test_utils::FakeTracker` answers them from an in-memory graph.

use serde::{Deserialize, Serialize};

use crate::types::{Issue, IssueNumber};

/// A GitHub API effect.
///
/// Effects are repo-scoped: the interpreter is constructed with a `RepoId`,
/// so effects don't include it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubEffect {
    // ─── Issue Queries ────────────────────────────────────────────────────────
    /// Fetch a single issue's own metadata (used for the freshness pre-check).
    GetIssue { issue: IssueNumber },

    /// Fetch the sub-issues of several parents in one round trip.
    ///
    /// Each child carries its own `updatedAt` and last comment so the
    /// classifier can run without further requests.
    GetSubIssues {
        parents: Vec<IssueNumber>,
        /// Maximum number of children fetched per parent.
        per_parent: u32,
    },

    /// Search open issues carrying any of `labels` and any of `issue_types`.
    ///
    /// Within a field the values are OR'd; across fields they are AND'd. An
    /// empty field does not constrain the search.
    SearchOpenIssues {
        labels: Vec<String>,
        issue_types: Vec<String>,
        limit: u32,
    },

    /// List one page of open issues ordered by `updatedAt`, oldest first.
    ListOpenIssuesByUpdated {
        /// Continuation cursor from the previous page, `None` for the first.
        after: Option<String>,
        per_page: u32,
    },

    // ─── Comments ─────────────────────────────────────────────────────────────
    /// Post a new comment on an issue.
    PostComment { issue: IssueNumber, body: String },
}

impl GitHubEffect {
    /// Returns true if executing this effect changes remote state.
    pub fn is_write(&self) -> bool {
        matches!(self, GitHubEffect::PostComment { .. })
    }
}

// ─── Response Types ───────────────────────────────────────────────────────────

/// The sub-issues of one parent, as returned by a batched query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubIssueList {
    /// The parent whose children these are.
    pub parent: IssueNumber,
    /// `None` when the response carried no data for this parent (the issue
    /// does not exist, was transferred, or the payload was partial).
    pub children: Option<Vec<Issue>>,
    /// True if the parent has more children than were fetched.
    pub has_more: bool,
}

/// One page of issues from a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePage {
    pub issues: Vec<Issue>,
    /// Cursor for the next page, `None` on the last page.
    pub next_cursor: Option<String>,
}

/// Response from a GitHub effect.
///
/// Each variant corresponds to the response from a particular effect type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GitHubResponse {
    /// Response to `GetIssue`. `None` if the issue does not exist.
    Issue(Option<Issue>),

    /// Response to `GetSubIssues`, one entry per requested parent in order.
    SubIssues(Vec<SubIssueList>),

    /// Response to `SearchOpenIssues`.
    IssueList(Vec<Issue>),

    /// Response to `ListOpenIssuesByUpdated`.
    IssuePage(IssuePage),

    /// Response to `PostComment`.
    CommentPosted { id: u64 },
}

impl GitHubResponse {
    /// Short name of the variant, for "unexpected response" diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            GitHubResponse::Issue(_) => "issue",
            GitHubResponse::SubIssues(_) => "sub_issues",
            GitHubResponse::IssueList(_) => "issue_list",
            GitHubResponse::IssuePage(_) => "issue_page",
            GitHubResponse::CommentPosted { .. } => "comment_posted",
        }
    }
}
