//! Issue, comment and actor types.
//!
//! These are the decoded forms of tracker payloads. Everything the traversal
//! and scans look at passes through these types; raw JSON never leaves the
//! `github` module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::IssueNumber;

/// Whether an issue is open or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    /// Parses a GraphQL `IssueState` value. Unknown values are treated as open.
    pub fn from_graphql(s: &str) -> Self {
        if s.eq_ignore_ascii_case("CLOSED") {
            IssueState::Closed
        } else {
            IssueState::Open
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, IssueState::Open)
    }
}

/// What kind of account authored a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// A regular user account.
    User,
    /// An account the tracker itself tags as automated (GitHub Apps).
    Bot,
    /// Anything else (organizations, mannequins, enterprise accounts).
    Other,
}

impl ActorKind {
    /// Maps a GraphQL `Actor.__typename` to an actor kind.
    pub fn from_typename(typename: &str) -> Self {
        match typename {
            "User" => ActorKind::User,
            "Bot" => ActorKind::Bot,
            _ => ActorKind::Other,
        }
    }
}

/// The author of a comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub login: String,
    pub kind: ActorKind,
}

impl Actor {
    pub fn new(login: impl Into<String>, kind: ActorKind) -> Self {
        Actor {
            login: login.into(),
            kind,
        }
    }

    pub fn user(login: impl Into<String>) -> Self {
        Self::new(login, ActorKind::User)
    }

    pub fn bot(login: impl Into<String>) -> Self {
        Self::new(login, ActorKind::Bot)
    }
}

/// The most recent comment on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// `None` when the author's account has been deleted.
    pub author: Option<Actor>,
    /// `None` when the remote timestamp could not be parsed.
    pub created_at: Option<DateTime<Utc>>,
}

/// A trackable work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: IssueNumber,
    pub title: String,
    /// `None` when the remote timestamp could not be parsed.
    pub updated_at: Option<DateTime<Utc>>,
    pub state: IssueState,
    pub last_comment: Option<Comment>,
}

impl Issue {
    /// Creates an open issue with no comments.
    pub fn new(number: IssueNumber, title: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Issue {
            number,
            title: title.into(),
            updated_at: Some(updated_at),
            state: IssueState::Open,
            last_comment: None,
        }
    }

    /// Sets the most recent comment.
    pub fn with_comment(mut self, author: Actor, created_at: DateTime<Utc>) -> Self {
        self.last_comment = Some(Comment {
            author: Some(author),
            created_at: Some(created_at),
        });
        self
    }
}

/// Parses an RFC 3339 timestamp as returned by the GitHub API.
///
/// Returns `None` for values that do not parse; callers exclude such records
/// rather than guessing a time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
