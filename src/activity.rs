//! Human-vs-bot classification of an issue's last update.
//!
//! A sub-issue's `updatedAt` moves whenever anyone comments, including the
//! stale bot that warns about inactivity and this bot itself. If such a
//! comment is what moved the timestamp, the update must not count as
//! activity, otherwise the two automations keep each other alive forever.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{ActorKind, Issue};

/// Actor ignored when no explicit list is configured.
pub const DEFAULT_IGNORED_ACTOR: &str = "github-actions";

/// Login fragments of well-known automation products.
const BOT_PRODUCT_MARKERS: &[&str] = &["dependabot", "renovate", "github-actions", "stale"];

/// Why an update was or wasn't counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityReason {
    /// No comment at all: the update came from an edit, label change, etc.
    NoComment,
    /// The last comment is by a human.
    HumanComment,
    /// A bot or ignored actor commented, but something else moved `updatedAt` since.
    AutomatedCommentOlderThanUpdate,
    /// A bot-authored comment is what moved `updatedAt`.
    BotComment,
    /// An ignored actor's comment is what moved `updatedAt`.
    IgnoredActorComment,
    /// The issue's own `updatedAt` could not be parsed.
    UnknownUpdateTime,
}

/// The classifier's verdict for one issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub genuine: bool,
    pub reason: ActivityReason,
}

impl Classification {
    fn genuine(reason: ActivityReason) -> Self {
        Classification {
            genuine: true,
            reason,
        }
    }

    fn discounted(reason: ActivityReason) -> Self {
        Classification {
            genuine: false,
            reason,
        }
    }
}

/// Returns true if `login` looks like an automated account.
///
/// Matches (case-insensitive) a `[bot]` suffix, a known automation product
/// name, or `bot` anywhere in the login. The last rule also matches humans
/// such as `abbott`; that false positive only makes the bot more conservative.
pub fn looks_like_bot(login: &str) -> bool {
    let login = login.to_lowercase();
    login.ends_with("[bot]")
        || BOT_PRODUCT_MARKERS.iter().any(|m| login.contains(m))
        || login.contains("bot")
}

/// Decides whether an issue's last update is genuine activity.
#[derive(Debug, Clone)]
pub struct ActivityClassifier {
    /// Lower-cased logins whose comments never count.
    ignored_actors: HashSet<String>,
}

impl Default for ActivityClassifier {
    fn default() -> Self {
        Self::new([DEFAULT_IGNORED_ACTOR])
    }
}

impl ActivityClassifier {
    /// Creates a classifier ignoring the given logins (case-insensitive).
    pub fn new<I, S>(ignored_actors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ActivityClassifier {
            ignored_actors: ignored_actors
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn is_ignored(&self, login: &str) -> bool {
        self.ignored_actors.contains(&login.to_lowercase())
    }

    /// Classifies an issue from its `updatedAt` and last comment.
    pub fn classify(&self, issue: &Issue) -> Classification {
        let Some(updated_at) = issue.updated_at else {
            return Classification::discounted(ActivityReason::UnknownUpdateTime);
        };

        let Some(comment) = &issue.last_comment else {
            return Classification::genuine(ActivityReason::NoComment);
        };

        // Deleted accounts have no author; those were humans.
        let Some(author) = &comment.author else {
            return Classification::genuine(ActivityReason::HumanComment);
        };

        let reason = if author.kind == ActorKind::Bot || looks_like_bot(&author.login) {
            ActivityReason::BotComment
        } else if self.is_ignored(&author.login) {
            ActivityReason::IgnoredActorComment
        } else {
            return Classification::genuine(ActivityReason::HumanComment);
        };

        if comment_caused_update(comment.created_at, updated_at) {
            Classification::discounted(reason)
        } else {
            Classification::genuine(ActivityReason::AutomatedCommentOlderThanUpdate)
        }
    }
}

/// An automated comment at or after `updatedAt` is what caused the update.
/// An unknown comment time is assumed to have caused it.
fn comment_caused_update(created_at: Option<DateTime<Utc>>, updated_at: DateTime<Utc>) -> bool {
    created_at.is_none_or(|created| created >= updated_at)
}
