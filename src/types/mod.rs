//! Core domain types for the heirloom bot.
//!
//! This module contains the identifiers, issue data model and recency window
//! shared by every other module.

pub mod ids;
pub mod issue;
pub mod threshold;

// Re-export commonly used types at the module level
pub use ids::{InvalidRepoId, IssueNumber, RepoId};
pub use issue::{Actor, ActorKind, Comment, Issue, IssueState, parse_timestamp};
pub use threshold::{DEFAULT_THRESHOLD_DAYS, ThresholdWindow};
