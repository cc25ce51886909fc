//! Effects-as-data for tracker operations.
//!
//! This module defines effect types that describe operations without executing them.
//! This enables:
//! - Testability via an in-memory interpreter
//! - Logging/tracing of intended operations (dry-run reports the effect it skipped)
//! - A single retry/cancellation layer in front of every remote call

pub mod github;
pub mod interpreter;

pub use github::{GitHubEffect, GitHubResponse, IssuePage, SubIssueList};
pub use interpreter::GitHubInterpreter;
