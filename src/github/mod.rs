//! GitHub API client and effect interpreter.
//!
//! This module executes `GitHubEffect`s via the octocrab library. It
//! implements the `GitHubInterpreter` trait defined in the effects module.
//!
//! Key features:
//! - Exponential backoff retry with jitter for transient failures
//! - Distinguishes transient vs permanent errors
//! - GraphQL for sub-issues, aliased batch fetches and ordered listings
//! - Typed response schemas decoded once into the domain model

mod client;
mod error;
mod interpreter;
mod queries;
mod retry;

pub use client::OctocrabClient;
pub use error::{GitHubApiError, GitHubErrorKind, GraphQlError};
pub use interpreter::interpret_github_effect;
pub use retry::{RetryConfig, RetryPolicy, RetryResult, retry_with_backoff};
