//! GitHub API error types.
//!
//! This module defines error types that distinguish between transient and permanent
//! GitHub API failures. The distinction drives the retry logic:
//!
//! - **Transient** errors are retriable (5xx, rate limits, network failures)
//! - **Permanent** errors are returned immediately (most 4xx, GraphQL validation errors)

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// The kind of GitHub API error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// Transient error - safe to retry with backoff.
    ///
    /// Examples:
    /// - HTTP 5xx (server errors)
    /// - HTTP 429 (rate limited)
    /// - HTTP 403 with rate limit message
    /// - GraphQL `RATE_LIMITED` errors
    /// - Network timeouts
    Transient,

    /// Permanent error - retrying will not help.
    ///
    /// Examples:
    /// - HTTP 4xx (except rate limits)
    /// - GraphQL query validation errors
    /// - Authentication failures (401, 403 non-rate-limit)
    Permanent,
}

impl GitHubErrorKind {
    /// Returns true if this error is retriable.
    pub fn is_retriable(&self) -> bool {
        matches!(self, GitHubErrorKind::Transient)
    }
}

/// A GitHub API error with categorization for retry decisions.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    /// The kind of error (transient or permanent).
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if available.
    pub status_code: Option<u16>,

    /// A human-readable description of the error.
    pub message: String,

    /// The underlying octocrab error, if available.
    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

/// A single entry from a GraphQL `errors` array.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    #[serde(default)]
    pub message: String,
    /// GitHub's error type, e.g. `NOT_FOUND` or `RATE_LIMITED`.
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

impl GitHubApiError {
    /// Creates a permanent error without an octocrab source.
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transient error without an octocrab source.
    pub fn transient_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Transient,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error from a GraphQL response that carried no usable data.
    ///
    /// Rate limiting is transient; everything else (bad query, missing
    /// permissions) is permanent.
    pub fn from_graphql_errors(errors: &[GraphQlError]) -> Self {
        let rate_limited = errors.iter().any(|e| {
            e.error_type.as_deref() == Some("RATE_LIMITED") || is_rate_limit_error(&e.message)
        });
        let message = if errors.is_empty() {
            "GraphQL response contained no data".to_string()
        } else {
            errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        };

        if rate_limited {
            Self::transient_without_source(message)
        } else {
            Self::permanent_without_source(message)
        }
    }

    /// Categorizes an octocrab error.
    ///
    /// The HTTP status GitHub answered with decides when there is one. A
    /// body that is not JSON at all (a proxy's HTML error page) is treated
    /// as a server-side failure. Only otherwise does the rendered message
    /// decide.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let message = err.to_string();
        let failure = RequestFailure::of(&err, &message);
        let kind = failure.kind(&message);
        let status_code = match failure {
            RequestFailure::Status(code) => Some(code),
            _ => None,
        };

        Self {
            kind,
            status_code,
            message,
            source: Some(err),
        }
    }
}

/// What an octocrab error says about the failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestFailure {
    /// GitHub answered with this HTTP status.
    Status(u16),
    /// The response body was not JSON.
    UndecodableBody,
    /// Nothing structured is known; only the message.
    Unknown,
}

impl RequestFailure {
    fn of(err: &octocrab::Error, message: &str) -> Self {
        match err {
            octocrab::Error::GitHub { source, .. } => {
                RequestFailure::Status(source.status_code.as_u16())
            }
            octocrab::Error::Serde { .. } | octocrab::Error::Json { .. } => {
                RequestFailure::UndecodableBody
            }
            _ => status_code_from_message(message)
                .map_or(RequestFailure::Unknown, RequestFailure::Status),
        }
    }

    fn kind(self, message: &str) -> GitHubErrorKind {
        if is_transient_message(message) {
            return GitHubErrorKind::Transient;
        }
        match self {
            RequestFailure::Status(429) => GitHubErrorKind::Transient,
            RequestFailure::Status(403) if is_rate_limit_error(message) => {
                GitHubErrorKind::Transient
            }
            RequestFailure::Status(code) if (500..600).contains(&code) => {
                GitHubErrorKind::Transient
            }
            RequestFailure::Status(_) => GitHubErrorKind::Permanent,
            RequestFailure::UndecodableBody => GitHubErrorKind::Transient,
            RequestFailure::Unknown if is_network_error(message) => GitHubErrorKind::Transient,
            RequestFailure::Unknown => GitHubErrorKind::Permanent,
        }
    }
}

/// Reads a `status: NNN` marker from an error message.
fn status_code_from_message(err_str: &str) -> Option<u16> {
    let idx = err_str.find("status: ")?;
    let digits: String = err_str[idx + 8..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok().filter(|code| (100..600).contains(code))
}

/// Checks if an error message indicates a transient condition.
fn is_transient_message(message: &str) -> bool {
    let message_lower = message.to_lowercase();

    // Generic "try again" suggestions from GitHub
    message_lower.contains("try again")
        // GraphQL resource limits under load
        || message_lower.contains("something went wrong while executing your query")
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("api rate")
        || message_lower.contains("secondary rate")
        || message_lower.contains("abuse detection")
}

/// Checks if an error message indicates a network-level error.
fn is_network_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("timeout")
        || message_lower.contains("connection")
        || message_lower.contains("network")
        || message_lower.contains("dns")
        || message_lower.contains("timed out")
}
