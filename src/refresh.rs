//! The refresh action: one comment per stale ancestor per run.
//!
//! A comment bumps the ancestor's `updatedAt`, which is what keeps the stale
//! bot away. Before writing, the ancestor is re-read so that one touched by
//! someone else since the scan listed it is left alone.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::effects::GitHubInterpreter;
use crate::executor::{ExecError, TrackerExecutor};
use crate::types::{IssueNumber, ThresholdWindow};

/// Errors from a single refresh attempt.
///
/// None of these mark the ancestor as processed.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("refresh cancelled")]
    Cancelled,

    #[error("failed to re-read {ancestor}: {source}")]
    PreCheck {
        ancestor: IssueNumber,
        #[source]
        source: ExecError,
    },

    #[error("{0} no longer exists")]
    NotFound(IssueNumber),

    #[error("failed to comment on {ancestor}: {source}")]
    Post {
        ancestor: IssueNumber,
        #[source]
        source: ExecError,
    },
}

impl RefreshError {
    fn from_exec(ancestor: IssueNumber, err: ExecError, posting: bool) -> Self {
        match err {
            ExecError::Cancelled => RefreshError::Cancelled,
            source if posting => RefreshError::Post { ancestor, source },
            source => RefreshError::PreCheck { ancestor, source },
        }
    }
}

/// What a refresh attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Already handled earlier in this run.
    AlreadyProcessed,
    /// The ancestor itself was updated within the window; nothing written.
    AlreadyFresh { updated_at: DateTime<Utc> },
    /// Dry run: the comment was only logged.
    DryRun,
    /// The comment was posted.
    Commented { comment_id: u64 },
}

/// Ancestors already handled in this run.
///
/// Only grows; created empty at the start of a run and dropped at its end.
#[derive(Debug, Default, Clone)]
pub struct ProcessedAncestors(HashSet<IssueNumber>);

impl ProcessedAncestors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, issue: IssueNumber) -> bool {
        self.0.contains(&issue)
    }

    /// Returns false if the issue was already present.
    pub fn insert(&mut self, issue: IssueNumber) -> bool {
        self.0.insert(issue)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Run-wide refresh parameters.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub threshold: ThresholdWindow,
    /// Body of the keep-alive comment.
    pub message: String,
    pub dry_run: bool,
    /// The run's reference time; every recency decision uses it.
    pub now: DateTime<Utc>,
}

/// Posts keep-alive comments, at most once per ancestor.
pub struct Refresher<'a, G> {
    executor: &'a TrackerExecutor<G>,
    settings: RefreshSettings,
    processed: ProcessedAncestors,
}

impl<'a, G> Refresher<'a, G>
where
    G: GitHubInterpreter,
    G::Error: fmt::Display,
{
    pub fn new(executor: &'a TrackerExecutor<G>, settings: RefreshSettings) -> Self {
        Refresher {
            executor,
            settings,
            processed: ProcessedAncestors::new(),
        }
    }

    pub fn settings(&self) -> &RefreshSettings {
        &self.settings
    }

    pub fn processed(&self) -> &ProcessedAncestors {
        &self.processed
    }

    pub fn is_processed(&self, ancestor: IssueNumber) -> bool {
        self.processed.contains(ancestor)
    }

    /// Refreshes `ancestor` unless it was handled already or is fresh itself.
    #[instrument(level = "debug", skip(self), fields(ancestor = %ancestor))]
    pub async fn refresh(&mut self, ancestor: IssueNumber) -> Result<RefreshOutcome, RefreshError> {
        if self.processed.contains(ancestor) {
            debug!("Already processed in this run");
            return Ok(RefreshOutcome::AlreadyProcessed);
        }

        let current = self
            .executor
            .get_issue(ancestor)
            .await
            .map_err(|e| RefreshError::from_exec(ancestor, e, false))?
            .ok_or(RefreshError::NotFound(ancestor))?;

        // An unreadable timestamp is not evidence of freshness.
        if let Some(updated_at) = current.updated_at
            && self.settings.threshold.is_recent(updated_at, self.settings.now)
        {
            info!(%updated_at, "Ancestor was updated recently; not commenting");
            self.processed.insert(ancestor);
            return Ok(RefreshOutcome::AlreadyFresh { updated_at });
        }

        if self.settings.dry_run {
            info!(message = %self.settings.message, "Dry run: would comment");
            self.processed.insert(ancestor);
            return Ok(RefreshOutcome::DryRun);
        }

        let comment_id = self
            .executor
            .post_comment(ancestor, self.settings.message.clone())
            .await
            .map_err(|e| RefreshError::from_exec(ancestor, e, true))?;

        info!(comment_id, "Commented to keep ancestor alive");
        self.processed.insert(ancestor);
        Ok(RefreshOutcome::Commented { comment_id })
    }
}
