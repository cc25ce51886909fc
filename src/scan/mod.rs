//! Candidate selection and evaluation.
//!
//! Two scans feed ancestors into the same evaluation step:
//!
//! - [`LabeledScan`]: open issues carrying configured labels or issue types.
//! - [`StaleScan`]: every open issue, oldest update first, until the first
//!   one that is not stale.
//!
//! Evaluating a candidate walks its sub-issue tree and, if the newest genuine
//! activity is inside the threshold window, hands it to the [`Refresher`].
//!
//! Local failures (one traversal batch, one refresh) are counted in the
//! [`ScanReport`] and the scan moves on. Only cancellation and losing the
//! scan's own listing query end a scan with an error.

mod labeled;
mod stale;


use std::fmt;

use thiserror::Error;
use tracing::{info, warn};

use crate::activity::ActivityClassifier;
use crate::effects::GitHubInterpreter;
use crate::executor::{ExecError, TrackerExecutor};
use crate::refresh::{RefreshError, RefreshOutcome, RefreshSettings, Refresher};
use crate::traversal::{TraversalConfig, TraversalEngine, TraversalError};
use crate::types::Issue;

pub use labeled::{DEFAULT_CANDIDATE_LIMIT, IssueFilters, LabeledScan};
pub use stale::{STALE_PAGE_SIZE, StaleScan};

/// Errors that end a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no parent issue labels or types configured")]
    NoFilters,

    #[error("scan cancelled")]
    Cancelled,

    /// The query that produces the scan's candidates failed.
    #[error("{query} failed: {source}")]
    CandidateQuery {
        query: &'static str,
        #[source]
        source: ExecError,
    },
}

impl ScanError {
    fn candidates(query: &'static str, err: ExecError) -> Self {
        match err {
            ExecError::Cancelled => ScanError::Cancelled,
            source => ScanError::CandidateQuery { query, source },
        }
    }
}

/// Tally of what a scan did, logged when it finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Candidates walked (or skipped as already processed).
    pub evaluated: usize,
    pub commented: usize,
    pub dry_run: usize,
    pub already_fresh: usize,
    pub already_processed: usize,
    pub no_recent_activity: usize,
    /// Refresh attempts that failed.
    pub failed: usize,
    /// Traversals that lost a batch or hit the visited cap.
    pub incomplete_traversals: usize,
    /// Listed issues skipped because their `updatedAt` was unreadable.
    pub skipped_unreadable: usize,
    /// The stale scan reached an issue newer than the cutoff.
    pub stopped_early: bool,
    /// A later page of the stale listing failed; results are partial.
    pub partial: bool,
}

impl ScanReport {
    fn record(&mut self, outcome: RefreshOutcome) {
        match outcome {
            RefreshOutcome::AlreadyProcessed => self.already_processed += 1,
            RefreshOutcome::AlreadyFresh { .. } => self.already_fresh += 1,
            RefreshOutcome::DryRun => self.dry_run += 1,
            RefreshOutcome::Commented { .. } => self.commented += 1,
        }
    }

    /// Number of ancestors a write was (or, in a dry run, would have been)
    /// made for.
    pub fn refreshed(&self) -> usize {
        self.commented + self.dry_run
    }

    pub fn log_summary(&self, scan: &str) {
        info!(
            scan,
            evaluated = self.evaluated,
            commented = self.commented,
            dry_run = self.dry_run,
            already_fresh = self.already_fresh,
            already_processed = self.already_processed,
            no_recent_activity = self.no_recent_activity,
            failed = self.failed,
            incomplete_traversals = self.incomplete_traversals,
            "Scan finished"
        );
        if self.partial {
            warn!(scan, "Listing failed part-way; not every stale issue was checked");
        }
    }
}

/// Everything one run needs to evaluate candidates.
///
/// Owns the run's `ProcessedAncestors` through its `Refresher`, so a context
/// reused for several scans never comments on the same ancestor twice.
pub struct ScanContext<'a, G> {
    executor: &'a TrackerExecutor<G>,
    engine: TraversalEngine<'a, G>,
    refresher: Refresher<'a, G>,
}

impl<'a, G> ScanContext<'a, G>
where
    G: GitHubInterpreter,
    G::Error: fmt::Display,
{
    pub fn new(
        executor: &'a TrackerExecutor<G>,
        classifier: &'a ActivityClassifier,
        traversal: TraversalConfig,
        settings: RefreshSettings,
    ) -> Self {
        ScanContext {
            executor,
            engine: TraversalEngine::new(executor, classifier, traversal),
            refresher: Refresher::new(executor, settings),
        }
    }

    pub fn settings(&self) -> &RefreshSettings {
        self.refresher.settings()
    }

    pub fn refresher(&self) -> &Refresher<'a, G> {
        &self.refresher
    }

    fn executor(&self) -> &'a TrackerExecutor<G> {
        self.executor
    }

    /// Walks one candidate and refreshes it if a descendant is recently active.
    ///
    /// Only cancellation is returned as an error.
    async fn evaluate(&mut self, candidate: &Issue, report: &mut ScanReport) -> Result<(), ScanError> {
        report.evaluated += 1;

        if self.refresher.is_processed(candidate.number) {
            report.already_processed += 1;
            return Ok(());
        }

        info!(issue = %candidate.number, title = %candidate.title, "Processing parent issue");

        let traversal = self
            .engine
            .most_recent_genuine_activity(candidate.number)
            .await
            .map_err(|TraversalError::Cancelled| ScanError::Cancelled)?;
        if !traversal.is_complete() {
            report.incomplete_traversals += 1;
        }

        let settings = self.refresher.settings();
        let Some(latest) = traversal
            .latest
            .filter(|&latest| settings.threshold.is_recent(latest, settings.now))
        else {
            info!(
                issue = %candidate.number,
                latest = ?traversal.latest,
                descendants = traversal.descendants,
                "No recent sub-issue activity"
            );
            report.no_recent_activity += 1;
            return Ok(());
        };

        info!(
            issue = %candidate.number,
            %latest,
            via = ?traversal.latest_issue,
            "Recent sub-issue activity found"
        );

        match self.refresher.refresh(candidate.number).await {
            Ok(outcome) => report.record(outcome),
            Err(RefreshError::Cancelled) => return Err(ScanError::Cancelled),
            Err(e) => {
                warn!(issue = %candidate.number, error = %e, "Refresh failed");
                report.failed += 1;
            }
        }
        Ok(())
    }
}
