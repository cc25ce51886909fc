//! Run orchestration: wires configuration to a client, an executor and a scan.

use std::fmt::{self, Write as _};

use chrono::Utc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::activity::ActivityClassifier;
use crate::config::{Config, ConfigError, Mode};
use crate::credentials::resolve_token;
use crate::effects::GitHubInterpreter;
use crate::executor::TrackerExecutor;
use crate::github::OctocrabClient;
use crate::refresh::RefreshSettings;
use crate::scan::{LabeledScan, ScanContext, ScanError, ScanReport, StaleScan};
use crate::traversal::{Traversal, TraversalEngine, TraversalError};

/// Exit status for configuration problems.
pub const EXIT_CONFIG: u8 = 2;
/// Exit status for a fatal run error.
pub const EXIT_FAILURE: u8 = 1;
/// Exit status after an operator interrupt.
pub const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build GitHub client: {0}")]
    Client(#[from] octocrab::Error),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("run cancelled")]
    Cancelled,
}

impl From<TraversalError> for RunError {
    fn from(err: TraversalError) -> Self {
        match err {
            TraversalError::Cancelled => RunError::Cancelled,
        }
    }
}

impl RunError {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Config(_) | RunError::Scan(ScanError::NoFilters) => EXIT_CONFIG,
            RunError::Cancelled | RunError::Scan(ScanError::Cancelled) => EXIT_CANCELLED,
            RunError::Client(_) | RunError::Scan(ScanError::CandidateQuery { .. }) => EXIT_FAILURE,
        }
    }
}

/// What a finished run produced.
#[derive(Debug)]
pub enum RunOutcome {
    Scanned(ScanReport),
    Inspected(Traversal),
}

/// Resolves credentials, connects to GitHub and runs the configured mode.
pub async fn run(config: Config, cancel: CancellationToken) -> Result<RunOutcome, RunError> {
    let token = resolve_token(config.token.as_deref()).await?;
    let client =
        OctocrabClient::from_token(token, config.repo.clone())?.with_retry_config(config.retry);

    info!(repo = %config.repo, threshold_days = config.threshold.as_days(), "Starting heirloom");
    run_with(&config, TrackerExecutor::new(client, cancel)).await
}

/// Runs the configured mode against any tracker.
pub async fn run_with<G>(config: &Config, executor: TrackerExecutor<G>) -> Result<RunOutcome, RunError>
where
    G: GitHubInterpreter,
    G::Error: fmt::Display,
{
    let classifier = ActivityClassifier::new(&config.ignored_actors);

    let report = match &config.mode {
        Mode::Inspect(issue) => {
            let engine = TraversalEngine::new(&executor, &classifier, config.traversal);
            return Ok(RunOutcome::Inspected(engine.inspect(*issue).await?));
        }
        Mode::Labeled(filters) => {
            LabeledScan::new(filters.clone())
                .with_candidate_limit(config.candidate_limit)
                .run(&mut scan_context(config, &executor, &classifier))
                .await?
        }
        Mode::Stale => {
            StaleScan::new()
                .run(&mut scan_context(config, &executor, &classifier))
                .await?
        }
    };
    Ok(RunOutcome::Scanned(report))
}

fn scan_context<'a, G>(
    config: &Config,
    executor: &'a TrackerExecutor<G>,
    classifier: &'a ActivityClassifier,
) -> ScanContext<'a, G>
where
    G: GitHubInterpreter,
    G::Error: fmt::Display,
{
    let settings = RefreshSettings {
        threshold: config.threshold,
        message: config.message.clone(),
        dry_run: config.dry_run,
        now: Utc::now(),
    };
    ScanContext::new(executor, classifier, config.traversal, settings)
}

/// Renders an inspection as one line per descendant.
pub fn render_inspection(traversal: &Traversal) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: {} descendant(s), latest genuine activity: {}",
        traversal.root,
        traversal.descendants,
        traversal
            .latest
            .map_or_else(|| "none".to_string(), |t| t.to_rfc3339()),
    );
    for record in &traversal.records {
        let updated = record
            .updated_at
            .map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339());
        let _ = writeln!(
            out,
            "  {} (under {}) {} {:?} {}: {}",
            record.issue,
            record.parent,
            if record.classification.genuine { "genuine " } else { "automated" },
            record.classification.reason,
            updated,
            record.title,
        );
    }
    if !traversal.is_complete() {
        let _ = writeln!(
            out,
            "  incomplete: {} failed batch(es){}",
            traversal.failed_batches,
            if traversal.truncated { ", visited cap reached" } else { "" },
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::RetryConfig;
    use crate::scan::IssueFilters;
    use crate::test_utils::{FakeTracker, days_ago};
    use crate::traversal::TraversalConfig;
    use crate::types::{Actor, Issue, IssueNumber, RepoId, ThresholdWindow};

    fn config(mode: Mode) -> Config {
        Config {
            token: Some("t".into()),
            repo: RepoId::new("octo", "widgets"),
            mode,
            threshold: ThresholdWindow::days(30),
            message: "alive".into(),
            dry_run: false,
            verbose: false,
            ignored_actors: vec!["github-actions".into(), "release-manager".into()],
            traversal: TraversalConfig::default(),
            candidate_limit: 50,
            retry: RetryConfig::DEFAULT,
        }
    }

    // Uses the wall clock, so the fixtures are relative to the real now.
    fn tracker() -> FakeTracker {
        let tracker = FakeTracker::new();
        let now = Utc::now();
        tracker.add_issue(Issue::new(IssueNumber(1), "Epic", now - chrono::Duration::days(60)));
        tracker.add_issue(
            Issue::new(IssueNumber(2), "Task", now - chrono::Duration::days(1))
                .with_comment(Actor::user("octocat"), now - chrono::Duration::days(1)),
        );
        tracker.add_issue(
            Issue::new(IssueNumber(3), "Chore", now - chrono::Duration::days(1))
                .with_comment(Actor::user("release-manager"), now - chrono::Duration::days(1)),
        );
        tracker.link(1, 2);
        tracker.link(1, 3);
        tracker.set_labels(1, &["epic"]);
        tracker
    }

    #[tokio::test]
    async fn labeled_mode_comments() {
        let tracker = tracker();
        let mode = Mode::Labeled(IssueFilters {
            labels: vec!["epic".into()],
            issue_types: vec![],
        });
        let executor = TrackerExecutor::new(tracker.clone(), CancellationToken::new());

        let outcome = run_with(&config(mode), executor).await.unwrap();

        let RunOutcome::Scanned(report) = outcome else {
            panic!("expected a scan report");
        };
        assert_eq!(report.commented, 1);
        assert_eq!(tracker.comments(), vec![(IssueNumber(1), "alive".to_string())]);
    }

    #[tokio::test]
    async fn inspect_never_writes() {
        let tracker = tracker();
        let executor = TrackerExecutor::new(tracker.clone(), CancellationToken::new());

        let outcome = run_with(&config(Mode::Inspect(IssueNumber(1))), executor)
            .await
            .unwrap();

        let RunOutcome::Inspected(traversal) = outcome else {
            panic!("expected an inspection");
        };
        assert_eq!(traversal.records.len(), 2);
        assert!(!traversal.records[1].classification.genuine);
        assert!(tracker.effects().iter().all(|e| !e.is_write()));

        let text = render_inspection(&traversal);
        assert!(text.starts_with("#1: 2 descendant(s)"));
        assert!(text.contains("#3 (under #1) automated IgnoredActorComment"));
    }

    #[tokio::test]
    async fn cancellation_maps_to_exit_130() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let executor = TrackerExecutor::new(tracker(), cancel);

        let err = run_with(&config(Mode::Stale), executor).await.unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CANCELLED);
    }

    #[test]
    fn exit_codes() {
        assert_eq!(RunError::Config(ConfigError::MissingToken).exit_code(), EXIT_CONFIG);
        assert_eq!(RunError::Scan(ScanError::NoFilters).exit_code(), EXIT_CONFIG);
        assert_eq!(RunError::Cancelled.exit_code(), EXIT_CANCELLED);
    }

    #[test]
    fn render_marks_incomplete_traversals() {
        let mut traversal = Traversal {
            root: IssueNumber(7),
            latest: Some(days_ago(3)),
            latest_issue: Some(IssueNumber(8)),
            descendants: 1,
            failed_batches: 1,
            missing_parents: 0,
            truncated: false,
            records: vec![],
        };
        assert!(render_inspection(&traversal).contains("1 failed batch(es)"));
        traversal.failed_batches = 0;
        assert!(!render_inspection(&traversal).contains("incomplete"));
    }
}
