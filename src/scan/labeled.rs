//! Scan seeded by parent-issue labels and issue types.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::effects::GitHubInterpreter;

use super::{ScanContext, ScanError, ScanReport};

/// Maximum candidates fetched by one labeled scan.
pub const DEFAULT_CANDIDATE_LIMIT: u32 = 50;

/// Which open issues count as parent candidates.
///
/// Values within a field are alternatives; a candidate must satisfy every
/// non-empty field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFilters {
    pub labels: Vec<String>,
    pub issue_types: Vec<String>,
}

impl IssueFilters {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.issue_types.is_empty()
    }
}

/// Evaluates open issues matching [`IssueFilters`].
#[derive(Debug, Clone)]
pub struct LabeledScan {
    pub filters: IssueFilters,
    pub candidate_limit: u32,
}

impl LabeledScan {
    pub fn new(filters: IssueFilters) -> Self {
        LabeledScan {
            filters,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
        }
    }

    pub fn with_candidate_limit(mut self, limit: u32) -> Self {
        self.candidate_limit = limit;
        self
    }

    #[instrument(skip_all, fields(labels = ?self.filters.labels, types = ?self.filters.issue_types))]
    pub async fn run<G>(&self, ctx: &mut ScanContext<'_, G>) -> Result<ScanReport, ScanError>
    where
        G: GitHubInterpreter,
        G::Error: fmt::Display,
    {
        if self.filters.is_empty() {
            return Err(ScanError::NoFilters);
        }

        let candidates = ctx
            .executor()
            .search_open_issues(
                self.filters.labels.clone(),
                self.filters.issue_types.clone(),
                self.candidate_limit,
            )
            .await
            .map_err(|e| ScanError::candidates("candidate search", e))?;

        info!(count = candidates.len(), "Found parent issue candidates");

        let mut report = ScanReport::default();
        for candidate in &candidates {
            ctx.evaluate(candidate, &mut report).await?;
        }

        report.log_summary("labeled");
        Ok(report)
    }
}
