//! Sub-issue hierarchy traversal.
//!
//! Walks an ancestor's sub-issue tree breadth-first and reports the most
//! recent genuine activity anywhere below it.

mod engine;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::activity::Classification;
use crate::types::IssueNumber;

pub use engine::{TraversalEngine, TraversalError};

/// Frontier issues per batched query.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Safety cap on issues discovered in one traversal.
pub const DEFAULT_MAX_VISITED: usize = 2000;

/// Sub-issues fetched per parent (one GraphQL page).
pub const DEFAULT_SUB_ISSUES_PER_PARENT: u32 = 100;

/// Tuning knobs for a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalConfig {
    /// Number of frontier issues expanded per remote query.
    pub batch_size: usize,
    /// Once this many issues (root included) are known, stop expanding.
    pub max_visited: usize,
    /// Page size for each parent's sub-issue list.
    pub sub_issues_per_parent: u32,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        TraversalConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            max_visited: DEFAULT_MAX_VISITED,
            sub_issues_per_parent: DEFAULT_SUB_ISSUES_PER_PARENT,
        }
    }
}

/// One classified descendant, kept only when inspecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRecord {
    pub issue: IssueNumber,
    /// The parent through which the issue was first discovered.
    pub parent: IssueNumber,
    pub title: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub classification: Classification,
}

/// The outcome of walking one ancestor's subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Traversal {
    pub root: IssueNumber,
    /// Most recent genuine activity below the root, if any.
    pub latest: Option<DateTime<Utc>>,
    /// The descendant that carried `latest`.
    pub latest_issue: Option<IssueNumber>,
    /// Distinct descendants discovered and classified.
    pub descendants: usize,
    /// Batches whose remote query failed and were skipped.
    pub failed_batches: usize,
    /// Frontier issues the tracker returned no data for.
    pub missing_parents: usize,
    /// True if the visited cap stopped the walk early.
    pub truncated: bool,
    /// Per-descendant trace; empty unless produced by `inspect`.
    pub records: Vec<ActivityRecord>,
}

impl Traversal {
    fn empty(root: IssueNumber) -> Self {
        Traversal {
            root,
            latest: None,
            latest_issue: None,
            descendants: 0,
            failed_batches: 0,
            missing_parents: 0,
            truncated: false,
            records: Vec::new(),
        }
    }

    /// True if every batch came back; `latest` then reflects the whole subtree
    /// (up to the visited cap).
    pub fn is_complete(&self) -> bool {
        self.failed_batches == 0 && !self.truncated
    }
}
