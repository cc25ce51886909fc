//! Batched breadth-first walk of the sub-issue graph.
//!
//! # Invariants
//!
//! - The visited set only grows, and an issue number in it is never
//!   enqueued again, so cycles and diamonds terminate.
//! - Each distinct descendant is classified once. The root never counts,
//!   even when reachable through a cycle.
//! - Once the visited set holds `max_visited` issues nothing more is
//!   expanded; children already fetched are still classified.
//! - `latest` is the maximum `updatedAt` over genuine descendants seen so far.
//! - A failed batch loses at most that batch's subtrees; the walk goes on.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::activity::ActivityClassifier;
use crate::effects::GitHubInterpreter;
use crate::executor::{ExecError, TrackerExecutor};
use crate::types::{Issue, IssueNumber};

use super::{ActivityRecord, Traversal, TraversalConfig};

/// Errors that abort a traversal.
///
/// Remote failures are not among them: they are counted in
/// `Traversal::failed_batches` instead.
#[derive(Debug, Error)]
pub enum TraversalError {
    #[error("traversal cancelled")]
    Cancelled,
}

/// Computes the most recent genuine descendant activity of an issue.
pub struct TraversalEngine<'a, G> {
    executor: &'a TrackerExecutor<G>,
    classifier: &'a ActivityClassifier,
    config: TraversalConfig,
}

impl<'a, G> TraversalEngine<'a, G>
where
    G: GitHubInterpreter,
    G::Error: fmt::Display,
{
    pub fn new(
        executor: &'a TrackerExecutor<G>,
        classifier: &'a ActivityClassifier,
        config: TraversalConfig,
    ) -> Self {
        TraversalEngine {
            executor,
            classifier,
            config,
        }
    }

    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    /// Walks `root`'s subtree and returns its most recent genuine activity.
    pub async fn most_recent_genuine_activity(
        &self,
        root: IssueNumber,
    ) -> Result<Traversal, TraversalError> {
        self.walk(root, false).await
    }

    /// Like [`most_recent_genuine_activity`], but also returns the
    /// classification of every descendant.
    ///
    /// [`most_recent_genuine_activity`]: TraversalEngine::most_recent_genuine_activity
    pub async fn inspect(&self, root: IssueNumber) -> Result<Traversal, TraversalError> {
        self.walk(root, true).await
    }

    async fn walk(&self, root: IssueNumber, keep_records: bool) -> Result<Traversal, TraversalError> {
        let batch_size = self.config.batch_size.max(1);
        let mut visited: HashSet<IssueNumber> = HashSet::from([root]);
        let mut queue: VecDeque<IssueNumber> = VecDeque::from([root]);
        let mut result = Traversal::empty(root);

        while !queue.is_empty() && !result.truncated {
            if self.executor.is_cancelled() {
                return Err(TraversalError::Cancelled);
            }

            let take = queue.len().min(batch_size);
            let batch: Vec<IssueNumber> = queue.drain(..take).collect();
            trace!(%root, batch = ?batch, "Expanding batch");

            let lists = match self
                .executor
                .get_sub_issues(batch.clone(), self.config.sub_issues_per_parent)
                .await
            {
                Ok(lists) => lists,
                Err(ExecError::Cancelled) => return Err(TraversalError::Cancelled),
                Err(e) => {
                    warn!(%root, batch = ?batch, error = %e, "Sub-issue batch failed; continuing without it");
                    result.failed_batches += 1;
                    continue;
                }
            };

            for list in lists {
                let Some(children) = list.children else {
                    debug!(%root, parent = %list.parent, "No data for parent");
                    result.missing_parents += 1;
                    continue;
                };
                if list.has_more {
                    warn!(
                        %root,
                        parent = %list.parent,
                        fetched = children.len(),
                        "Parent has more sub-issues than one page; the rest are not checked"
                    );
                }

                for child in children {
                    if !visited.insert(child.number) {
                        continue;
                    }
                    if visited.len() < self.config.max_visited {
                        queue.push_back(child.number);
                    } else if !result.truncated {
                        warn!(
                            %root,
                            max_visited = self.config.max_visited,
                            "Visited cap reached; no longer expanding"
                        );
                        result.truncated = true;
                    }

                    self.record(&mut result, list.parent, child, keep_records);
                }
            }
        }

        debug!(
            %root,
            descendants = result.descendants,
            latest = ?result.latest,
            failed_batches = result.failed_batches,
            truncated = result.truncated,
            "Traversal finished"
        );
        Ok(result)
    }

    /// Classifies one descendant and folds it into the running result.
    fn record(&self, result: &mut Traversal, parent: IssueNumber, child: Issue, keep_records: bool) {
        let classification = self.classifier.classify(&child);
        result.descendants += 1;

        if classification.genuine
            && let Some(updated_at) = child.updated_at
            && result.latest.is_none_or(|latest| updated_at > latest)
        {
            result.latest = Some(updated_at);
            result.latest_issue = Some(child.number);
        }

        trace!(
            issue = %child.number,
            %parent,
            genuine = classification.genuine,
            reason = ?classification.reason,
            "Classified descendant"
        );

        if keep_records {
            result.records.push(ActivityRecord {
                issue: child.number,
                parent,
                title: child.title,
                updated_at: child.updated_at,
                classification,
            });
        }
    }
}
