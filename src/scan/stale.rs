//! Full-repository scan over open issues, least recently updated first.
//!
//! The listing is ordered by `updatedAt`, so the first issue newer than the
//! cutoff proves that every later one is newer too. The scan stops there
//! without evaluating it.

use std::fmt;

use tracing::{debug, info, instrument, warn};

use crate::effects::GitHubInterpreter;
use crate::executor::ExecError;

use super::{ScanContext, ScanError, ScanReport};

/// Open issues requested per listing page.
pub const STALE_PAGE_SIZE: u32 = 100;

/// Evaluates every stale open issue in the repository.
#[derive(Debug, Clone)]
pub struct StaleScan {
    pub page_size: u32,
}

impl Default for StaleScan {
    fn default() -> Self {
        StaleScan {
            page_size: STALE_PAGE_SIZE,
        }
    }
}

impl StaleScan {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(skip_all, fields(page_size = self.page_size))]
    pub async fn run<G>(&self, ctx: &mut ScanContext<'_, G>) -> Result<ScanReport, ScanError>
    where
        G: GitHubInterpreter,
        G::Error: fmt::Display,
    {
        let cutoff = {
            let settings = ctx.settings();
            settings.threshold.cutoff(settings.now)
        };
        info!(%cutoff, "Scanning open issues not updated since cutoff");

        let mut report = ScanReport::default();
        let mut after: Option<String> = None;
        let mut page_index = 0usize;

        'pages: loop {
            let page = match ctx
                .executor()
                .list_open_issues_by_updated(after.take(), self.page_size)
                .await
            {
                Ok(page) => page,
                Err(ExecError::Cancelled) => return Err(ScanError::Cancelled),
                Err(e) if page_index == 0 => {
                    return Err(ScanError::candidates("stale issue listing", e));
                }
                Err(e) => {
                    warn!(page = page_index, error = %e, "Listing page failed; ending scan early");
                    report.partial = true;
                    break;
                }
            };
            debug!(page = page_index, issues = page.issues.len(), "Fetched listing page");

            for issue in &page.issues {
                let Some(updated_at) = issue.updated_at else {
                    debug!(issue = %issue.number, "Unreadable updatedAt; skipping");
                    report.skipped_unreadable += 1;
                    continue;
                };
                if updated_at > cutoff {
                    info!(
                        issue = %issue.number,
                        %updated_at,
                        "Reached an issue updated after the cutoff; stopping"
                    );
                    report.stopped_early = true;
                    break 'pages;
                }
                ctx.evaluate(issue, &mut report).await?;
            }

            match page.next_cursor {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
            page_index += 1;
        }

        report.log_summary("stale");
        Ok(report)
    }
}
