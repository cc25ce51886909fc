//! Shared test utilities: a fixed clock, an in-memory tracker, and
//! arbitrary generators for property-based testing.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse, IssuePage, SubIssueList};
use crate::types::{Actor, Comment, Issue, IssueNumber, IssueState};

/// The reference "now" used by every test.
pub fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
        .map(|t| t.with_timezone(&Utc))
        .unwrap()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

/// Login the fake uses as the author of comments it is asked to post.
pub const FAKE_BOT_LOGIN: &str = "heirloom-app[bot]";

#[derive(Default)]
struct FakeState {
    issues: BTreeMap<IssueNumber, Issue>,
    children: HashMap<IssueNumber, Vec<IssueNumber>>,
    labels: HashMap<IssueNumber, Vec<String>>,
    issue_types: HashMap<IssueNumber, String>,
    effects: Vec<GitHubEffect>,
    comments: Vec<(IssueNumber, String)>,
    fail_sub_issues_of: HashSet<IssueNumber>,
    fail_get_issue: HashSet<IssueNumber>,
    fail_comments_on: HashSet<IssueNumber>,
    fail_search: bool,
    fail_listing_from_page: Option<usize>,
}

/// An in-memory issue tracker implementing `GitHubInterpreter`.
///
/// Clones share state, so a test can hand one clone to the code under test
/// and inspect the recorded effects through another.
#[derive(Clone, Default)]
pub struct FakeTracker {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn add_issue(&self, issue: Issue) {
        self.state().issues.insert(issue.number, issue);
    }

    /// Adds `child` as a sub-issue of `parent`.
    pub fn link(&self, parent: u64, child: u64) {
        self.state()
            .children
            .entry(IssueNumber(parent))
            .or_default()
            .push(IssueNumber(child));
    }

    pub fn set_labels(&self, issue: u64, labels: &[&str]) {
        self.state().labels.insert(
            IssueNumber(issue),
            labels.iter().map(|l| l.to_string()).collect(),
        );
    }

    pub fn set_issue_type(&self, issue: u64, issue_type: &str) {
        self.state()
            .issue_types
            .insert(IssueNumber(issue), issue_type.to_string());
    }

    pub fn fail_sub_issues_of(&self, parent: IssueNumber) {
        self.state().fail_sub_issues_of.insert(parent);
    }

    pub fn fail_get_issue(&self, issue: IssueNumber) {
        self.state().fail_get_issue.insert(issue);
    }

    pub fn fail_comments_on(&self, issue: IssueNumber) {
        self.state().fail_comments_on.insert(issue);
    }

    pub fn fail_search(&self) {
        self.state().fail_search = true;
    }

    /// Makes listing fail for page `index` (0-based) and every later page.
    pub fn fail_listing_from_page(&self, index: usize) {
        self.state().fail_listing_from_page = Some(index);
    }

    pub fn issue(&self, number: u64) -> Option<Issue> {
        self.state().issues.get(&IssueNumber(number)).cloned()
    }

    /// Every effect executed so far, in order.
    pub fn effects(&self) -> Vec<GitHubEffect> {
        self.state().effects.clone()
    }

    /// Comments posted so far.
    pub fn comments(&self) -> Vec<(IssueNumber, String)> {
        self.state().comments.clone()
    }

    /// The parent lists of every `GetSubIssues` request, in order.
    pub fn sub_issue_requests(&self) -> Vec<Vec<IssueNumber>> {
        self.state()
            .effects
            .iter()
            .filter_map(|e| match e {
                GitHubEffect::GetSubIssues { parents, .. } => Some(parents.clone()),
                _ => None,
            })
            .collect()
    }

    /// Issue numbers whose freshness was checked via `GetIssue`.
    pub fn issue_lookups(&self) -> Vec<IssueNumber> {
        self.state()
            .effects
            .iter()
            .filter_map(|e| match e {
                GitHubEffect::GetIssue { issue } => Some(*issue),
                _ => None,
            })
            .collect()
    }

    fn respond(&self, effect: GitHubEffect) -> Result<GitHubResponse, String> {
        let mut state = self.state();
        state.effects.push(effect.clone());

        match effect {
            GitHubEffect::GetIssue { issue } => {
                if state.fail_get_issue.contains(&issue) {
                    return Err(format!("injected failure fetching {issue}"));
                }
                Ok(GitHubResponse::Issue(state.issues.get(&issue).cloned()))
            }
            GitHubEffect::GetSubIssues {
                parents,
                per_parent,
            } => {
                if let Some(failing) = parents.iter().find(|p| state.fail_sub_issues_of.contains(p))
                {
                    return Err(format!("injected failure expanding {failing}"));
                }
                let lists = parents
                    .iter()
                    .map(|&parent| {
                        if !state.issues.contains_key(&parent) {
                            return SubIssueList {
                                parent,
                                children: None,
                                has_more: false,
                            };
                        }
                        let all: Vec<Issue> = state
                            .children
                            .get(&parent)
                            .into_iter()
                            .flatten()
                            .filter_map(|c| state.issues.get(c).cloned())
                            .collect();
                        let has_more = all.len() > per_parent as usize;
                        SubIssueList {
                            parent,
                            children: Some(all.into_iter().take(per_parent as usize).collect()),
                            has_more,
                        }
                    })
                    .collect();
                Ok(GitHubResponse::SubIssues(lists))
            }
            GitHubEffect::SearchOpenIssues {
                labels,
                issue_types,
                limit,
            } => {
                if state.fail_search {
                    return Err("injected search failure".to_string());
                }
                let matches = state
                    .issues
                    .values()
                    .filter(|issue| issue.state == IssueState::Open)
                    .filter(|issue| {
                        let have = state.labels.get(&issue.number);
                        labels.is_empty()
                            || labels
                                .iter()
                                .any(|l| have.is_some_and(|h| h.iter().any(|x| x == l)))
                    })
                    .filter(|issue| {
                        let have = state.issue_types.get(&issue.number);
                        issue_types.is_empty() || issue_types.iter().any(|t| have == Some(t))
                    })
                    .take(limit as usize)
                    .cloned()
                    .collect();
                Ok(GitHubResponse::IssueList(matches))
            }
            GitHubEffect::ListOpenIssuesByUpdated { after, per_page } => {
                let start: usize = after.as_deref().map_or(0, |c| c.parse().unwrap());
                let page_index = start / per_page.max(1) as usize;
                if state
                    .fail_listing_from_page
                    .is_some_and(|from| page_index >= from)
                {
                    return Err(format!("injected failure listing page {page_index}"));
                }
                let mut open: Vec<Issue> = state
                    .issues
                    .values()
                    .filter(|i| i.state == IssueState::Open)
                    .cloned()
                    .collect();
                open.sort_by_key(|i| (i.updated_at, i.number));
                let end = (start + per_page as usize).min(open.len());
                let issues = open[start.min(end)..end].to_vec();
                let next_cursor = (end < open.len()).then(|| end.to_string());
                Ok(GitHubResponse::IssuePage(IssuePage {
                    issues,
                    next_cursor,
                }))
            }
            GitHubEffect::PostComment { issue, body } => {
                if state.fail_comments_on.contains(&issue) {
                    return Err(format!("injected failure commenting on {issue}"));
                }
                let Some(target) = state.issues.get_mut(&issue) else {
                    return Err(format!("404 Not Found: {issue}"));
                };
                target.updated_at = Some(now());
                target.last_comment = Some(Comment {
                    author: Some(Actor::bot(FAKE_BOT_LOGIN)),
                    created_at: Some(now()),
                });
                state.comments.push((issue, body));
                let id = state.comments.len() as u64;
                Ok(GitHubResponse::CommentPosted { id })
            }
        }
    }
}

impl GitHubInterpreter for FakeTracker {
    type Error = String;

    fn interpret(
        &self,
        effect: GitHubEffect,
    ) -> impl Future<Output = Result<GitHubResponse, Self::Error>> + Send {
        let response = self.respond(effect);
        async move { response }
    }
}

// ─── Generators ───────────────────────────────────────────────────────────────

/// Author logins: humans, name-pattern bots, and the default ignored actor.
pub fn arb_author() -> impl Strategy<Value = Actor> {
    prop_oneof![
        "[ac-z]{3,10}".prop_map(Actor::user),
        "[a-z]{3,10}".prop_map(|n| Actor::user(format!("{n}[bot]"))),
        "[a-z]{3,10}".prop_map(Actor::bot),
        Just(Actor::user("github-actions")),
    ]
}

/// An issue numbered `number`, updated 0..120 days ago, maybe with a comment
/// from up to 10 days before to 10 days after the update.
pub fn arb_issue(number: u64) -> impl Strategy<Value = Issue> {
    (
        0i64..120 * 24,
        prop::option::of((arb_author(), -240i64..240)),
    )
        .prop_map(move |(age_hours, comment)| {
            let updated_at = now() - Duration::hours(age_hours);
            let issue = Issue::new(IssueNumber(number), format!("issue {number}"), updated_at);
            match comment {
                Some((author, offset_hours)) => {
                    issue.with_comment(author, updated_at + Duration::hours(offset_hours))
                }
                None => issue,
            }
        })
}

/// A random graph on issues `1..=size` with arbitrary (possibly cyclic) edges.
pub fn arb_graph(max_size: u64) -> impl Strategy<Value = (Vec<Issue>, Vec<(u64, u64)>)> {
    (2..=max_size).prop_flat_map(|size| {
        let issues = (1..=size).map(arb_issue).collect::<Vec<_>>();
        let edges = prop::collection::vec((1..=size, 1..=size), 0..(size as usize * 2));
        (issues, edges)
    })
}
