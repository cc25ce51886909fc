//! Command-line and environment configuration.
//!
//! Every option can also come from the environment, either under a plain
//! name (`GITHUB_TOKEN`, `GITHUB_REPOSITORY`) or under the `INPUT_*` name a
//! GitHub Action step sets for its inputs. [`Config::from_cli`] validates the
//! parsed arguments once; nothing downstream reads the environment.

use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::github::RetryConfig;
use crate::scan::{DEFAULT_CANDIDATE_LIMIT, IssueFilters};
use crate::traversal::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_VISITED, TraversalConfig};
use crate::types::{DEFAULT_THRESHOLD_DAYS, InvalidRepoId, IssueNumber, RepoId, ThresholdWindow};

/// Comment posted on a parent issue whose sub-issues are still active.
pub const DEFAULT_UPDATE_MESSAGE: &str =
    "This issue is still being worked on through its sub-issues. Keeping it open.";

/// Search API page limit; the candidate query is a single page.
const MAX_CANDIDATE_LIMIT: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no repository given: pass --repo owner/name or set GITHUB_REPOSITORY")]
    MissingRepository,

    #[error(transparent)]
    InvalidRepository(#[from] InvalidRepoId),

    #[error("--repo-owner and --repo-name must be given together")]
    PartialRepository,

    #[error("at least one of parent-issue-labels or parent-issue-types must be provided")]
    NoFilters,

    #[error("invalid {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("no GitHub token: pass --token, set GITHUB_TOKEN, or log in with `gh auth login`")]
    MissingToken,
}

#[derive(Debug, Parser)]
#[command(
    name = "heirloom",
    version,
    about = "Keeps parent issues alive while their sub-issues see real activity"
)]
pub struct Cli {
    /// GitHub token (falls back to `gh auth token`)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long = "github-token", env = "INPUT_GITHUB-TOKEN", hide = true, hide_env_values = true)]
    pub action_token: Option<String>,

    /// Repository as owner/name
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repo: Option<String>,

    #[arg(long = "repo-owner", env = "INPUT_REPO-OWNER")]
    pub repo_owner: Option<String>,

    #[arg(long = "repo-name", env = "INPUT_REPO-NAME")]
    pub repo_name: Option<String>,

    /// Comma-separated labels marking parent issues
    #[arg(long = "parent-issue-labels", env = "INPUT_PARENT-ISSUE-LABELS")]
    pub labels: Option<String>,

    /// Comma-separated issue types marking parent issues
    #[arg(long = "parent-issue-types", env = "INPUT_PARENT-ISSUE-TYPES")]
    pub issue_types: Option<String>,

    /// Sub-issue activity newer than this many days keeps a parent alive
    #[arg(long = "days-threshold", env = "INPUT_DAYS-THRESHOLD", default_value_t = DEFAULT_THRESHOLD_DAYS)]
    pub days_threshold: u32,

    #[arg(long = "update-message", env = "INPUT_UPDATE-MESSAGE", default_value = DEFAULT_UPDATE_MESSAGE)]
    pub update_message: String,

    /// Log what would be commented without writing anything
    #[arg(long = "dry-run", env = "INPUT_DRY-RUN")]
    pub dry_run: bool,

    /// Comma-separated logins whose comments never count as activity
    #[arg(long = "ignored-actors", env = "INPUT_IGNORED-ACTORS")]
    pub ignored_actors: Option<String>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Stop expanding a hierarchy after this many issues
    #[arg(long, default_value_t = DEFAULT_MAX_VISITED)]
    pub max_visited: usize,

    #[arg(long, default_value_t = DEFAULT_CANDIDATE_LIMIT)]
    pub candidate_limit: u32,

    /// Attempts per remote call, including the first
    #[arg(long, default_value_t = RetryConfig::DEFAULT.max_attempts)]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub retry_delay_ms: u64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check open issues carrying the parent labels or types (default)
    Labels,
    /// Check every open issue not updated within the threshold
    Stale,
    /// Print how each sub-issue of one parent is classified; never writes
    Inspect { number: u64 },
}

/// What a run does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Labeled(IssueFilters),
    Stale,
    Inspect(IssueNumber),
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit token; `None` means ask the `gh` CLI.
    pub token: Option<String>,
    pub repo: RepoId,
    pub mode: Mode,
    pub threshold: ThresholdWindow,
    pub message: String,
    pub dry_run: bool,
    pub verbose: bool,
    pub ignored_actors: Vec<String>,
    pub traversal: TraversalConfig,
    pub candidate_limit: u32,
    pub retry: RetryConfig,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let repo = resolve_repo(&cli)?;

        let filters = IssueFilters {
            labels: split_list(cli.labels.as_deref()),
            issue_types: split_list(cli.issue_types.as_deref()),
        };
        let mode = match cli.command {
            None | Some(Command::Labels) => {
                if filters.is_empty() {
                    return Err(ConfigError::NoFilters);
                }
                Mode::Labeled(filters)
            }
            Some(Command::Stale) => Mode::Stale,
            Some(Command::Inspect { number }) => Mode::Inspect(IssueNumber(number)),
        };

        if cli.update_message.trim().is_empty() {
            return Err(invalid("update-message", "must not be empty"));
        }
        if cli.batch_size == 0 {
            return Err(invalid("batch-size", "must be at least 1"));
        }
        if cli.max_visited == 0 {
            return Err(invalid("max-visited", "must be at least 1"));
        }
        if !(1..=MAX_CANDIDATE_LIMIT).contains(&cli.candidate_limit) {
            return Err(invalid(
                "candidate-limit",
                format!("must be between 1 and {MAX_CANDIDATE_LIMIT}"),
            ));
        }
        if cli.max_attempts == 0 {
            return Err(invalid("max-attempts", "must be at least 1"));
        }

        let retry = RetryConfig {
            max_attempts: cli.max_attempts,
            initial_delay: Duration::from_millis(cli.retry_delay_ms),
            ..RetryConfig::DEFAULT
        };

        let ignored_actors = match cli.ignored_actors.as_deref() {
            Some(raw) => split_list(Some(raw)),
            None => vec![crate::activity::DEFAULT_IGNORED_ACTOR.to_string()],
        };

        Ok(Config {
            token: non_empty(cli.token).or_else(|| non_empty(cli.action_token)),
            repo,
            mode,
            threshold: ThresholdWindow::days(cli.days_threshold),
            message: cli.update_message,
            dry_run: cli.dry_run,
            verbose: cli.verbose,
            ignored_actors,
            traversal: TraversalConfig {
                batch_size: cli.batch_size,
                max_visited: cli.max_visited,
                ..TraversalConfig::default()
            },
            candidate_limit: cli.candidate_limit,
            retry,
        })
    }
}

fn resolve_repo(cli: &Cli) -> Result<RepoId, ConfigError> {
    let owner = non_empty(cli.repo_owner.clone());
    let name = non_empty(cli.repo_name.clone());
    match (owner, name) {
        (Some(owner), Some(name)) => Ok(RepoId::new(owner.trim(), name.trim())),
        (Some(_), None) | (None, Some(_)) => Err(ConfigError::PartialRepository),
        (None, None) => match non_empty(cli.repo.clone()) {
            Some(repo) => Ok(repo.parse()?),
            None => Err(ConfigError::MissingRepository),
        },
    }
}

/// Splits a comma-separated input, trimming entries and dropping empty ones.
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.into_iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, ConfigError> {
        let mut argv = vec!["heirloom"];
        argv.extend_from_slice(args);
        Config::from_cli(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn split_list_trims_and_drops_empties() {
        assert_eq!(split_list(Some(" epic, ,initiative ,")), vec!["epic", "initiative"]);
        assert!(split_list(Some("")).is_empty());
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn labels_mode_is_the_default() {
        let config = parse(&["--repo", "octo/widgets", "--parent-issue-labels", "epic"]).unwrap();
        assert_eq!(
            config.mode,
            Mode::Labeled(IssueFilters {
                labels: vec!["epic".into()],
                issue_types: vec![],
            })
        );
        assert_eq!(config.repo, RepoId::new("octo", "widgets"));
        assert_eq!(config.threshold, ThresholdWindow::days(30));
        assert_eq!(config.ignored_actors, vec!["github-actions".to_string()]);
    }

    #[test]
    fn labels_mode_without_filters_is_rejected() {
        let err = parse(&["--repo", "octo/widgets", "labels"]).unwrap_err();
        assert!(matches!(err, ConfigError::NoFilters));
    }

    #[test]
    fn stale_mode_needs_no_filters() {
        let config = parse(&["--repo", "octo/widgets", "--dry-run", "stale"]).unwrap();
        assert_eq!(config.mode, Mode::Stale);
        assert!(config.dry_run);
    }

    #[test]
    fn inspect_takes_an_issue_number() {
        let config = parse(&["--repo", "octo/widgets", "inspect", "42"]).unwrap();
        assert_eq!(config.mode, Mode::Inspect(IssueNumber(42)));
    }

    #[test]
    fn owner_and_name_override_repo() {
        let config = parse(&[
            "--repo",
            "octo/widgets",
            "--repo-owner",
            "acme",
            "--repo-name",
            "rockets",
            "stale",
        ])
        .unwrap();
        assert_eq!(config.repo, RepoId::new("acme", "rockets"));
    }

    #[test]
    fn owner_without_name_is_rejected() {
        let err = parse(&["--repo-owner", "acme", "stale"]).unwrap_err();
        assert!(matches!(err, ConfigError::PartialRepository));
    }

    #[test]
    fn malformed_repo_is_rejected() {
        let err = parse(&["--repo", "just-a-name", "stale"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRepository(_)));
    }

    #[test]
    fn knobs_flow_into_config() {
        let config = parse(&[
            "--repo",
            "octo/widgets",
            "--days-threshold",
            "14",
            "--batch-size",
            "3",
            "--max-visited",
            "50",
            "--max-attempts",
            "2",
            "--retry-delay-ms",
            "250",
            "--ignored-actors",
            "release-bot, Deploy-Helper",
            "stale",
        ])
        .unwrap();
        assert_eq!(config.threshold, ThresholdWindow::days(14));
        assert_eq!(config.traversal.batch_size, 3);
        assert_eq!(config.traversal.max_visited, 50);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
        assert_eq!(config.ignored_actors, vec!["release-bot", "Deploy-Helper"]);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = parse(&["--repo", "octo/widgets", "--batch-size", "0", "stale"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "batch-size", .. }));
    }

    #[test]
    fn candidate_limit_is_bounded() {
        let err = parse(&[
            "--repo",
            "octo/widgets",
            "--parent-issue-labels",
            "epic",
            "--candidate-limit",
            "500",
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "candidate-limit", .. }));
    }

    #[test]
    fn explicit_token_wins_over_action_input() {
        let config = parse(&[
            "--repo",
            "octo/widgets",
            "--token",
            "t-cli",
            "--github-token",
            "t-action",
            "stale",
        ])
        .unwrap();
        assert_eq!(config.token.as_deref(), Some("t-cli"));
    }
}
