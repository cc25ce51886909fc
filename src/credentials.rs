//! Token resolution.

use tracing::debug;

use crate::config::ConfigError;

/// Returns the configured token, or asks the `gh` CLI for one.
pub async fn resolve_token(explicit: Option<&str>) -> Result<String, ConfigError> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }

    debug!("No token configured; trying `gh auth token`");
    let output = tokio::process::Command::new("gh")
        .args(["auth", "token"])
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => {
            parse_gh_output(&out.stdout).ok_or(ConfigError::MissingToken)
        }
        Ok(out) => {
            debug!(
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "`gh auth token` failed"
            );
            Err(ConfigError::MissingToken)
        }
        Err(e) => {
            debug!(error = %e, "Could not run `gh`");
            Err(ConfigError::MissingToken)
        }
    }
}

fn parse_gh_output(stdout: &[u8]) -> Option<String> {
    let token = String::from_utf8_lossy(stdout).trim().to_string();
    (!token.is_empty()).then_some(token)
}
