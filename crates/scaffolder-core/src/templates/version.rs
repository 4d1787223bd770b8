//! Checking the running CLI against the latest published version

use crate::product::ProductConfig;
use anyhow::{Context, Result};
use semver::Version;
use serde_json::Value;

/// Compare the running version against the latest published one.
/// Returns an upgrade message if the CLI is older.
pub fn check_compatibility(
    cli_version: &str,
    latest_version: &str,
    upgrade_command: &str,
) -> Option<String> {
    let cli_ver = parse_version(cli_version).ok()?;
    let latest_ver = parse_version(latest_version).ok()?;

    if cli_ver < latest_ver {
        Some(format!(
            "A newer version is available.\n\
             latest:    {}\n\
             installed: {}\n\
             Consider updating: {}",
            latest_ver, cli_ver, upgrade_command
        ))
    } else {
        None
    }
}

/// Parse version string, handling various formats
pub fn parse_version(version_str: &str) -> Result<Version> {
    // Remove leading 'v' if present
    let cleaned = version_str.trim().strip_prefix('v').unwrap_or(version_str.trim());
    Version::parse(cleaned).map_err(|e| anyhow::anyhow!("Invalid version '{}': {}", version_str, e))
}

/// Pull the latest version out of a registry response.
///
/// Accepts the crates.io shape (`crate.max_stable_version`/`max_version`), the
/// npm shape (`dist-tags.latest`) or a top-level `version`.
fn latest_from_response(body: &Value) -> Option<&str> {
    body.pointer("/crate/max_stable_version")
        .or_else(|| body.pointer("/crate/max_version"))
        .or_else(|| body.pointer("/dist-tags/latest"))
        .or_else(|| body.get("version"))
        .and_then(Value::as_str)
}

/// Query the registry and return an upgrade message if one is due
pub async fn check_latest<C: ProductConfig>(config: &C, cli_version: &str) -> Result<Option<String>> {
    let url = std::env::var(config.version_check_url_env())
        .unwrap_or_else(|_| config.version_check_url().to_string());

    let client = reqwest::Client::builder()
        .user_agent(config.user_agent())
        .build()
        .context("Failed to build HTTP client")?;

    let response = client
        .get(url.as_str())
        .send()
        .await
        .with_context(|| format!("Failed to query {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to query {}: HTTP {}", url, response.status());
    }

    let body: Value = response
        .json()
        .await
        .context("Failed to parse version response")?;
    let latest = latest_from_response(&body)
        .ok_or_else(|| anyhow::anyhow!("No version found in response from {}", url))?;

    tracing::debug!(latest, installed = cli_version, "version check");
    Ok(check_compatibility(cli_version, latest, config.upgrade_command()))
}
