use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.instagram.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STARTUP_DELAY_MS: u64 = 800;

/// Runtime settings for a single profile check
#[derive(Debug, Clone)]
pub struct Config {
    /// Site root the profile path is appended to
    pub base_url: String,
    /// Timeout for the profile request
    pub timeout: Duration,
    /// Pause before the request is sent
    pub startup_delay: Duration,
    /// Directory the `<username>_urls.txt` report is written to
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            startup_delay: Duration::from_millis(DEFAULT_STARTUP_DELAY_MS),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Build a config from the raw command line values
    pub fn from_cli(
        base_url: &str,
        timeout_secs: u64,
        startup_delay_ms: u64,
        output_dir: PathBuf,
    ) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            startup_delay: Duration::from_millis(startup_delay_ms),
            output_dir,
        })
    }

    /// Config pointing at another host, used to point a run at a local server
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;

        Ok(Self {
            base_url,
            ..Self::default()
        })
    }
}

/// Check that the base URL can carry a path and normalise it without a trailing slash
fn validate_base_url(base_url: &str) -> Result<String> {
    let parsed =
        Url::parse(base_url).with_context(|| format!("Invalid base URL: {base_url}"))?;
    if parsed.cannot_be_a_base() {
        bail!("Base URL cannot carry a profile path: {base_url}");
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
