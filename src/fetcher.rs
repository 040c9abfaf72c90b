use crate::config::Config;
use crate::error_utils::create_http_client_with_context;
use anyhow::Result;
use reqwest::{Client, StatusCode};
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Profile request failures, each reported separately to the user
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Profile request returned HTTP status {status}")]
    Status { status: u16 },

    #[error("Profile request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Cannot build a profile URL for {username:?}")]
    InvalidUsername { username: String },
}

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/128.0.0.0 Mobile Safari/537.36";

const ACCEPT_DOCUMENT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Client for the single profile page request
pub struct ProfileClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ProfileClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = create_http_client_with_context(config.timeout)?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            timeout: config.timeout,
        })
    }

    /// Canonical profile URL: `{base_url}/{username}/`
    pub fn profile_url(&self, username: &str) -> Result<Url, FetchError> {
        let invalid = || FetchError::InvalidUsername {
            username: username.to_string(),
        };

        if username.is_empty() {
            return Err(invalid());
        }

        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push(username)
            .push("");

        Ok(url)
    }

    /// Fetch the profile page once; only HTTP 200 counts as success
    pub async fn fetch_profile(&self, username: &str) -> Result<String, FetchError> {
        let url = self.profile_url(username)?;
        debug!(%url, "Requesting profile page");

        let response = build_profile_request(&self.client, url.as_str())
            .send()
            .await
            .map_err(|err| self.classify(&err))?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(%url, %status, "Profile page request was not successful");
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|err| self.classify(&err))?;
        debug!(bytes = body.len(), "Received profile page");

        Ok(body)
    }

    fn classify(&self, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            FetchError::Network {
                message: error_with_sources(err),
            }
        }
    }
}

/// Build the profile request with the headers a mobile browser sends for a top-level navigation
fn build_profile_request(client: &Client, url: &str) -> reqwest::RequestBuilder {
    client
        .get(url)
        .header("User-Agent", MOBILE_USER_AGENT)
        .header("Accept", ACCEPT_DOCUMENT)
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Sec-Fetch-Dest", "document")
        .header("Sec-Fetch-Mode", "navigate")
        .header("Sec-Fetch-Site", "none")
        .header("Upgrade-Insecure-Requests", "1")
}

/// reqwest keeps the interesting part (refused, DNS) in the source chain
fn error_with_sources(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
