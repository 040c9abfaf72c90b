use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

/// JSON parsing error handling utilities
///
/// Parse a JSON document into a generic value with contextual error handling
pub fn parse_json_value_with_context(json_str: &str, data_desc: &str) -> Result<Value> {
    serde_json::from_str(json_str).with_context(|| format!("Failed to parse {data_desc} as JSON"))
}

/// HTTP client utilities
///
/// Create HTTP client with a request timeout and contextual error handling
pub fn create_http_client_with_context(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

/// Render an error with its whole context chain on one line
pub fn format_error_chain(error: &anyhow::Error) -> String {
    format!("{error:#}")
}
