use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::debug;

use crate::collector::collect_images;
use crate::config::Config;
use crate::extractor::extract_timeline_json;
use crate::fetcher::{FetchError, ProfileClient};
use crate::filename_utils::normalize_username;
use crate::report::{render_preview, write_report, Summary};
use crate::session::read_line_detached;
use crate::status::{
    paint, print_status, Tone, EXPOSED_VERDICT, NOT_EXPOSED_VERDICT, PERMISSION_WARNING,
};

/// How a profile scan ended
#[derive(Debug)]
pub enum ScanOutcome {
    /// The profile page could not be fetched; nothing was written
    FetchFailed(FetchError),
    /// The page carries no timeline payload
    NotExposed,
    /// A timeline payload was found but held no image candidates
    NoImages,
    /// Images were collected and the report saved
    Saved { path: PathBuf, summary: Summary },
}

impl ScanOutcome {
    /// A failed fetch ends the run early, without the closing status line
    pub fn reached_verdict(&self) -> bool {
        !matches!(self, Self::FetchFailed(_))
    }
}

/// Status line shown for a failed profile request
pub fn fetch_failure_message(error: &FetchError) -> String {
    match error {
        FetchError::Status { status } => format!("HTTP {status} – likely blocked or invalid"),
        other => format!("Connection error: {other}"),
    }
}

/// Ask for a username on the given input.
///
/// The line is read on a detached thread, so an interrupt while waiting does not hang the
/// process. Returns `None` when the input is closed or the answer is empty once the leading
/// @ is removed.
pub async fn prompt_username<R>(input: R) -> Result<Option<String>>
where
    R: BufRead + Send + 'static,
{
    print!("{}", paint("Enter username (without @): ", Tone::Info));
    io::stdout().flush().context("Failed to flush stdout")?;

    let Some(line) = read_line_detached(input)
        .await
        .context("Failed to read username")?
    else {
        return Ok(None);
    };

    let username = normalize_username(&line);
    if username.is_empty() {
        Ok(None)
    } else {
        Ok(Some(username.to_string()))
    }
}

/// Fetch a profile, look for the timeline payload and save every image URL found in it
pub async fn execute(username: &str, config: &Config) -> Result<ScanOutcome> {
    println!();
    print_status(PERMISSION_WARNING, Tone::Warning);
    println!();

    if !config.startup_delay.is_zero() {
        tokio::time::sleep(config.startup_delay).await;
    }

    print_status(&format!("Checking @{username}"), Tone::Info);

    let client = ProfileClient::new(config).context("Failed to initialize profile client")?;
    let html = match client.fetch_profile(username).await {
        Ok(html) => html,
        Err(e) => {
            debug!("Failed to fetch profile @{username}: {e}");
            print_status(&fetch_failure_message(&e), Tone::Error);
            return Ok(ScanOutcome::FetchFailed(e));
        }
    };

    println!();
    let Some(timeline) = extract_timeline_json(&html) else {
        debug!("No timeline payload on the profile page of @{username}");
        println!("{}", paint(NOT_EXPOSED_VERDICT, Tone::Error));
        print_status("Account is likely empty, or the bug is patched", Tone::Dim);
        return Ok(ScanOutcome::NotExposed);
    };

    println!("{}", paint(EXPOSED_VERDICT, Tone::Success));
    print_status("Collecting image URLs...", Tone::Info);

    let results = collect_images(&timeline);
    if results.is_empty() {
        debug!("Timeline payload for @{username} contained no image candidates");
        print_status("No images extracted (strange – data was found)", Tone::Warning);
        return Ok(ScanOutcome::NoImages);
    }

    let summary = Summary::of(&results);
    println!(
        "{}",
        paint(
            &format!(
                "Found {images} image variants from ~{posts} posts",
                images = summary.images,
                posts = summary.posts
            ),
            Tone::Success
        )
    );
    println!("\n{}", paint("First few:", Tone::Dim));
    print!("{}", render_preview(&results));

    let path = write_report(&results, username, &config.output_dir)?
        .context("Report was not written for a non-empty result set")?;
    print_status(&format!("Results saved → {}", path.display()), Tone::Success);

    Ok(ScanOutcome::Saved { path, summary })
}
