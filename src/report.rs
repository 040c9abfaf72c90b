use crate::collector::{ImageRecord, ResultSet};
use crate::filename_utils::{sanitized_file_path, urls_filename};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Number of records shown in the console preview
pub const PREVIEW_LEN: usize = 4;

/// Characters of a URL kept in the console preview
pub const PREVIEW_URL_WIDTH: usize = 68;

const TITLE_RULE_WIDTH: usize = 60;
const POST_RULE_WIDTH: usize = 50;
const ELLIPSIS: &str = "...";

/// Counts shown in the console and at the top of the report file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Total image variants
    pub images: usize,
    /// Distinct post ids
    pub posts: usize,
}

impl Summary {
    pub fn of(results: &ResultSet) -> Self {
        Self {
            images: results.len(),
            posts: group_by_post(results).len(),
        }
    }
}

/// Group records by post id; each group keeps the set's sorted order
pub fn group_by_post(results: &ResultSet) -> BTreeMap<&str, Vec<&ImageRecord>> {
    let mut groups: BTreeMap<&str, Vec<&ImageRecord>> = BTreeMap::new();
    for record in results {
        groups.entry(record.post_id.as_str()).or_default().push(record);
    }
    groups
}

/// Keep the first `width` characters of a URL and append an ellipsis when anything was cut
pub fn truncate_url(url: &str, width: usize) -> String {
    let mut truncated: String = url.chars().take(width).collect();
    if truncated.len() < url.len() {
        truncated.push_str(ELLIPSIS);
    }
    truncated
}

/// First few records, numbered, for the console
pub fn render_preview(results: &ResultSet) -> String {
    let mut preview = String::new();
    for (index, record) in results.iter().take(PREVIEW_LEN).enumerate() {
        let _ = writeln!(
            preview,
            "  {number}. {post_id} | {resolution} | {url}",
            number = index + 1,
            post_id = record.post_id,
            resolution = record.resolution,
            url = truncate_url(&record.url, PREVIEW_URL_WIDTH),
        );
    }
    preview
}

/// Full report text, grouped by post
pub fn render_report(username: &str, results: &ResultSet) -> String {
    let summary = Summary::of(results);
    let mut report = String::new();

    let _ = writeln!(
        report,
        "InstaTrace – @{username} – {images} image URLs",
        images = summary.images
    );
    let _ = writeln!(report, "{}\n", "=".repeat(TITLE_RULE_WIDTH));
    let _ = writeln!(
        report,
        "Posts: {posts}    Images/variants: {images}\n",
        posts = summary.posts,
        images = summary.images
    );

    for (post_id, records) in group_by_post(results) {
        let _ = writeln!(report, "Post {post_id}");
        let _ = writeln!(report, "  {} variants", records.len());
        let _ = writeln!(report, "{}", "-".repeat(POST_RULE_WIDTH));
        for (index, record) in records.iter().enumerate() {
            let _ = writeln!(
                report,
                "  {number:2}. {resolution:>10}   {url}",
                number = index + 1,
                resolution = record.resolution,
                url = record.url,
            );
        }
        let _ = writeln!(report);
    }

    report
}

/// Write `<username>_urls.txt` into `output_dir`, creating the directory if needed.
///
/// An empty result set writes nothing and returns `None`; neither the directory nor an
/// existing file is touched.
pub fn write_report(
    results: &ResultSet,
    username: &str,
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    if results.is_empty() {
        debug!("No records, skipping report file");
        return Ok(None);
    }

    let file_path = sanitized_file_path(output_dir, &urls_filename(username));
    let report = render_report(username, results);

    if !output_dir.exists() {
        fs::create_dir_all(output_dir).with_context(|| {
            format!("Failed to create output directory {}", output_dir.display())
        })?;
        debug!("Created output directory {}", output_dir.display());
    }

    {
        let file = File::create(&file_path).with_context(|| {
            format!("Failed to create report file {}", file_path.display())
        })?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(report.as_bytes())
            .context("Failed to write report")?;
        writer.flush().context("Failed to flush report file")?;
    }

    debug!(
        "Saved {count} URLs to {path}",
        count = results.len(),
        path = file_path.display()
    );

    Ok(Some(file_path))
}
