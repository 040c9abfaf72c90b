use sanitize_filename::sanitize;
use std::path::{Path, PathBuf};

/// Utility functions for naming the report written for a profile
///
/// Normalise a username typed at the prompt: surrounding whitespace and a leading @ are dropped
pub fn normalize_username(input: &str) -> &str {
    input.trim().trim_start_matches('@').trim()
}

/// Generate the report filename for a profile
/// Format: username_urls.txt
pub fn urls_filename(username: &str) -> String {
    format!("{username}_urls.txt")
}

/// Sanitize and create full file path
pub fn sanitized_file_path(output_dir: &Path, filename: &str) -> PathBuf {
    let sanitized_filename = sanitize(filename);
    output_dir.join(sanitized_filename)
}
