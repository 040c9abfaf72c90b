use crate::extractor::IMAGE_MARKER;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::str::CharIndices;
use thiserror::Error;
use tracing::debug;

/// Post id used when no enclosing object carried a `pk`
pub const UNKNOWN_POST_ID: &str = "unknown";

const MISSING_DIMENSION: &str = "?";

/// One resolution variant of one post image
///
/// Ordering is lexicographic over (post_id, resolution, url), which is the order
/// the report prints records in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageRecord {
    pub post_id: String,
    /// `{width}×{height}`
    pub resolution: String,
    pub url: String,
}

impl ImageRecord {
    pub fn new(
        post_id: impl Into<String>,
        resolution: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            post_id: post_id.into(),
            resolution: resolution.into(),
            url: url.into(),
        }
    }
}

/// Deduplicated records, iterated in sorted order
pub type ResultSet = BTreeSet<ImageRecord>;

/// Walk a timeline payload and collect every image candidate under its nearest post id
pub fn collect_images(root: &Value) -> ResultSet {
    let mut results = ResultSet::new();
    walk(root, None, &mut results);
    debug!(records = results.len(), "Collected image candidates");
    results
}

// The post id is passed down by value so a `pk` only applies to its own subtree.
fn walk(node: &Value, post_id: Option<&str>, results: &mut ResultSet) {
    match node {
        Value::Object(map) => {
            let own_id = map.get("pk").and_then(scalar_string);
            let post_id = own_id.as_deref().or(post_id);

            collect_candidates(map, post_id.unwrap_or(UNKNOWN_POST_ID), results);

            for value in map.values() {
                walk(value, post_id, results);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, post_id, results);
            }
        }
        _ => {}
    }
}

fn collect_candidates(map: &Map<String, Value>, post_id: &str, results: &mut ResultSet) {
    let Some(candidates) = map
        .get(IMAGE_MARKER)
        .and_then(|versions| versions.get("candidates"))
        .and_then(Value::as_array)
    else {
        return;
    };

    for candidate in candidates {
        let Some(url) = candidate
            .get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
        else {
            continue;
        };

        let resolution = format!(
            "{width}×{height}",
            width = dimension(candidate.get("width")),
            height = dimension(candidate.get("height")),
        );

        results.insert(ImageRecord::new(post_id, resolution, decode_url(url)));
    }
}

/// String form of a `pk`; `null` carries no id
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Width or height text; a `null` counts as missing
fn dimension(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => MISSING_DIMENSION.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Why a URL could not be decoded
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("URL ends with a lone backslash")]
    TrailingBackslash,

    #[error("truncated escape sequence at byte {position}")]
    Truncated { position: usize },

    #[error("invalid hex digit in escape sequence at byte {position}")]
    InvalidHex { position: usize },

    #[error("escape sequence at byte {position} is not a valid code point")]
    InvalidCodePoint { position: usize },
}

/// Decode a candidate URL, falling back to the raw string when it cannot be decoded
pub fn decode_url(raw: &str) -> String {
    match try_decode_url(raw) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!("Keeping raw URL {raw}: {e}");
            raw.to_string()
        }
    }
}

/// Undo backslash escapes, then percent-encoding.
///
/// Percent-decoded bytes that are not UTF-8 become U+FFFD instead of failing.
pub fn try_decode_url(raw: &str) -> Result<String, DecodeError> {
    let unescaped = unescape_backslashes(raw)?;
    let decoded = urlencoding::decode_binary(unescaped.as_bytes());
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}

fn unescape_backslashes(input: &str) -> Result<String, DecodeError> {
    if !input.contains('\\') {
        return Ok(input.to_string());
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices();

    while let Some((position, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let Some((_, escape)) = chars.next() else {
            return Err(DecodeError::TrailingBackslash);
        };

        match escape {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '\\' | '\'' | '"' => out.push(escape),
            'x' => out.push(code_point(read_hex(&mut chars, 2, position)?, position)?),
            'U' => out.push(code_point(read_hex(&mut chars, 8, position)?, position)?),
            'u' => {
                let unit = read_hex(&mut chars, 4, position)?;
                if (0xD800..0xDC00).contains(&unit) {
                    out.push(surrogate_pair(unit, &mut chars, position)?);
                } else {
                    out.push(code_point(unit, position)?);
                }
            }
            // Unknown escapes stay as written
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    Ok(out)
}

fn read_hex(
    chars: &mut CharIndices<'_>,
    digits: usize,
    position: usize,
) -> Result<u32, DecodeError> {
    let mut value = 0u32;
    for _ in 0..digits {
        let (_, c) = chars.next().ok_or(DecodeError::Truncated { position })?;
        let digit = c.to_digit(16).ok_or(DecodeError::InvalidHex { position })?;
        value = value * 16 + digit;
    }
    Ok(value)
}

fn code_point(value: u32, position: usize) -> Result<char, DecodeError> {
    char::from_u32(value).ok_or(DecodeError::InvalidCodePoint { position })
}

/// A high surrogate must be followed by `\u` and a low surrogate
fn surrogate_pair(
    high: u32,
    chars: &mut CharIndices<'_>,
    position: usize,
) -> Result<char, DecodeError> {
    let invalid = DecodeError::InvalidCodePoint { position };

    match (chars.next(), chars.next()) {
        (Some((_, '\\')), Some((_, 'u'))) => {}
        (None, _) | (_, None) => return Err(DecodeError::Truncated { position }),
        _ => return Err(invalid),
    }

    let low = read_hex(chars, 4, position)?;
    if !(0xDC00..0xE000).contains(&low) {
        return Err(invalid);
    }

    code_point(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00), position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(pk: &str, urls: &[(&str, u32, u32)]) -> Value {
        let candidates: Vec<Value> = urls
            .iter()
            .map(|(url, width, height)| json!({"url": url, "width": width, "height": height}))
            .collect();
        json!({"pk": pk, "image_versions2": {"candidates": candidates}})
    }

    #[test]
    fn test_single_post() {
        let root = json!({
            "pk": "100",
            "image_versions2": {"candidates": [{"url": "http://x/a.jpg", "width": 10, "height": 20}]}
        });

        let results = collect_images(&root);
        assert_eq!(results.len(), 1);
        assert_eq!(
            results.into_iter().next().unwrap(),
            ImageRecord::new("100", "10×20", "http://x/a.jpg")
        );
    }

    #[test]
    fn test_without_pk_is_unknown() {
        let root = json!({
            "data": {
                "edges": [
                    {"node": {"image_versions2": {"candidates": [{"url": "http://x/1.jpg", "width": 1, "height": 1}]}}},
                    {"node": {"image_versions2": {"candidates": [{"url": "http://x/2.jpg", "width": 2, "height": 2}]}}}
                ]
            }
        });

        let results = collect_images(&root);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.post_id == UNKNOWN_POST_ID));
    }

    #[test]
    fn test_siblings_keep_their_own_post_id() {
        let root = json!({
            "edges": [
                {"node": post("1", &[("http://x/a.jpg", 10, 10), ("http://x/b.jpg", 20, 20)])},
                {"node": post("2", &[("http://x/c.jpg", 30, 30)])}
            ]
        });

        let results: Vec<ImageRecord> = collect_images(&root).into_iter().collect();
        assert_eq!(
            results,
            vec![
                ImageRecord::new("1", "10×10", "http://x/a.jpg"),
                ImageRecord::new("1", "20×20", "http://x/b.jpg"),
                ImageRecord::new("2", "30×30", "http://x/c.jpg"),
            ]
        );
    }

    #[test]
    fn test_inner_pk_does_not_leak_sideways() {
        // The carousel child with its own pk comes first; the one after it still belongs to the parent.
        let root = json!({
            "pk": "parent",
            "carousel_media": [
                {"pk": "child", "image_versions2": {"candidates": [{"url": "http://x/child.jpg", "width": 1, "height": 1}]}},
                {"image_versions2": {"candidates": [{"url": "http://x/other.jpg", "width": 1, "height": 1}]}}
            ]
        });

        let results = collect_images(&root);
        assert!(results.contains(&ImageRecord::new("child", "1×1", "http://x/child.jpg")));
        assert!(results.contains(&ImageRecord::new("parent", "1×1", "http://x/other.jpg")));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_pk_and_dimension_forms() {
        let root = json!({
            "pk": 3141592653589793u64,
            "image_versions2": {"candidates": [
                {"url": "http://x/a.jpg", "width": "640"},
                {"url": "http://x/b.jpg", "height": 480},
                {"url": "http://x/c.jpg", "width": null, "height": 1.5}
            ]}
        });

        let results: Vec<ImageRecord> = collect_images(&root).into_iter().collect();
        assert_eq!(
            results,
            vec![
                ImageRecord::new("3141592653589793", "640×?", "http://x/a.jpg"),
                ImageRecord::new("3141592653589793", "?×1.5", "http://x/c.jpg"),
                ImageRecord::new("3141592653589793", "?×480", "http://x/b.jpg"),
            ]
        );
    }

    #[test]
    fn test_null_pk_keeps_context() {
        let root = json!({
            "pk": "outer",
            "node": {"pk": null, "image_versions2": {"candidates": [{"url": "http://x/a.jpg", "width": 1, "height": 1}]}}
        });

        let results = collect_images(&root);
        assert!(results.contains(&ImageRecord::new("outer", "1×1", "http://x/a.jpg")));
    }

    #[test]
    fn test_skips_candidates_without_url() {
        let root = json!({
            "pk": "9",
            "image_versions2": {"candidates": [
                {"url": "", "width": 1, "height": 1},
                {"width": 2, "height": 2},
                {"url": 17, "width": 3, "height": 3},
                "not an object",
                {"url": "http://x/ok.jpg", "width": 4, "height": 4}
            ]}
        });

        let results = collect_images(&root);
        assert_eq!(results.len(), 1);
        assert!(results.contains(&ImageRecord::new("9", "4×4", "http://x/ok.jpg")));
    }

    #[test]
    fn test_ignores_malformed_image_versions() {
        let root = json!([
            {"pk": "1", "image_versions2": [{"url": "http://x/a.jpg"}]},
            {"pk": "2", "image_versions2": {"candidates": {"url": "http://x/b.jpg"}}},
            {"pk": "3", "image_versions2": null},
            "scalar",
            42
        ]);

        assert!(collect_images(&root).is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        let root = json!({
            "feed": [
                post("5", &[("http://x/a.jpg", 10, 10)]),
                post("5", &[("http://x/a.jpg", 10, 10)])
            ]
        });

        assert_eq!(collect_images(&root).len(), 1);
    }

    #[test]
    fn test_collect_is_idempotent() {
        let root = json!({
            "edges": [
                {"node": post("1", &[("http://x/a.jpg", 10, 10)])},
                {"node": {"image_versions2": {"candidates": [{"url": "http://x/b.jpg"}]}}}
            ]
        });

        assert_eq!(collect_images(&root), collect_images(&root));
    }

    #[test]
    fn test_scalar_root() {
        assert!(collect_images(&json!(null)).is_empty());
        assert!(collect_images(&json!("image_versions2")).is_empty());
    }

    #[test]
    fn test_decode_url_escapes() {
        assert_eq!(
            decode_url(r"https://cdn.example.com/v/a.jpg?stp=dst-jpg\u0026_nc_ht=x"),
            "https://cdn.example.com/v/a.jpg?stp=dst-jpg&_nc_ht=x"
        );
        assert_eq!(
            decode_url("https://cdn.example.com/a.jpg?oh=00%3D%3D&oe=1"),
            "https://cdn.example.com/a.jpg?oh=00==&oe=1"
        );
        assert_eq!(decode_url(r"http://x/\x41\U00000042"), "http://x/AB");
        assert_eq!(decode_url(r"http://x/\ud83d\ude00"), "http://x/😀");
        assert_eq!(decode_url(r"http://x/\q"), r"http://x/\q");
        assert_eq!(decode_url("http://x/plain.jpg"), "http://x/plain.jpg");
    }

    #[test]
    fn test_decode_url_falls_back_to_raw() {
        for raw in [
            r"http://x/\u12",
            r"http://x/\uZZZZ",
            r"http://x/\ud83d",
            r"http://x/\ud83dabc",
            r"http://x/\udc00",
            "http://x/a\\",
        ] {
            assert_eq!(decode_url(raw), raw);
        }
    }

    #[test]
    fn test_try_decode_url_errors() {
        assert_eq!(
            try_decode_url(r"ab\u12"),
            Err(DecodeError::Truncated { position: 2 })
        );
        assert_eq!(
            try_decode_url(r"\xZZ"),
            Err(DecodeError::InvalidHex { position: 0 })
        );
        assert_eq!(
            try_decode_url(r"\U00110000"),
            Err(DecodeError::InvalidCodePoint { position: 0 })
        );
        assert_eq!(try_decode_url("\\"), Err(DecodeError::TrailingBackslash));
    }

    #[test]
    fn test_invalid_percent_utf8_is_replaced() {
        assert_eq!(decode_url("http://x/%FF"), "http://x/\u{FFFD}");
        assert_eq!(try_decode_url("%C3%28"), Ok("\u{FFFD}(".to_string()));
        assert_eq!(decode_url("http://x/caf%C3%A9.jpg"), "http://x/café.jpg");
    }

    #[test]
    fn test_decoded_urls_in_records() {
        let root = json!({
            "pk": "1",
            "image_versions2": {"candidates": [
                {"url": "http://x/a.jpg?x=1\\u0026y=2", "width": 1, "height": 1},
                {"url": "http://x/b.jpg%", "width": 2, "height": 2}
            ]}
        });

        let urls: Vec<String> = collect_images(&root).into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["http://x/a.jpg?x=1&y=2", "http://x/b.jpg%"]);
    }
}
