use crate::error_utils::parse_json_value_with_context;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

/// Connection name of the timeline feed embedded in profile pages
pub const TIMELINE_MARKER: &str = "polaris_timeline_connection";

/// Key carrying the resolution variants of an image
pub const IMAGE_MARKER: &str = "image_versions2";

/// Find the embedded timeline payload in a profile page.
///
/// Script blocks of type `application/json` are checked in document order. The first one
/// that mentions both markers and parses as JSON is returned; blocks that mention both
/// markers but fail to parse are skipped. `None` means the page carries no timeline data.
pub fn extract_timeline_json(html: &str) -> Option<Value> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse(r#"script[type="application/json"]"#) {
        Ok(selector) => selector,
        Err(e) => {
            debug!("Invalid script selector: {e}");
            return None;
        }
    };

    for (index, script) in document.select(&selector).enumerate() {
        let text: String = script.text().collect();
        if !is_timeline_payload(&text) {
            continue;
        }

        match parse_json_value_with_context(&text, "embedded timeline script") {
            Ok(value) => {
                debug!(index, bytes = text.len(), "Found timeline payload");
                return Some(value);
            }
            Err(e) => {
                debug!(index, "Skipping script block: {e:#}");
            }
        }
    }

    None
}

fn is_timeline_payload(text: &str) -> bool {
    text.contains(TIMELINE_MARKER) && text.contains(IMAGE_MARKER)
}
