//! First-image extraction.
//!
//! Picks the first `<img>` in document order whose `src` ends in `.jpg`
//! (case-insensitive) and resolves it against the page URL. There is no
//! scoring and no fallback pattern.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

static JPG_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.jpg\n?$").expect("valid regex"));

/// Returns the absolute URL of the first `.jpg` image in `html`, or `None`
/// if `html` is absent, no image matches, or the match cannot be resolved.
/// Never returns an error; failures are logged.
#[must_use]
pub fn extract_image_url(html: Option<&str>, base_url: &str) -> Option<Url> {
    let html = html?;

    let base = match Url::parse(base_url) {
        Ok(base) => base,
        Err(e) => {
            log::error!("Error parsing HTML for {base_url}: invalid base URL: {e}");
            return None;
        }
    };

    let selector = match Selector::parse("img[src]") {
        Ok(selector) => selector,
        Err(e) => {
            log::error!("Error parsing HTML for {base_url}: {e}");
            return None;
        }
    };

    let document = Html::parse_document(html);
    let Some(src) = document
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .find(|src| JPG_SRC_RE.is_match(src))
    else {
        log::warn!("No .jpg image found in {base_url}");
        return None;
    };

    match base.join(src) {
        Ok(resolved) => Some(resolved),
        Err(e) => {
            log::warn!("Malformed image source {src:?} in {base_url}: {e}");
            None
        }
    }
}
