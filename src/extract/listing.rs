//! Listing-page extraction: anchors below a path prefix become entries.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::utils::{compile_static_selector, element_text, non_empty_attr};

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("a[href]"));

/// One entry discovered on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Trailing path segment(s) below the prefix, percent-decoded.
    pub id: String,
    /// Anchor text, else its `title` attribute, else the id.
    pub title: String,
    /// The anchor target resolved against the page URL.
    pub source_url: String,
}

/// Extracts de-duplicated entries from anchors whose resolved path starts
/// with `path_prefix` (for example `/debates/`).
///
/// Entries keep first-seen order. Targets that cannot be resolved against
/// `base_url`, or that name nothing below the prefix, are skipped.
#[must_use]
pub fn extract_listing(html: &str, base_url: &Url, path_prefix: &str) -> Vec<ListingEntry> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = non_empty_attr(anchor, "href") else {
            continue;
        };
        let Ok(target) = base_url.join(href) else {
            debug!(href, "skipping unresolvable listing link");
            continue;
        };
        let Some(id) = identifier_below(target.path(), path_prefix) else {
            continue;
        };
        if !seen.insert(id.clone()) {
            continue;
        }

        let title = Some(element_text(anchor))
            .filter(|text| !text.is_empty())
            .or_else(|| non_empty_attr(anchor, "title").map(str::to_string))
            .unwrap_or_else(|| id.clone());

        entries.push(ListingEntry {
            id,
            title,
            source_url: target.to_string(),
        });
    }

    entries
}

fn identifier_below(path: &str, path_prefix: &str) -> Option<String> {
    let raw = path.strip_prefix(path_prefix)?.trim_end_matches('/');
    if raw.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |id| id.into_owned());
    Some(decoded)
}
