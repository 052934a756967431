//! Detail-page extraction: one document reference plus a title.
//!
//! Document strategies run in a fixed order and the first non-empty value
//! wins:
//! 1. the first `iframe[src]`
//! 2. the first anchor whose target path ends in `.pdf`
//! 3. the first element whose `src` (any element) or `href` (anchors)
//!    contains `.pdf`, preferring `src`

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::utils::{
    compile_static_selector, contains_pdf_marker, element_text, non_empty_attr, path_ends_with_pdf,
};

static IFRAME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("iframe[src]"));
static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("a[href]"));
static SOURCE_OR_ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("[src], a[href]"));
static TITLE_SELECTORS: LazyLock<[Selector; 4]> = LazyLock::new(|| {
    ["h1", "h2", "h3", "title"].map(compile_static_selector)
});

/// A single extraction rule over a parsed page.
pub type DocumentStrategy = fn(&Html) -> Option<String>;

/// Ordered document strategies, named for logging.
pub const DOCUMENT_STRATEGIES: [(&str, DocumentStrategy); 3] = [
    ("iframe", iframe_source),
    ("pdf_anchor", pdf_anchor),
    ("pdf_marker", pdf_marker_element),
];

/// Result of detail-mode extraction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DetailExtraction {
    /// Document reference, root-relative values rewritten to `page_url`'s origin.
    /// `None` when every strategy came up empty.
    pub document_url: Option<String>,
    /// First non-empty `h1`, `h2`, `h3`, then `<title>`; empty when none.
    pub title: String,
}

/// Runs detail-mode extraction over `html` fetched from `page_url`.
#[must_use]
pub fn extract_detail(html: &str, page_url: &Url) -> DetailExtraction {
    let document = Html::parse_document(html);

    let document_url = DOCUMENT_STRATEGIES
        .iter()
        .find_map(|(name, strategy)| {
            strategy(&document)
                .inspect(|value| debug!(strategy = *name, value = %value, "document reference found"))
        })
        .map(|value| absolutize_reference(&value, page_url));

    DetailExtraction {
        document_url,
        title: page_title(&document),
    }
}

fn iframe_source(document: &Html) -> Option<String> {
    document
        .select(&IFRAME_SELECTOR)
        .next()
        .and_then(|iframe| non_empty_attr(iframe, "src"))
        .map(str::to_string)
}

fn pdf_anchor(document: &Html) -> Option<String> {
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|anchor| non_empty_attr(anchor, "href"))
        .find(|href| path_ends_with_pdf(href))
        .map(str::to_string)
}

fn pdf_marker_element(document: &Html) -> Option<String> {
    document
        .select(&SOURCE_OR_ANCHOR_SELECTOR)
        .find(|element| {
            let src_matches = element.value().attr("src").is_some_and(contains_pdf_marker);
            let href_matches = element.value().name() == "a"
                && element.value().attr("href").is_some_and(contains_pdf_marker);
            src_matches || href_matches
        })
        .and_then(|element| {
            non_empty_attr(element, "src").or_else(|| non_empty_attr(element, "href"))
        })
        .map(str::to_string)
}

fn page_title(document: &Html) -> String {
    TITLE_SELECTORS
        .iter()
        .filter_map(|selector| document.select(selector).next())
        .map(element_text)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

/// Rewrites root-relative (`/x.pdf`) and protocol-relative (`//host/x.pdf`)
/// references against the fetched page; anything else is returned untouched.
fn absolutize_reference(value: &str, page_url: &Url) -> String {
    if value.starts_with("//") {
        return format!("{}:{value}", page_url.scheme());
    }
    if value.starts_with('/') {
        return format!("{}{value}", page_url.origin().ascii_serialization());
    }
    value.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://filhaal.vercel.app/debates/censorship").unwrap()
    }

    #[test]
    fn test_iframe_beats_pdf_anchor() {
        let html = r#"
            <a href="B.pdf">download</a>
            <iframe src="A"></iframe>
        "#;

        let extraction = extract_detail(html, &page());

        assert_eq!(extraction.document_url.as_deref(), Some("A"));
    }

    #[test]
    fn test_pdf_anchor_used_when_no_iframe() {
        let html = r#"<a href="/about">about</a><a href="B.pdf">download</a>"#;

        let extraction = extract_detail(html, &page());

        assert_eq!(extraction.document_url.as_deref(), Some("B.pdf"));
    }

    #[test]
    fn test_root_relative_reference_rewritten_to_page_origin() {
        let html = r#"<a href="/B.pdf">download</a>"#;

        let extraction = extract_detail(html, &page());

        assert_eq!(
            extraction.document_url.as_deref(),
            Some("https://filhaal.vercel.app/B.pdf")
        );
    }

    #[test]
    fn test_protocol_relative_reference_takes_page_scheme() {
        let html = r#"<iframe src="//res.cloudinary.com/demo/raw/upload/a.pdf"></iframe>"#;

        let extraction = extract_detail(html, &page());

        assert_eq!(
            extraction.document_url.as_deref(),
            Some("https://res.cloudinary.com/demo/raw/upload/a.pdf")
        );
    }

    #[test]
    fn test_pdf_marker_fallback_prefers_src() {
        let html = r#"
            <a href="/viewer">viewer</a>
            <embed src="/files/report.pdf?v=2" href="/ignored.pdf">
        "#;

        let extraction = extract_detail(html, &page());

        assert_eq!(
            extraction.document_url.as_deref(),
            Some("https://filhaal.vercel.app/files/report.pdf?v=2")
        );
    }

    #[test]
    fn test_pdf_marker_fallback_matches_query_embedded_anchor() {
        let html = r#"<a href="https://cdn.example.org/view?file=paper.pdf">open</a>"#;

        let extraction = extract_detail(html, &page());

        assert_eq!(
            extraction.document_url.as_deref(),
            Some("https://cdn.example.org/view?file=paper.pdf")
        );
    }

    #[test]
    fn test_empty_iframe_src_falls_through() {
        let html = r#"<iframe src="  "></iframe><a href="doc.pdf">doc</a>"#;

        let extraction = extract_detail(html, &page());

        assert_eq!(extraction.document_url.as_deref(), Some("doc.pdf"));
    }

    #[test]
    fn test_no_reference_is_soft_none() {
        let html = "<html><head><title>Nothing here</title></head><body><p>text</p></body></html>";

        let extraction = extract_detail(html, &page());

        assert!(extraction.document_url.is_none());
        assert_eq!(extraction.title, "Nothing here");
    }

    #[test]
    fn test_title_priority_h1_then_h2_then_h3_then_title() {
        let with_h1 = "<title>T</title><h3>three</h3><h2>two</h2><h1>one</h1>";
        assert_eq!(extract_detail(with_h1, &page()).title, "one");

        let empty_h1 = "<title>T</title><h1>  </h1><h3>three</h3><h2>two</h2>";
        assert_eq!(extract_detail(empty_h1, &page()).title, "two");

        let only_h3 = "<title>T</title><h3> three </h3>";
        assert_eq!(extract_detail(only_h3, &page()).title, "three");

        let only_title = "<head><title> Page </title></head>";
        assert_eq!(extract_detail(only_title, &page()).title, "Page");
    }

    #[test]
    fn test_missing_title_is_empty_string() {
        assert_eq!(extract_detail("<p>x</p>", &page()).title, "");
    }

    #[test]
    fn test_strategies_are_ordered() {
        let names: Vec<_> = DOCUMENT_STRATEGIES.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["iframe", "pdf_anchor", "pdf_marker"]);
    }
}
