//! Shared helpers for extraction: static selectors and text normalization.

use scraper::{ElementRef, Selector};

/// Compiles a CSS selector at static init; panics on invalid pattern.
pub fn compile_static_selector(pattern: &str) -> Selector {
    Selector::parse(pattern).unwrap_or_else(|e| panic!("invalid static selector '{pattern}': {e}"))
}

/// Visible text of an element with whitespace runs collapsed and trimmed.
#[must_use]
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns the trimmed attribute value when present and non-empty.
#[must_use]
pub fn non_empty_attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Case-insensitive check for a PDF marker anywhere in the value.
#[must_use]
pub fn contains_pdf_marker(value: &str) -> bool {
    value.to_ascii_lowercase().contains(".pdf")
}

/// Case-insensitive check that the path part (before `?`/`#`) ends in `.pdf`.
#[must_use]
pub fn path_ends_with_pdf(value: &str) -> bool {
    let path = value.split(['?', '#']).next().unwrap_or_default();
    path.to_ascii_lowercase().ends_with(".pdf")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use scraper::Html;

    use super::*;

    #[test]
    fn test_element_text_collapses_whitespace() {
        let html = Html::parse_fragment("<h1>\n  Free   <em>speech</em>\n debate </h1>");
        let selector = compile_static_selector("h1");
        let h1 = html.select(&selector).next().unwrap();
        assert_eq!(element_text(h1), "Free speech debate");
    }

    #[test]
    fn test_path_ends_with_pdf_ignores_query_and_case() {
        assert!(path_ends_with_pdf("/files/a.pdf"));
        assert!(path_ends_with_pdf("/files/A.PDF?download=1"));
        assert!(path_ends_with_pdf("b.pdf#page=2"));
        assert!(!path_ends_with_pdf("/viewer?file=a.pdf"));
        assert!(!path_ends_with_pdf("/files/a.pdfx"));
    }

    #[test]
    fn test_contains_pdf_marker_anywhere() {
        assert!(contains_pdf_marker("/viewer?file=a.PDF"));
        assert!(!contains_pdf_marker("/viewer?file=a.doc"));
    }

    #[test]
    #[should_panic(expected = "invalid static selector")]
    fn test_compile_static_selector_panics_on_invalid_pattern() {
        let _ = compile_static_selector("a[");
    }
}
