//! HTML extraction for the external debates site.
//!
//! The upstream markup is not under our control, so extraction is written as
//! small pure functions over a parsed [`scraper::Html`] tree:
//!
//! - [`extract_listing`] - collects `(id, title, source URL)` entries from
//!   anchors that point below a listing path prefix
//! - [`extract_detail`] - locates one embeddable document reference through
//!   an ordered chain of strategies, plus a best-effort page title
//!
//! Nothing here performs I/O or returns errors: malformed links are skipped
//! and an exhausted strategy chain yields `None`.

mod detail;
mod listing;
mod utils;

pub use detail::{DOCUMENT_STRATEGIES, DetailExtraction, DocumentStrategy, extract_detail};
pub use listing::{ListingEntry, extract_listing};
