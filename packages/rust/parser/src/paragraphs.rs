//! Plain-paragraph extraction.

use scraper::ElementRef;

use crate::text::inline_text;

/// Text of each paragraph in document order. Blank paragraphs stay as
/// empty strings so indexes line up with the page's paragraphs.
pub(crate) fn extract(elements: &[ElementRef<'_>]) -> Vec<String> {
    elements.iter().map(|el| inline_text(*el, &[])).collect()
}
