//! Page parsing for scripturekit.
//!
//! Turns the raw markup of one leaf page into a [`ContentRecord`]:
//! 1. Unwrap the page envelope from its embedded state
//! 2. Detect the body [`PageLayout`] and run its extraction strategy
//! 3. Pick up optional header blocks (chapter label, summaries, book intro)
//! 4. Resolve the content kind, inferring it when the page does not say

mod layout;
mod paragraphs;
pub mod state;
mod summary;
mod text;
mod verses;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

use scraper::Html;
use tracing::{debug, instrument};

use scripturekit_shared::{
    ContentBody, ContentKind, ContentRecord, FetchError, Result, ScripturekitError,
};

pub use layout::PageLayout;
pub use state::{
    BookStore, ContentStore, NavContent, NavEntry, NavSection, ReaderState, StateError,
    decode_reader,
};

use summary::Summary;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The parts of a page the extractor works on.
#[derive(Debug, Clone)]
pub struct PageEnvelope {
    /// Page title, if the page declares one.
    pub title: Option<String>,
    /// Value of `data-content-type`, if present.
    pub content_type: Option<String>,
    /// Markup of the page body.
    pub body: String,
}

impl PageEnvelope {
    /// Unwrap a page through the content store of its embedded state.
    pub fn from_markup(markup: &str) -> std::result::Result<Self, StateError> {
        let store = decode_reader(markup)?.active_content()?;
        Ok(Self {
            title: Some(store.meta.title.trim().to_string()).filter(|t| !t.is_empty()),
            content_type: store.meta.content_type().map(str::to_string),
            body: store.content.body,
        })
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse one leaf page into a content record.
///
/// Fails when the page has no recognizable body (neither verses nor
/// paragraphs), no title, or invalid verse numbering. A page without
/// embedded state fails with the transient [`FetchError::MissingState`], so
/// callers that retry will request it again.
#[instrument(skip(markup), fields(len = markup.len()))]
pub fn parse_content(uri: &str, markup: &str) -> Result<ContentRecord> {
    let envelope = PageEnvelope::from_markup(markup).map_err(|e| match e {
        StateError::Missing => ScripturekitError::from(FetchError::MissingState {
            url: uri.to_string(),
        }),
        e => ScripturekitError::parse(uri, e.to_string()),
    })?;

    let doc = Html::parse_document(&envelope.body);
    let layout = PageLayout::detect(&doc).ok_or_else(|| {
        ScripturekitError::parse(uri, "page body has neither verses nor paragraphs")
    })?;
    let body = layout.extract(uri)?;
    let summary = Summary::extract(&doc);

    let title = envelope
        .title
        .ok_or_else(|| ScripturekitError::parse(uri, "page has no title"))?;

    let kind = envelope
        .content_type
        .as_deref()
        .and_then(ContentKind::from_attribute)
        .unwrap_or_else(|| infer_kind(&body, &summary));

    debug!(layout = layout.name(), %kind, "page parsed");

    Ok(ContentRecord {
        uri: uri.to_string(),
        kind,
        chapter_label: summary.chapter_label,
        chapter_summary: summary.chapter_summary,
        book_title: summary.book_title,
        book_intro: summary.book_intro,
        subtitle: summary.subtitle,
        title,
        body,
    })
}

/// Content kind for pages that do not declare a known one.
fn infer_kind(body: &ContentBody, summary: &Summary) -> ContentKind {
    match body {
        ContentBody::Verses(_) => ContentKind::Chapter,
        ContentBody::Paragraphs(_) if summary.has_book_summary() => ContentKind::Book,
        ContentBody::Paragraphs(_) => ContentKind::Figure,
    }
}
