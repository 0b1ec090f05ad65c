//! Optional header blocks: chapter label, chapter summary and book summary.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::text::{inline_text, text_lines};

static TITLE_NUMBER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.title-number").expect("valid selector"));
static STUDY_SUMMARY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.study-summary").expect("valid selector"));
static BOOK_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1#title1").expect("valid selector"));
static INTRO: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.intro").expect("valid selector"));
static SUBTITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.subtitle").expect("valid selector"));

/// Header fields found on a page. Absent or empty blocks are `None`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Summary {
    pub chapter_label: Option<String>,
    pub chapter_summary: Option<Vec<String>>,
    pub book_title: Option<String>,
    pub book_intro: Option<Vec<String>>,
    pub subtitle: Option<Vec<String>>,
}

impl Summary {
    pub(crate) fn extract(doc: &Html) -> Self {
        Self {
            chapter_label: single(doc, &TITLE_NUMBER),
            chapter_summary: lines(doc, &STUDY_SUMMARY),
            book_title: single(doc, &BOOK_TITLE),
            book_intro: lines(doc, &INTRO),
            subtitle: lines(doc, &SUBTITLE),
        }
    }

    /// Whether any book-level block is present.
    pub(crate) fn has_book_summary(&self) -> bool {
        self.book_title.is_some() || self.book_intro.is_some() || self.subtitle.is_some()
    }
}

fn single(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .next()
        .map(|el| inline_text(el, &[]))
        .filter(|text| !text.is_empty())
}

fn lines(doc: &Html, sel: &Selector) -> Option<Vec<String>> {
    doc.select(sel)
        .next()
        .map(text_lines)
        .filter(|lines| !lines.is_empty())
}
