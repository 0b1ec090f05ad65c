//! Body layout detection.
//!
//! A page body is either verse-structured or paragraph-structured. Each
//! layout has its own extraction strategy; both produce a [`ContentBody`].

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use scripturekit_shared::{ContentBody, Result};

use crate::{paragraphs, verses};

static BODY_BLOCK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.body-block").expect("valid selector"));
static VERSE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.verse").expect("valid selector"));
static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));

/// The shape of a page's main text.
#[derive(Debug)]
pub enum PageLayout<'a> {
    /// `p.verse` elements inside the body block.
    Verses(Vec<ElementRef<'a>>),
    /// Plain `p` elements inside the body block.
    Paragraphs(Vec<ElementRef<'a>>),
}

impl<'a> PageLayout<'a> {
    /// Classify a page body. `None` when there is no body block, or the body
    /// block holds neither verses nor paragraphs.
    pub fn detect(doc: &'a Html) -> Option<Self> {
        let block = doc.select(&BODY_BLOCK).next()?;

        let verses: Vec<_> = block.select(&VERSE).collect();
        if !verses.is_empty() {
            return Some(Self::Verses(verses));
        }

        let paragraphs: Vec<_> = block.select(&PARAGRAPH).collect();
        if !paragraphs.is_empty() {
            return Some(Self::Paragraphs(paragraphs));
        }

        None
    }

    /// Run the extraction strategy for this layout.
    pub fn extract(&self, uri: &str) -> Result<ContentBody> {
        match self {
            Self::Verses(elements) => verses::extract(uri, elements).map(ContentBody::Verses),
            Self::Paragraphs(elements) => Ok(ContentBody::Paragraphs(paragraphs::extract(elements))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Verses(_) => "verses",
            Self::Paragraphs(_) => "paragraphs",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verses_win_over_paragraphs() {
        let doc = Html::parse_document(
            r#"<div class="body-block"><p>Heading</p><p class="verse"><span class="verse-number">1</span>Text</p></div>"#,
        );
        let layout = PageLayout::detect(&doc).unwrap();
        assert_eq!(layout.name(), "verses");
    }

    #[test]
    fn paragraphs_without_verses() {
        let doc = Html::parse_document(r#"<div class="body-block"><p>One</p><p>Two</p></div>"#);
        let layout = PageLayout::detect(&doc).unwrap();
        match layout.extract("/x").unwrap() {
            ContentBody::Paragraphs(p) => assert_eq!(p, vec!["One", "Two"]),
            other => panic!("expected paragraphs, got {other:?}"),
        }
    }

    #[test]
    fn no_body_block_is_unclassifiable() {
        let doc = Html::parse_document("<div><p>Loose text</p></div>");
        assert!(PageLayout::detect(&doc).is_none());
    }

    #[test]
    fn empty_body_block_is_unclassifiable() {
        let doc = Html::parse_document(r#"<div class="body-block"><img src="a.jpg"></div>"#);
        assert!(PageLayout::detect(&doc).is_none());
    }
}
