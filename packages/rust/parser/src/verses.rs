//! Chapter-with-verses extraction.

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use tracing::warn;

use scripturekit_shared::{Result, ScripturekitError, Verse};

use crate::text::inline_text;

static VERSE_NUMBER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.verse-number").expect("valid selector"));
static MARKER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("sup.marker").expect("valid selector"));

/// Extract numbered verses from `p.verse` elements.
///
/// The number span and footnote markers are removed from the verse text.
pub(crate) fn extract(uri: &str, elements: &[ElementRef<'_>]) -> Result<Vec<Verse>> {
    let mut verses = Vec::with_capacity(elements.len());

    for el in elements {
        let number_el = el.select(&VERSE_NUMBER).next().ok_or_else(|| {
            ScripturekitError::parse(uri, format!("verse {} has no number", verses.len() + 1))
        })?;
        let raw = inline_text(number_el, &[]);
        let number: u32 = raw
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ScripturekitError::parse(uri, format!("invalid verse number '{raw}'")))?;

        let text = inline_text(*el, &[&*VERSE_NUMBER, &*MARKER]);
        verses.push(Verse { number, text });
    }

    check_numbering(uri, &verses)?;
    Ok(verses)
}

/// Verse numbers must strictly increase.
///
/// Duplicates and decreases are errors. Gaps, including a first verse other
/// than 1, are logged but accepted.
pub(crate) fn check_numbering(uri: &str, verses: &[Verse]) -> Result<()> {
    let mut previous: Option<u32> = None;

    for verse in verses {
        let expected = previous.map_or(1, |p| p + 1);

        if let Some(prev) = previous {
            if verse.number == prev {
                return Err(ScripturekitError::parse(
                    uri,
                    format!("duplicate verse number {}", verse.number),
                ));
            }
            if verse.number < prev {
                return Err(ScripturekitError::parse(
                    uri,
                    format!("verse {} follows verse {prev}", verse.number),
                ));
            }
        }

        if verse.number != expected {
            warn!(uri, expected, found = verse.number, "gap in verse numbering");
        }
        previous = Some(verse.number);
    }

    Ok(())
}
