//! Text extraction and whitespace normalization.
//!
//! Inline formatting (`<em>`, `<a>`, `<span>`, …) is flattened to its text.
//! `<br>` becomes a line break so multi-line blocks can be split into lists.

use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Selector};

/// Collapse runs of whitespace (including non-breaking spaces) into one space.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WS_RE.replace_all(text.trim(), " ").into_owned()
}

/// Raw text of `el`, leaving out any descendant matching one of `skip`.
pub(crate) fn raw_text(el: ElementRef<'_>, skip: &[&Selector]) -> String {
    let mut out = String::new();
    push_text(el, skip, &mut out);
    out
}

fn push_text(el: ElementRef<'_>, skip: &[&Selector], out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if child_el.value().name() == "br" {
                    out.push('\n');
                } else if !skip.iter().any(|sel| sel.matches(&child_el)) {
                    push_text(child_el, skip, out);
                }
            }
            _ => {}
        }
    }
}

/// Single-line text of `el`.
pub(crate) fn inline_text(el: ElementRef<'_>, skip: &[&Selector]) -> String {
    collapse_whitespace(&raw_text(el, skip))
}

/// Non-empty lines of `el`, each whitespace-collapsed.
pub(crate) fn text_lines(el: ElementRef<'_>) -> Vec<String> {
    raw_text(el, &[])
        .split('\n')
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        let sel = Selector::parse(css).unwrap();
        doc.select(&sel).next().unwrap()
    }

    #[test]
    fn collapse_handles_newlines_and_nbsp() {
        assert_eq!(collapse_whitespace("  a\n\t b\u{a0}\u{a0}c  "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn inline_text_strips_formatting() {
        let doc = Html::parse_fragment(r#"<p>Be <b>it</b> known <em>unto</em>   all</p>"#);
        assert_eq!(inline_text(first(&doc, "p"), &[]), "Be it known unto all");
    }

    #[test]
    fn skipped_subtrees_are_left_out() {
        let doc = Html::parse_fragment(
            r#"<p><span class="n">7</span>And <sup class="m">a</sup>it came</p>"#,
        );
        let n = Selector::parse("span.n").unwrap();
        let m = Selector::parse("sup.m").unwrap();
        assert_eq!(inline_text(first(&doc, "p"), &[&n, &m]), "And it came");
    }

    #[test]
    fn lines_split_on_br_and_newlines() {
        let doc = Html::parse_fragment("<p>First line.<br/>Second\n  line.<br><br>\n</p>");
        assert_eq!(text_lines(first(&doc, "p")), vec!["First line.", "Second", "line."]);
    }
}
