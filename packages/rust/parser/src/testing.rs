//! Helpers that render pages the way the origin serves them.
//!
//! Enabled for this crate's tests and, through the `test-support` feature,
//! for the tests of dependent crates.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};

/// Render an HTML page embedding `reader` as its application state.
pub fn state_page(reader: Value) -> String {
    let encoded = STANDARD.encode(json!({ "reader": reader }).to_string());
    format!(
        "<!DOCTYPE html><html><head><title>Gospel Library</title></head><body>\
         <div id=\"app\"></div>\
         <script>window.__INITIAL_STATE__ = \"{encoded}\";</script>\
         </body></html>"
    )
}

/// A navigation page whose active book is `uri`.
pub fn nav_page(title: &str, uri: &str, entries: Value) -> String {
    state_page(json!({
        "activeBook": "active",
        "bookStore": {
            "active": { "title": title, "uri": uri, "entries": entries }
        }
    }))
}

/// A leaf page with the given title, content type and body markup.
pub fn content_page(title: &str, content_type: Option<&str>, body: &str) -> String {
    let attributes = match content_type {
        Some(kind) => json!({ "data-content-type": kind }),
        None => json!({}),
    };
    state_page(json!({
        "activeContent": "active",
        "contentStore": {
            "active": {
                "meta": { "title": title, "pageAttributes": attributes },
                "content": { "body": body }
            }
        }
    }))
}

/// A chapter body with verses numbered from 1.
pub fn verses_body(label: &str, verses: &[&str]) -> String {
    let mut body = format!("<header><p class=\"title-number\">{label}</p></header><div class=\"body-block\">");
    for (i, text) in verses.iter().enumerate() {
        body.push_str(&format!(
            "<p class=\"verse\"><span class=\"verse-number\">{} </span>{text}</p>",
            i + 1
        ));
    }
    body.push_str("</div>");
    body
}

/// A body of plain paragraphs.
pub fn paragraphs_body(paragraphs: &[&str]) -> String {
    let inner: String = paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect();
    format!("<div class=\"body-block\">{inner}</div>")
}

/// Navigation entry for a leaf page.
pub fn content_entry(title: &str, uri: &str) -> Value {
    json!({ "content": { "title": title, "uri": uri } })
}

/// Navigation entry for a section with inlined children.
pub fn section_entry(title: &str, uri: Option<&str>, entries: Value) -> Value {
    match uri {
        Some(uri) => json!({ "section": { "title": title, "uri": uri, "entries": entries } }),
        None => json!({ "section": { "title": title, "entries": entries } }),
    }
}

/// Navigation entry for a section whose children live on its own page.
pub fn linked_section_entry(title: &str, uri: &str) -> Value {
    json!({ "section": { "title": title, "uri": uri } })
}
