//! Embedded application state.
//!
//! Every page of the origin carries its data in a script element:
//!
//! ```text
//! window.__INITIAL_STATE__ = "<base64 of JSON>";
//! ```
//!
//! The JSON's `reader` object holds the navigation (`bookStore`) and page
//! content (`contentStore`) we need. Only the selected entries are decoded
//! into typed structs so that unrelated stores with other shapes never fail
//! the whole page.

use std::collections::HashMap;
use std::sync::LazyLock;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Matches the state assignment and captures the base64 payload.
static STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"window\.__INITIAL_STATE__\s*=\s*"([A-Za-z0-9+/=]*)"\s*;"#).expect("state regex")
});

/// Standard alphabet, padding optional.
const STATE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Why a page's embedded state could not be used.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The page carries no state script at all.
    #[error("page has no embedded state")]
    Missing,

    /// The state is present but not in the expected shape.
    #[error("malformed embedded state: {0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Reader state
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct InitialState {
    reader: ReaderState,
}

/// The `reader` part of a page's state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderState {
    #[serde(default)]
    pub active_book: Option<String>,
    #[serde(default)]
    book_store: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub active_content: Option<String>,
    #[serde(default)]
    content_store: HashMap<String, serde_json::Value>,
}

impl ReaderState {
    /// The navigation of the page's active book.
    pub fn active_book(&self) -> Result<BookStore, StateError> {
        let key = self
            .active_book
            .as_deref()
            .ok_or_else(|| StateError::Malformed("no activeBook".into()))?;
        decode_entry(&self.book_store, key, "bookStore")
    }

    /// The navigation whose uri is `uri`, falling back to the active book.
    pub fn book_for(&self, uri: &str) -> Result<BookStore, StateError> {
        let by_uri = self
            .book_store
            .values()
            .find(|v| v.get("uri").and_then(serde_json::Value::as_str) == Some(uri));

        match by_uri {
            Some(value) => BookStore::deserialize(value)
                .map_err(|e| StateError::Malformed(format!("bookStore entry for {uri}: {e}"))),
            None => self.active_book(),
        }
    }

    /// The page's active content.
    pub fn active_content(&self) -> Result<ContentStore, StateError> {
        let key = self
            .active_content
            .as_deref()
            .ok_or_else(|| StateError::Malformed("no activeContent".into()))?;
        decode_entry(&self.content_store, key, "contentStore")
    }
}

fn decode_entry<T: DeserializeOwned>(
    store: &HashMap<String, serde_json::Value>,
    key: &str,
    store_name: &str,
) -> Result<T, StateError> {
    let value = store
        .get(key)
        .ok_or_else(|| StateError::Malformed(format!("{store_name} has no entry '{key}'")))?;
    T::deserialize(value).map_err(|e| StateError::Malformed(format!("{store_name}['{key}']: {e}")))
}

/// A navigation page: the publication or one of its containers.
#[derive(Debug, Clone, Deserialize)]
pub struct BookStore {
    #[serde(default)]
    pub title: String,
    pub uri: String,
    #[serde(default)]
    pub entries: Vec<NavEntry>,
}

/// One navigation entry. Exactly one of the fields is expected to be set.
#[derive(Debug, Clone, Deserialize)]
pub struct NavEntry {
    #[serde(default)]
    pub section: Option<NavSection>,
    #[serde(default)]
    pub content: Option<NavContent>,
}

/// A container entry. Its children are either inlined or behind `uri`.
#[derive(Debug, Clone, Deserialize)]
pub struct NavSection {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub entries: Option<Vec<NavEntry>>,
}

/// A leaf entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NavContent {
    #[serde(default)]
    pub title: String,
    pub uri: String,
}

/// A leaf page's content.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentStore {
    pub meta: ContentMeta,
    pub content: ContentPayload,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMeta {
    pub title: String,
    #[serde(default)]
    pub page_attributes: HashMap<String, serde_json::Value>,
}

impl ContentMeta {
    /// The page's `data-content-type` attribute.
    pub fn content_type(&self) -> Option<&str> {
        self.page_attributes
            .get("data-content-type")
            .and_then(serde_json::Value::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentPayload {
    /// Markup of the page body.
    pub body: String,
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Extract and decode the reader state embedded in a page.
pub fn decode_reader(markup: &str) -> Result<ReaderState, StateError> {
    let caps = STATE_RE.captures(markup).ok_or(StateError::Missing)?;
    let payload = STATE_ENGINE
        .decode(&caps[1])
        .map_err(|e| StateError::Malformed(format!("invalid base64: {e}")))?;
    let state: InitialState = serde_json::from_slice(&payload)
        .map_err(|e| StateError::Malformed(format!("invalid JSON: {e}")))?;
    Ok(state.reader)
}
