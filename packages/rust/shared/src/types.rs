//! Output document types.
//!
//! These types define the JSON contract written for every
//! (language, publication) pair. Field absence is meaningful: an omitted
//! field means "not applicable to this record", so optional fields are never
//! serialized as `null` or as empty lists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Structure tree
// ---------------------------------------------------------------------------

/// One node of a publication's table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StructureNode {
    /// A container of further nodes (a book, a group of sections).
    Section {
        title: String,
        uri: String,
        /// Children in reading order.
        entries: Vec<StructureNode>,
    },
    /// A leaf page; its uri is a key of [`Document::contents`].
    Content { title: String, uri: String },
}

impl StructureNode {
    /// Build a leaf node.
    pub fn content(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::Content {
            title: title.into(),
            uri: uri.into(),
        }
    }

    /// Build a section node.
    pub fn section(
        title: impl Into<String>,
        uri: impl Into<String>,
        entries: Vec<StructureNode>,
    ) -> Self {
        Self::Section {
            title: title.into(),
            uri: uri.into(),
            entries,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Section { title, .. } | Self::Content { title, .. } => title,
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            Self::Section { uri, .. } | Self::Content { uri, .. } => uri,
        }
    }

    /// Child nodes; always empty for content nodes.
    pub fn entries(&self) -> &[StructureNode] {
        match self {
            Self::Section { entries, .. } => entries,
            Self::Content { .. } => &[],
        }
    }

    pub fn is_content(&self) -> bool {
        matches!(self, Self::Content { .. })
    }
}

// ---------------------------------------------------------------------------
// Content records
// ---------------------------------------------------------------------------

/// The kind of leaf page, as labelled by the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Book-level introduction page.
    Book,
    /// Chapter or section page.
    Chapter,
    /// Figure, declaration or other standalone page.
    Figure,
}

impl ContentKind {
    /// Map the origin's `data-content-type` attribute value.
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "book" => Some(Self::Book),
            "chapter" => Some(Self::Chapter),
            "figure" => Some(Self::Figure),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Chapter => "chapter",
            Self::Figure => "figure",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numbered verse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub number: u32,
    pub text: String,
}

/// The main text of a page: either plain paragraphs or numbered verses,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentBody {
    #[serde(rename = "text")]
    Paragraphs(Vec<String>),
    #[serde(rename = "verses")]
    Verses(Vec<Verse>),
}

impl ContentBody {
    pub fn verses(&self) -> Option<&[Verse]> {
        match self {
            Self::Verses(v) => Some(v),
            Self::Paragraphs(_) => None,
        }
    }

    pub fn paragraphs(&self) -> Option<&[String]> {
        match self {
            Self::Paragraphs(p) => Some(p),
            Self::Verses(_) => None,
        }
    }
}

/// Parsed representation of one leaf page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub uri: String,
    pub title: String,
    #[serde(rename = "data_type")]
    pub kind: ContentKind,
    /// Label such as "Chapter 1".
    #[serde(
        rename = "chapter_name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub chapter_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_summary: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_intro: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<Vec<String>>,
    #[serde(flatten)]
    pub body: ContentBody,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The assembled output for one (language, publication) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub uri: String,
    pub structure: Vec<StructureNode>,
    /// Keyed by content uri. Sorted so repeated runs serialize identically.
    pub contents: BTreeMap<String, ContentRecord>,
}

impl Document {
    /// Serialize as pretty JSON with four-space indentation.
    ///
    /// Non-ASCII text is written verbatim.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        buf.push(b'\n');
        Ok(buf)
    }
}
