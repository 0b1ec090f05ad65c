//! Document assembler.
//!
//! Merges a discovered structure tree with the content records parsed for
//! its leaves. Every content node keeps its place in the tree; only records
//! that exist end up in `contents`. Anything that does not line up is
//! reported as a warning, and too many failed leaves fail the publication.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use tracing::{info, instrument, warn};

use scripturekit_shared::{ContentRecord, Document, Result, ScripturekitError, StructureNode};

use crate::toc;

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Why a uri is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningKind {
    /// The leaf could not be fetched or parsed.
    Failed,
    /// The leaf has neither a record nor a reported failure.
    Missing,
    /// A record whose uri is not a leaf of the structure; dropped.
    Orphan,
}

impl WarningKind {
    /// Whether the warning stands for a leaf absent from `contents`.
    pub fn is_omission(self) -> bool {
        matches!(self, Self::Failed | Self::Missing)
    }
}

/// A uri that did not make it into the document as expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyWarning {
    pub uri: String,
    pub kind: WarningKind,
    pub reason: String,
}

impl fmt::Display for AssemblyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            WarningKind::Failed => "failed",
            WarningKind::Missing => "missing",
            WarningKind::Orphan => "orphan",
        };
        write!(f, "{} ({kind}): {}", self.uri, self.reason)
    }
}

/// An assembled document and what was left out of it.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub document: Document,
    pub warnings: Vec<AssemblyWarning>,
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Build the document for one publication.
///
/// `failures` maps leaf uris to the reason they have no record. Fails when
/// the structure has no leaves, or when the fraction of leaves without a
/// record exceeds `max_failure_ratio`.
#[instrument(skip_all, fields(uri = %root_uri, records = records.len(), failures = failures.len()))]
pub fn assemble(
    title: &str,
    root_uri: &str,
    structure: Vec<StructureNode>,
    mut records: HashMap<String, ContentRecord>,
    failures: &HashMap<String, String>,
    max_failure_ratio: f64,
) -> Result<Assembly> {
    if root_uri.is_empty() {
        return Err(ScripturekitError::assembly("publication has no root uri"));
    }

    let leaves = toc::content_uris(&structure);
    if leaves.is_empty() {
        return Err(ScripturekitError::assembly(format!(
            "{root_uri}: structure has no content"
        )));
    }

    let mut contents = BTreeMap::new();
    let mut warnings = Vec::new();

    for uri in &leaves {
        if let Some(record) = records.remove(uri) {
            contents.insert(uri.clone(), record);
        } else if let Some(reason) = failures.get(uri) {
            warnings.push(AssemblyWarning {
                uri: uri.clone(),
                kind: WarningKind::Failed,
                reason: reason.clone(),
            });
        } else {
            warnings.push(AssemblyWarning {
                uri: uri.clone(),
                kind: WarningKind::Missing,
                reason: "no record was produced".into(),
            });
        }
    }

    let mut orphans: Vec<String> = records.into_keys().collect();
    orphans.sort();
    warnings.extend(orphans.into_iter().map(|uri| AssemblyWarning {
        uri,
        kind: WarningKind::Orphan,
        reason: "not a leaf of the structure".into(),
    }));

    for warning in &warnings {
        warn!(uri = %warning.uri, kind = ?warning.kind, reason = %warning.reason, "assembly warning");
    }

    let omitted = warnings.iter().filter(|w| w.kind.is_omission()).count();
    let ratio = omitted as f64 / leaves.len() as f64;
    if ratio > max_failure_ratio {
        return Err(ScripturekitError::assembly(format!(
            "{root_uri}: {omitted} of {} pages failed ({:.1}%), above the {:.1}% limit",
            leaves.len(),
            ratio * 100.0,
            max_failure_ratio * 100.0
        )));
    }

    info!(
        contents = contents.len(),
        omitted,
        warnings = warnings.len(),
        "document assembled"
    );

    Ok(Assembly {
        document: Document {
            title: title.to_string(),
            uri: root_uri.to_string(),
            structure,
            contents,
        },
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scripturekit_shared::{ContentBody, ContentKind};

    fn record(uri: &str) -> ContentRecord {
        ContentRecord {
            uri: uri.into(),
            title: format!("Title of {uri}"),
            kind: ContentKind::Figure,
            chapter_label: None,
            chapter_summary: None,
            book_title: None,
            book_intro: None,
            subtitle: None,
            body: ContentBody::Paragraphs(vec!["text".into()]),
        }
    }

    fn records(uris: &[&str]) -> HashMap<String, ContentRecord> {
        uris.iter().map(|u| (u.to_string(), record(u))).collect()
    }

    fn structure() -> Vec<StructureNode> {
        vec![
            StructureNode::section(
                "Section",
                "/p/s",
                vec![
                    StructureNode::content("A", "/p/a"),
                    StructureNode::content("B", "/p/b"),
                ],
            ),
            StructureNode::content("C", "/p/c"),
        ]
    }

    #[test]
    fn complete_records_assemble_cleanly() {
        let assembly = assemble(
            "Pub",
            "/p",
            structure(),
            records(&["/p/a", "/p/b", "/p/c"]),
            &HashMap::new(),
            0.1,
        )
        .unwrap();

        assert!(assembly.warnings.is_empty());
        let keys: Vec<&String> = assembly.document.contents.keys().collect();
        assert_eq!(keys, vec!["/p/a", "/p/b", "/p/c"]);
        assert_eq!(assembly.document.structure, structure());
        assert_eq!(assembly.document.title, "Pub");
    }

    #[test]
    fn failed_leaf_keeps_node_and_warns() {
        let failures = HashMap::from([("/p/b".to_string(), "HTTP 404".to_string())]);
        let assembly = assemble(
            "Pub",
            "/p",
            structure(),
            records(&["/p/a", "/p/c"]),
            &failures,
            0.5,
        )
        .unwrap();

        assert!(!assembly.document.contents.contains_key("/p/b"));
        assert_eq!(toc::content_uris(&assembly.document.structure).len(), 3);
        assert_eq!(
            assembly.warnings,
            vec![AssemblyWarning {
                uri: "/p/b".into(),
                kind: WarningKind::Failed,
                reason: "HTTP 404".into(),
            }]
        );
    }

    #[test]
    fn unreported_leaf_is_missing() {
        let assembly = assemble(
            "Pub",
            "/p",
            structure(),
            records(&["/p/a", "/p/b"]),
            &HashMap::new(),
            0.5,
        )
        .unwrap();

        assert_eq!(assembly.warnings.len(), 1);
        assert_eq!(assembly.warnings[0].kind, WarningKind::Missing);
        assert_eq!(assembly.warnings[0].uri, "/p/c");
    }

    #[test]
    fn orphan_records_are_dropped() {
        let assembly = assemble(
            "Pub",
            "/p",
            structure(),
            records(&["/p/a", "/p/b", "/p/c", "/p/s", "/elsewhere"]),
            &HashMap::new(),
            0.0,
        )
        .unwrap();

        assert_eq!(assembly.document.contents.len(), 3);
        let orphans: Vec<&str> = assembly
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::Orphan)
            .map(|w| w.uri.as_str())
            .collect();
        assert_eq!(orphans, vec!["/elsewhere", "/p/s"]);
    }

    #[test]
    fn too_many_failures_fail_assembly() {
        let failures = HashMap::from([
            ("/p/a".to_string(), "timeout".to_string()),
            ("/p/b".to_string(), "timeout".to_string()),
        ]);
        let err = assemble("Pub", "/p", structure(), records(&["/p/c"]), &failures, 0.5)
            .unwrap_err();
        assert!(matches!(err, ScripturekitError::Assembly { .. }));
        assert!(err.to_string().contains("2 of 3 pages failed"));
    }

    #[test]
    fn failure_ratio_at_threshold_passes() {
        let failures = HashMap::from([("/p/a".to_string(), "timeout".to_string())]);
        let structure = vec![
            StructureNode::content("A", "/p/a"),
            StructureNode::content("B", "/p/b"),
        ];
        let assembly =
            assemble("Pub", "/p", structure, records(&["/p/b"]), &failures, 0.5).unwrap();
        assert_eq!(assembly.document.contents.len(), 1);
    }

    #[test]
    fn empty_structure_fails() {
        let err = assemble("Pub", "/p", vec![], HashMap::new(), &HashMap::new(), 0.1).unwrap_err();
        assert!(err.to_string().contains("structure has no content"));

        let sections_only = vec![StructureNode::section("Empty", "/p/e", vec![])];
        assert!(assemble("Pub", "/p", sections_only, HashMap::new(), &HashMap::new(), 0.1).is_err());
    }

    #[test]
    fn missing_root_fails() {
        let err = assemble("Pub", "", structure(), HashMap::new(), &HashMap::new(), 1.0).unwrap_err();
        assert!(err.to_string().contains("no root uri"));
    }
}
