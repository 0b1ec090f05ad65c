//! Navigation tree discovery.
//!
//! A publication's root page embeds its navigation in the page state. Entries
//! are either leaf content links or sections; a section's children are
//! inlined or live on the section's own navigation page, which is fetched in
//! turn. The walk uses an explicit work stack, so nesting depth is bounded by
//! configuration rather than by the call stack.

mod tree;

use tracing::{debug, info, instrument, warn};

use scripturekit_crawler::{HttpSource, RetryPolicy};
use scripturekit_parser::{BookStore, NavEntry, StateError, decode_reader};
use scripturekit_shared::{
    FetchConfig, FetchError, Language, Result, ScripturekitError, StructureNode,
};

use tree::{Arena, ROOT};

/// Default maximum nesting depth of a navigation tree.
pub const DEFAULT_MAX_DEPTH: usize = 16;

// ---------------------------------------------------------------------------
// DiscoveredPublication
// ---------------------------------------------------------------------------

/// A publication's title, root uri and ordered structure tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredPublication {
    pub title: String,
    pub uri: String,
    pub structure: Vec<StructureNode>,
}

// ---------------------------------------------------------------------------
// Discoverer
// ---------------------------------------------------------------------------

/// Builds structure trees from navigation pages.
#[derive(Debug, Clone)]
pub struct Discoverer {
    source: HttpSource,
    policy: RetryPolicy,
    max_depth: usize,
}

/// Pending work: entries to attach under `parent`.
enum Work {
    /// Children already present in a fetched page.
    Inline {
        parent: usize,
        entries: Vec<NavEntry>,
        depth: usize,
    },
    /// Children that live on the navigation page at `uri`.
    Linked {
        parent: usize,
        uri: String,
        depth: usize,
    },
}

impl Discoverer {
    pub fn new(config: &FetchConfig, max_depth: usize) -> Result<Self> {
        Ok(Self::from_parts(
            HttpSource::from_config(config)?,
            RetryPolicy::from(&config.retry),
            max_depth,
        ))
    }

    pub fn from_parts(source: HttpSource, policy: RetryPolicy, max_depth: usize) -> Self {
        Self {
            source,
            policy,
            max_depth,
        }
    }

    /// Discover the structure tree of the publication rooted at `root_uri`.
    ///
    /// Content entries whose uri is in `exclude` are left out. Fails if any
    /// navigation page is unreachable or not in the expected shape, if the
    /// root lists no entries, if a section links back to one of its own
    /// ancestors, or if the tree nests deeper than the configured maximum.
    #[instrument(skip_all, fields(root = %root_uri, lang = %lang))]
    pub async fn discover(
        &self,
        root_uri: &str,
        lang: &Language,
        exclude: &[String],
    ) -> Result<DiscoveredPublication> {
        let root = self.fetch_navigation(root_uri, lang).await?;
        if root.entries.is_empty() {
            return Err(ScripturekitError::discovery(
                root_uri,
                "navigation lists no entries",
            ));
        }

        let title = root.title.trim().to_string();
        let mut arena = Arena::new(&title, root_uri);
        let mut stack = vec![Work::Inline {
            parent: ROOT,
            entries: root.entries,
            depth: 1,
        }];

        while let Some(work) = stack.pop() {
            match work {
                Work::Linked { parent, uri, depth } => {
                    if arena.has_ancestor_uri(parent, &uri) {
                        return Err(ScripturekitError::discovery(
                            &uri,
                            "navigation cycles back to an enclosing page",
                        ));
                    }
                    let page = self.fetch_navigation(&uri, lang).await?;
                    if page.entries.is_empty() {
                        warn!(%uri, "section navigation lists no entries");
                    }
                    stack.push(Work::Inline {
                        parent,
                        entries: page.entries,
                        depth,
                    });
                }
                Work::Inline {
                    parent,
                    entries,
                    depth,
                } => {
                    if depth > self.max_depth {
                        return Err(ScripturekitError::discovery(
                            arena.uri(parent),
                            format!("navigation nests deeper than {} levels", self.max_depth),
                        ));
                    }
                    for (index, entry) in entries.into_iter().enumerate() {
                        if let Some(work) =
                            attach(&mut arena, parent, index + 1, entry, depth, exclude)?
                        {
                            stack.push(work);
                        }
                    }
                }
            }
        }

        let (sections, contents) = arena.counts();
        let structure = arena.into_structure();
        info!(%title, sections, contents, "publication discovered");

        Ok(DiscoveredPublication {
            title,
            uri: root_uri.to_string(),
            structure,
        })
    }

    /// Fetch and decode the navigation page at `uri`. A page served without
    /// embedded state is requested again within the retry budget.
    async fn fetch_navigation(&self, uri: &str, lang: &Language) -> Result<BookStore> {
        debug!(uri, "fetching navigation");
        let reader = self
            .policy
            .run(uri, move || async move {
                let markup = self.source.get(uri, lang).await?;
                match decode_reader(&markup) {
                    Err(StateError::Missing) => Err(FetchError::MissingState {
                        url: uri.to_string(),
                    }),
                    decoded => Ok(decoded),
                }
            })
            .await
            .map_err(|e| ScripturekitError::discovery(uri, e.to_string()))?;

        reader
            .and_then(|reader| reader.book_for(uri))
            .map_err(|e| ScripturekitError::discovery(uri, e.to_string()))
    }
}

/// Attach one entry under `parent`, returning follow-up work for sections.
/// Entries that are neither a content link nor a section with children
/// fail discovery.
fn attach(
    arena: &mut Arena,
    parent: usize,
    index: usize,
    entry: NavEntry,
    depth: usize,
    exclude: &[String],
) -> Result<Option<Work>> {
    if let Some(content) = entry.content {
        if exclude.contains(&content.uri) {
            debug!(uri = %content.uri, "excluded");
        } else {
            arena.add_content(parent, &content.title, &content.uri);
        }
        return Ok(None);
    }

    let Some(section) = entry.section else {
        return Err(ScripturekitError::discovery(
            arena.uri(parent),
            format!("navigation entry {index} is neither section nor content"),
        ));
    };

    if section.uri.as_ref().is_some_and(|uri| exclude.contains(uri)) {
        debug!(uri = ?section.uri, "excluded");
        return Ok(None);
    }

    if section.entries.is_none() && section.uri.is_none() {
        return Err(ScripturekitError::discovery(
            arena.uri(parent),
            format!("section entry {index} has neither entries nor a link"),
        ));
    }

    let uri = section
        .uri
        .unwrap_or_else(|| synthesized_uri(arena.uri(parent), index));
    let id = arena.add_section(parent, &section.title, &uri);

    // Without inline entries the section's uri is its link.
    Ok(Some(match section.entries {
        Some(entries) => Work::Inline {
            parent: id,
            entries,
            depth: depth + 1,
        },
        None => Work::Linked {
            parent: id,
            uri,
            depth: depth + 1,
        },
    }))
}

/// Stable uri for a section the source gives none: the parent's uri with a
/// 1-based index path fragment, e.g. `/x#2` or `/x#2.1`.
fn synthesized_uri(parent: &str, index: usize) -> String {
    if parent.contains('#') {
        format!("{parent}.{index}")
    } else {
        format!("{parent}#{index}")
    }
}
