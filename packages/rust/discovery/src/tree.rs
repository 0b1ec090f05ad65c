//! Arena used while the structure tree is being discovered.
//!
//! Children are always created after their parent, so every child id is
//! greater than its parent's. [`Arena::into_structure`] relies on that to
//! build the owned tree bottom-up without recursion.

use scripturekit_shared::StructureNode;

/// Id of the root node. The root is the publication itself and is not part
/// of the finished structure; its children are.
pub(crate) const ROOT: usize = 0;

#[derive(Debug)]
enum Kind {
    Section,
    Content,
}

#[derive(Debug)]
struct Node {
    kind: Kind,
    title: String,
    uri: String,
    parent: usize,
    children: Vec<usize>,
}

#[derive(Debug)]
pub(crate) struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub(crate) fn new(title: &str, uri: &str) -> Self {
        Self {
            nodes: vec![Node {
                kind: Kind::Section,
                title: title.to_string(),
                uri: uri.to_string(),
                parent: ROOT,
                children: Vec::new(),
            }],
        }
    }

    pub(crate) fn uri(&self, id: usize) -> &str {
        &self.nodes[id].uri
    }

    /// Whether a node above `id` (not `id` itself) has uri `uri`.
    pub(crate) fn has_ancestor_uri(&self, id: usize, uri: &str) -> bool {
        let mut current = id;
        while current != ROOT {
            current = self.nodes[current].parent;
            if self.nodes[current].uri == uri {
                return true;
            }
        }
        false
    }

    pub(crate) fn add_section(&mut self, parent: usize, title: &str, uri: &str) -> usize {
        self.add(parent, Kind::Section, title, uri)
    }

    pub(crate) fn add_content(&mut self, parent: usize, title: &str, uri: &str) -> usize {
        self.add(parent, Kind::Content, title, uri)
    }

    fn add(&mut self, parent: usize, kind: Kind, title: &str, uri: &str) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            title: title.trim().to_string(),
            uri: uri.to_string(),
            parent,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// Counts of (sections, contents), root excluded.
    pub(crate) fn counts(&self) -> (usize, usize) {
        self.nodes[ROOT + 1..]
            .iter()
            .fold((0, 0), |(s, c), node| match node.kind {
                Kind::Section => (s + 1, c),
                Kind::Content => (s, c + 1),
            })
    }

    /// The root's children as an owned tree, in source order.
    pub(crate) fn into_structure(self) -> Vec<StructureNode> {
        let mut built: Vec<Option<StructureNode>> = Vec::with_capacity(self.nodes.len());
        built.resize_with(self.nodes.len(), || None);

        let mut root_children = Vec::new();
        for (id, node) in self.nodes.into_iter().enumerate().rev() {
            let entries: Vec<StructureNode> = node
                .children
                .iter()
                .filter_map(|child| built[*child].take())
                .collect();

            if id == ROOT {
                root_children = entries;
                continue;
            }

            built[id] = Some(match node.kind {
                Kind::Section => StructureNode::section(node.title, node.uri, entries),
                Kind::Content => StructureNode::content(node.title, node.uri),
            });
        }

        root_children
    }
}
