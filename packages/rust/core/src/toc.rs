//! Structure tree helpers.
//!
//! Walks are iterative (a stack of slice iterators) so deep trees never grow
//! the call stack.

use std::collections::HashSet;

use scripturekit_shared::StructureNode;

/// Content uris in reading order, each listed once.
pub fn content_uris(structure: &[StructureNode]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut uris = Vec::new();
    walk(structure, |node| {
        if node.is_content() && seen.insert(node.uri()) {
            uris.push(node.uri().to_string());
        }
    });
    uris
}

/// Number of (section, content) nodes in the tree.
pub fn count_nodes(structure: &[StructureNode]) -> (usize, usize) {
    let mut counts = (0, 0);
    walk(structure, |node| {
        if node.is_content() {
            counts.1 += 1;
        } else {
            counts.0 += 1;
        }
    });
    counts
}

/// Visit every node in pre-order.
fn walk<'a>(structure: &'a [StructureNode], mut visit: impl FnMut(&'a StructureNode)) {
    let mut stack = vec![structure.iter()];
    while let Some(top) = stack.last_mut() {
        match top.next() {
            Some(node) => {
                visit(node);
                if !node.is_content() {
                    stack.push(node.entries().iter());
                }
            }
            None => {
                stack.pop();
            }
        }
    }
}
