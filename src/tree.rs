//! Rooted tree ingestion.
//!
//! The Newick text is parsed with `phylotree` and copied into a small arena:
//! nodes live in a `Vec` in preorder, the root at index 0, and each node keeps
//! its parent as a plain index used only for upward lookups.

use std::collections::HashMap;
use std::path::Path;

use log::debug;
use phylotree::tree::{NodeId as NewickId, Tree as NewickTree};

use crate::error::{MigrationError, Result};

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct Node {
    pub name: Option<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Length of the branch from the parent, 0 when the tree gives none.
    pub length: f64,
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    height: f64,
}

impl Tree {
    /// Parse a Newick string. Internal node names are kept, and named nodes must be unique.
    pub fn from_newick(newick: &str) -> Result<Self> {
        let parsed = NewickTree::from_newick(newick.trim())
            .map_err(|e| MigrationError::Parse(format!("invalid tree: {}", e)))?;
        Self::from_phylotree(&parsed)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let newick = std::fs::read_to_string(path)?;
        Self::from_newick(&newick)
    }

    fn from_phylotree(parsed: &NewickTree) -> Result<Self> {
        let parse_err = |e: &dyn std::fmt::Display| MigrationError::Parse(format!("invalid tree: {}", e));
        let root = parsed.get_root().map_err(|e| parse_err(&e))?;

        let mut nodes: Vec<Node> = Vec::new();
        let mut seen_names: HashMap<String, NodeId> = HashMap::new();
        // (phylotree id, arena parent)
        let mut stack: Vec<(NewickId, Option<NodeId>)> = vec![(root, None)];

        while let Some((nid, parent)) = stack.pop() {
            let source = parsed.get(&nid).map_err(|e| parse_err(&e))?;
            let id = nodes.len();
            let name = source.name.clone().filter(|n| !n.is_empty());
            if let Some(name) = &name {
                if seen_names.insert(name.clone(), id).is_some() {
                    return Err(MigrationError::Parse(format!(
                        "duplicate node name '{}' in tree",
                        name
                    )));
                }
            }
            let length = match parent {
                Some(_) => source.parent_edge.unwrap_or(0.0),
                None => 0.0,
            };
            nodes.push(Node {
                name,
                parent,
                children: Vec::with_capacity(source.children.len()),
                length,
            });
            if let Some(p) = parent {
                nodes[p].children.push(id);
            }
            // reversed so that children come off the stack in their written order
            for child in source.children.iter().rev() {
                stack.push((*child, Some(id)));
            }
        }

        let height = farthest_distance(&nodes);
        debug!("Parsed tree with {} nodes, height {}", nodes.len(), height);
        Ok(Tree { nodes, height })
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes[id].name.as_deref()
    }

    /// Name for messages: the node name, or `#<index>` for unnamed nodes.
    pub fn label(&self, id: NodeId) -> String {
        match self.name(id) {
            Some(name) => name.to_string(),
            None => format!("#{}", id),
        }
    }

    /// Largest root-to-node distance, summing branch lengths.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Every node except the root, in preorder.
    pub fn descendants(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).filter(move |&id| id != self.root())
    }

    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).filter(move |&id| self.nodes[id].children.is_empty())
    }
}

fn farthest_distance(nodes: &[Node]) -> f64 {
    // preorder guarantees a parent's depth is known before its children
    let mut depth = vec![0.0; nodes.len()];
    let mut farthest = 0.0f64;
    for (id, node) in nodes.iter().enumerate() {
        if let Some(p) = node.parent {
            depth[id] = depth[p] + node.length;
            farthest = farthest.max(depth[id]);
        }
    }
    farthest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preorder_layout() {
        let tree = Tree::from_newick("((A:1,B:2)N1:1,C:1.5)R;").unwrap();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.name(tree.root()), Some("R"));
        let names: Vec<String> = tree.descendants().map(|id| tree.label(id)).collect();
        assert_eq!(names, vec!["N1", "A", "B", "C"]);
        let n1 = 1;
        assert_eq!(tree.node(n1).children, vec![2, 3]);
        assert_eq!(tree.parent(2), Some(n1));
        assert_eq!(tree.parent(tree.root()), None);
        assert_eq!(tree.leaves().count(), 3);
    }

    #[test]
    fn test_height_is_farthest_node() {
        let tree = Tree::from_newick("((X:1.0,Y:4.2)N1:1.0,Z:2.0)R;").unwrap();
        assert!((tree.height() - 5.2).abs() < 1e-9);
    }

    #[test]
    fn test_unnamed_nodes_get_index_labels() {
        let tree = Tree::from_newick("((A:1,B:1):1,C:1);").unwrap();
        assert_eq!(tree.name(1), None);
        assert_eq!(tree.label(1), "#1");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Tree::from_newick("((A:1,A:1)N:1,C:1)R;").unwrap_err();
        assert!(matches!(err, MigrationError::Parse(ref m) if m.contains("'A'")));
    }

    #[test]
    fn test_unbalanced_rejected() {
        let err = Tree::from_newick("((A:1,B:1)N:1,C:1;").unwrap_err();
        assert!(matches!(err, MigrationError::Parse(_)));
    }
}
