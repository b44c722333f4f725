use std::vec::Vec;

/// Key value representing "no node" inside the hierarchy and its views
pub fn node_none_value() -> u64 {
    u64::MAX
}

/// Returns with false for keys which can not possibly address a node
pub fn node_might_be_valid(key: u64) -> bool {
    key != node_none_value()
}

/// Span of one nodes children inside the flat children array
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ChildrenSpan {
    start: usize,
    count: usize,
}

///####################################################################################
/// Topology
///####################################################################################

/// One directed view over the shared node set. Primary children form a strict
/// tree (one parent per node, ordered siblings), shared children are
/// cross-references which never establish a parent back-link. Node keys are
/// identical across every view built over the same node set, only the edge
/// tables differ.
#[derive(Debug, Default, Clone)]
pub struct Topology {
    children_list: Vec<u64>,        // flat primary children array
    shared_children_list: Vec<u64>, // flat shared children array
    node_children: Vec<ChildrenSpan>,
    node_shared_children: Vec<ChildrenSpan>,
    parent: Vec<u64>,
    child_index: Vec<u64>, // position of each node within its parents children
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resizes every per-node array for the given node count, initializing
    /// parent links and child positions to the none sentinel
    pub fn set_size(&mut self, node_count: usize) {
        self.node_children
            .resize(node_count, ChildrenSpan::default());
        self.node_shared_children
            .resize(node_count, ChildrenSpan::default());
        self.parent.resize(node_count, node_none_value());
        self.child_index.resize(node_count, node_none_value());
    }

    pub fn num_nodes(&self) -> usize {
        self.node_children.len()
    }

    /// Appends the given list as the primary children of the node.
    /// A node can receive its children only once within a view, and no child
    /// may already have a parent within the same view.
    pub fn add_children(&mut self, node: u64, children: &[u64]) {
        debug_assert!((node as usize) < self.num_nodes());
        assert!(
            self.node_children[node as usize].count == 0,
            "Node {} already has primary children in this view!",
            node
        );
        let start = self.children_list.len();
        for (position, child) in children.iter().enumerate() {
            debug_assert!((*child as usize) < self.num_nodes());
            assert!(
                !node_might_be_valid(self.parent[*child as usize]),
                "Node {} already has a primary parent in this view!",
                child
            );
            self.children_list.push(*child);
            self.parent[*child as usize] = node;
            self.child_index[*child as usize] = position as u64;
        }
        self.node_children[node as usize] = ChildrenSpan {
            start,
            count: children.len(),
        };
    }

    /// Appends the given list as the shared children of the node. Unlike
    /// primary children these do not set parent back-links, so one node may be
    /// shared under several parents.
    pub fn add_shared_children(&mut self, node: u64, children: &[u64]) {
        debug_assert!((node as usize) < self.num_nodes());
        assert!(
            self.node_shared_children[node as usize].count == 0,
            "Node {} already has shared children in this view!",
            node
        );
        let start = self.shared_children_list.len();
        for child in children {
            debug_assert!((*child as usize) < self.num_nodes());
            self.shared_children_list.push(*child);
        }
        self.node_shared_children[node as usize] = ChildrenSpan {
            start,
            count: children.len(),
        };
    }

    pub fn parent_of(&self, node: u64) -> u64 {
        self.parent[node as usize]
    }

    /// Position of the node within its primary parents children list
    pub fn child_index_of(&self, node: u64) -> u64 {
        self.child_index[node as usize]
    }

    pub fn num_children(&self, node: u64) -> usize {
        self.node_children[node as usize].count
    }

    pub fn child_at(&self, node: u64, position: usize) -> u64 {
        let span = self.node_children[node as usize];
        debug_assert!(position < span.count);
        self.children_list[span.start + position]
    }

    pub fn children_of(&self, node: u64) -> &[u64] {
        let span = self.node_children[node as usize];
        &self.children_list[span.start..span.start + span.count]
    }

    pub fn num_shared_children(&self, node: u64) -> usize {
        self.node_shared_children[node as usize].count
    }

    pub fn shared_child_at(&self, node: u64, position: usize) -> u64 {
        let span = self.node_shared_children[node as usize];
        debug_assert!(position < span.count);
        self.shared_children_list[span.start + position]
    }

    pub fn shared_children_of(&self, node: u64) -> &[u64] {
        let span = self.node_shared_children[node as usize];
        &self.shared_children_list[span.start..span.start + span.count]
    }

    /// Next node of a pre-order walk: the first child if there is one, else
    /// the next sibling of the closest ancestor which still has one.
    /// Returns with the none sentinel once the walk is exhausted.
    pub fn next_in_preorder(&self, node: u64) -> u64 {
        if 0 < self.num_children(node) {
            return self.child_at(node, 0);
        }
        let mut current = node;
        loop {
            let parent = self.parent_of(current);
            if !node_might_be_valid(parent) {
                return node_none_value();
            }
            let next_sibling = self.child_index_of(current) as usize + 1;
            if next_sibling < self.num_children(parent) {
                return self.child_at(parent, next_sibling);
            }
            current = parent;
        }
    }
}
