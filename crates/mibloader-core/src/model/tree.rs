//! Shared OID tree.
//!
//! The tree is an arena owned by one loader's cache. Nodes are addressed by
//! [`NodeId`] and never move; symbols hold only handles. Modules loaded later
//! extend nodes created by earlier ones, so each node records every symbol
//! that claimed it: the first is the owner, the rest survive the eviction of
//! whichever module created the node.

use super::ids::{ModuleId, NodeId, SymbolId};
use super::oid::Oid;
use alloc::string::String;
use alloc::vec::Vec;

/// Names of the fixed roots, indexed by arc.
pub const ROOT_NAMES: [&str; 3] = ["ccitt", "iso", "joint-iso-ccitt"];

/// A symbol attached to a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeClaim {
    /// The claiming symbol.
    pub symbol: SymbolId,
    /// Its name, kept so the node stays labelled after lookups fail.
    pub name: String,
}

/// A node in the OID tree.
#[derive(Clone, Debug)]
pub struct OidNode {
    /// The arc (subidentifier) at this position.
    pub arc: u32,
    /// Parent node; `None` only for the fixed roots.
    pub parent: Option<NodeId>,
    /// Child nodes, ordered by arc.
    pub children: Vec<NodeId>,
    /// Label from a `name(number)` component, for nodes no symbol claims.
    pub label: Option<String>,
    /// Claiming symbols; the first is the owner.
    pub claims: Vec<NodeClaim>,
}

impl OidNode {
    fn new(arc: u32, parent: Option<NodeId>, label: Option<String>) -> Self {
        Self {
            arc,
            parent,
            children: Vec::new(),
            label,
            claims: Vec::new(),
        }
    }

    /// The owning symbol.
    #[must_use]
    pub fn symbol(&self) -> Option<SymbolId> {
        self.claims.first().map(|c| c.symbol)
    }

    /// Display name: the owner's name, else the component label.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.claims
            .first()
            .map(|c| c.name.as_str())
            .or(self.label.as_deref())
    }

    /// Check if this is a leaf node.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Outcome of [`OidTree::attach`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attach {
    /// The symbol became the node's owner.
    Owner,
    /// The node already had an owner; the symbol was recorded after it.
    Alias {
        /// The existing owner.
        owner: SymbolId,
    },
    /// The symbol was already attached to this node.
    Unchanged,
}

/// Whether a symbol claiming an already-owned OID deserves a warning.
///
/// Collisions are only reported when the two symbols come from different
/// modules and at least one of those modules was explicitly loaded.
/// Collisions among transitively imported modules are expected.
#[must_use]
pub fn should_warn_duplicate(
    existing_module: ModuleId,
    existing_loaded: bool,
    incoming_module: ModuleId,
    incoming_loaded: bool,
) -> bool {
    existing_module != incoming_module && (existing_loaded || incoming_loaded)
}

/// Arena of OID nodes with three fixed roots at arcs 0, 1 and 2.
///
/// The roots occupy the first three slots of the arena.
#[derive(Clone, Debug)]
pub struct OidTree {
    nodes: Vec<Option<OidNode>>,
}

impl Default for OidTree {
    fn default() -> Self {
        Self::new()
    }
}

impl OidTree {
    /// Create a tree holding only the fixed roots, each owned by the
    /// default-context symbol with the same index.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        for (arc, name) in (0u32..).zip(ROOT_NAMES) {
            let mut node = OidNode::new(arc, None, None);
            node.claims.push(NodeClaim {
                symbol: SymbolId::root(arc),
                name: name.into(),
            });
            nodes.push(Some(node));
        }
        Self { nodes }
    }

    /// Root node for `arc`, if it is 0, 1 or 2.
    #[must_use]
    pub fn root(&self, arc: u32) -> Option<NodeId> {
        if (arc as usize) < ROOT_NAMES.len() {
            NodeId::from_slot(arc as usize)
        } else {
            None
        }
    }

    /// The three fixed roots in arc order.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0u32..).take(ROOT_NAMES.len()).filter_map(|arc| self.root(arc))
    }

    /// Get a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&OidNode> {
        self.nodes.get(id.slot()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut OidNode> {
        self.nodes.get_mut(id.slot()).and_then(Option::as_mut)
    }

    /// Number of live nodes, roots included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Whether the tree holds nothing but the roots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == ROOT_NAMES.len()
    }

    /// Child of `parent` at `arc`.
    #[must_use]
    pub fn child(&self, parent: NodeId, arc: u32) -> Option<NodeId> {
        let node = self.node(parent)?;
        node.children
            .binary_search_by_key(&arc, |&c| self.node(c).map_or(u32::MAX, |n| n.arc))
            .ok()
            .map(|idx| node.children[idx])
    }

    /// Child of `parent` at `arc`, created if missing.
    ///
    /// `label` names a created node, or an existing one that has no label.
    pub fn insert_child(&mut self, parent: NodeId, arc: u32, label: Option<&str>) -> NodeId {
        if let Some(existing) = self.child(parent, arc) {
            if let Some(node) = self.node_mut(existing) {
                if node.label.is_none() {
                    node.label = label.map(String::from);
                }
            }
            return existing;
        }

        let Some(id) = NodeId::from_slot(self.nodes.len()) else {
            // Arena exhausted; reuse the parent rather than panic.
            return parent;
        };
        self.nodes
            .push(Some(OidNode::new(arc, Some(parent), label.map(String::from))));

        let arcs: Vec<u32> = self
            .children(parent)
            .iter()
            .map(|&c| self.node(c).map_or(u32::MAX, |n| n.arc))
            .collect();
        let position = arcs.partition_point(|&a| a < arc);
        if let Some(node) = self.node_mut(parent) {
            node.children.insert(position, id);
        }
        id
    }

    /// Record `symbol` as a claimant of `node`.
    pub fn attach(&mut self, node: NodeId, symbol: SymbolId, name: &str) -> Attach {
        let Some(entry) = self.node_mut(node) else {
            return Attach::Unchanged;
        };
        if entry.claims.iter().any(|c| c.symbol == symbol) {
            return Attach::Unchanged;
        }
        let owner = entry.symbol();
        entry.claims.push(NodeClaim {
            symbol,
            name: name.into(),
        });
        match owner {
            Some(owner) => Attach::Alias { owner },
            None => Attach::Owner,
        }
    }

    /// Numeric path from the root to `node`.
    #[must_use]
    pub fn path(&self, node: NodeId) -> Oid {
        let mut arcs = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(n) = self.node(id) else { break };
            arcs.push(n.arc);
            current = n.parent;
        }
        arcs.reverse();
        Oid::new(arcs)
    }

    /// Node at exactly `path`.
    #[must_use]
    pub fn find_exact(&self, path: &[u32]) -> Option<NodeId> {
        let (&first, rest) = path.split_first()?;
        let mut current = self.root(first)?;
        for &arc in rest {
            current = self.child(current, arc)?;
        }
        Some(current)
    }

    /// Deepest node whose path is a prefix of `path`.
    ///
    /// Maps an instance OID (column plus row index) back to its column.
    #[must_use]
    pub fn find_longest_prefix(&self, path: &[u32]) -> Option<NodeId> {
        let (&first, rest) = path.split_first()?;
        let mut current = self.root(first)?;
        for &arc in rest {
            match self.child(current, arc) {
                Some(next) => current = next,
                None => break,
            }
        }
        Some(current)
    }

    /// Parent of `node`.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    /// Children of `node`, ordered by arc.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map_or(&[], |n| n.children.as_slice())
    }

    /// Owning symbol of `node`.
    #[must_use]
    pub fn symbol(&self, node: NodeId) -> Option<SymbolId> {
        self.node(node)?.symbol()
    }

    /// Remove every claim made by `module` and prune the nodes left without
    /// claims or children. Roots are never removed.
    pub fn detach_module(&mut self, module: ModuleId) {
        for node in self.nodes.iter_mut().flatten() {
            node.claims.retain(|c| c.symbol.module != Some(module));
        }

        // Children are always created after their parent, so a reverse scan
        // sees every subtree before its root.
        for index in (ROOT_NAMES.len()..self.nodes.len()).rev() {
            let prune = matches!(
                &self.nodes[index],
                Some(node) if node.claims.is_empty() && node.children.is_empty()
            );
            if !prune {
                continue;
            }
            let Some(node) = self.nodes[index].take() else {
                continue;
            };
            let Some(id) = NodeId::from_slot(index) else {
                continue;
            };
            if let Some(parent) = node.parent.and_then(|p| self.node_mut(p)) {
                parent.children.retain(|&c| c != id);
            }
        }
    }

    /// Visit `start` and its descendants depth-first in arc order.
    pub fn walk<F: FnMut(NodeId, &OidNode)>(&self, start: NodeId, visitor: &mut F) {
        let Some(node) = self.node(start) else {
            return;
        };
        visitor(start, node);
        for &child in &node.children {
            self.walk(child, visitor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(index: usize) -> ModuleId {
        ModuleId::from_slot(index).unwrap()
    }

    fn build(tree: &mut OidTree, path: &[u32]) -> NodeId {
        let mut current = tree.root(path[0]).unwrap();
        for &arc in &path[1..] {
            current = tree.insert_child(current, arc, None);
        }
        current
    }

    #[test]
    fn test_fixed_roots() {
        let tree = OidTree::new();
        assert_eq!(tree.len(), 3);
        assert!(tree.is_empty());
        for arc in 0..3 {
            let root = tree.root(arc).unwrap();
            assert_eq!(tree.path(root).arcs(), &[arc]);
            assert_eq!(tree.symbol(root), Some(SymbolId::root(arc)));
            assert!(tree.parent(root).is_none());
        }
        assert_eq!(tree.node(tree.root(1).unwrap()).unwrap().name(), Some("iso"));
        assert!(tree.root(3).is_none());
    }

    #[test]
    fn test_insert_child_is_idempotent() {
        let mut tree = OidTree::new();
        let iso = tree.root(1).unwrap();
        let org = tree.insert_child(iso, 3, Some("org"));
        assert_eq!(tree.insert_child(iso, 3, None), org);
        assert_eq!(tree.node(org).unwrap().name(), Some("org"));
        assert_eq!(tree.children(iso), &[org]);
    }

    #[test]
    fn test_children_sorted() {
        let mut tree = OidTree::new();
        let iso = tree.root(1).unwrap();
        for arc in [9, 2, 5, 1] {
            tree.insert_child(iso, arc, None);
        }
        let arcs: Vec<u32> = tree
            .children(iso)
            .iter()
            .map(|&c| tree.node(c).unwrap().arc)
            .collect();
        assert_eq!(arcs, vec![1, 2, 5, 9]);
    }

    #[test]
    fn test_find_exact() {
        let mut tree = OidTree::new();
        let node = build(&mut tree, &[1, 3, 6, 1]);
        assert_eq!(tree.find_exact(&[1, 3, 6, 1]), Some(node));
        assert_eq!(tree.find_exact(&[1, 3, 6, 1, 2]), None);
        assert_eq!(tree.find_exact(&[]), None);
        assert_eq!(tree.path(node).to_dotted(), "1.3.6.1");
    }

    #[test]
    fn test_find_longest_prefix() {
        let mut tree = OidTree::new();
        let internet = build(&mut tree, &[1, 3, 6, 1]);
        let enterprises = build(&mut tree, &[1, 3, 6, 1, 4, 1]);

        assert_eq!(tree.find_longest_prefix(&[1, 3, 6, 1, 4, 1, 999]), Some(enterprises));
        assert_eq!(tree.find_longest_prefix(&[1, 3, 6, 1, 2]), Some(internet));
        assert_eq!(tree.find_longest_prefix(&[9, 9, 9]), None);
        assert_eq!(tree.find_longest_prefix(&[]), None);
    }

    #[test]
    fn test_attach_owner_and_alias() {
        let mut tree = OidTree::new();
        let node = build(&mut tree, &[1, 3]);
        let a = SymbolId::new(module(0), 0);
        let b = SymbolId::new(module(1), 4);

        assert_eq!(tree.attach(node, a, "a"), Attach::Owner);
        assert_eq!(tree.attach(node, a, "a"), Attach::Unchanged);
        assert_eq!(tree.attach(node, b, "b"), Attach::Alias { owner: a });
        assert_eq!(tree.symbol(node), Some(a));
        assert_eq!(tree.node(node).unwrap().name(), Some("a"));
    }

    #[test]
    fn test_detach_module_prunes_and_promotes() {
        let mut tree = OidTree::new();
        let shared = build(&mut tree, &[1, 3]);
        let private = build(&mut tree, &[1, 3, 6, 7]);
        let first = SymbolId::new(module(0), 0);
        let second = SymbolId::new(module(1), 0);
        tree.attach(shared, first, "first");
        tree.attach(shared, second, "second");
        tree.attach(private, SymbolId::new(module(0), 1), "private");

        tree.detach_module(module(0));

        assert_eq!(tree.symbol(shared), Some(second));
        assert_eq!(tree.find_exact(&[1, 3, 6, 7]), None);
        assert_eq!(tree.find_exact(&[1, 3, 6]), None);
        assert!(tree.children(shared).is_empty());
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_detach_keeps_roots() {
        let mut tree = OidTree::new();
        let iso = tree.root(1).unwrap();
        tree.attach(iso, SymbolId::new(module(0), 0), "iso");
        tree.detach_module(module(0));
        assert_eq!(tree.root(1), Some(iso));
        assert_eq!(tree.symbol(iso), Some(SymbolId::root(1)));
    }

    #[test]
    fn test_duplicate_predicate() {
        let (m1, m2) = (module(0), module(1));
        assert!(should_warn_duplicate(m1, true, m2, true));
        assert!(should_warn_duplicate(m1, false, m2, true));
        assert!(should_warn_duplicate(m1, true, m2, false));
        assert!(!should_warn_duplicate(m1, false, m2, false));
        assert!(!should_warn_duplicate(m1, true, m1, true));
    }

    #[test]
    fn test_walk_order() {
        let mut tree = OidTree::new();
        build(&mut tree, &[1, 3, 6]);
        build(&mut tree, &[1, 2]);
        let mut seen = Vec::new();
        tree.walk(tree.root(1).unwrap(), &mut |id, _| seen.push(tree.path(id).to_dotted()));
        assert_eq!(seen, vec!["1", "1.2", "1.3", "1.3.6"]);
    }
}
