use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Diagnostic, ElementId, ElementRef, FeatureDeclaration, Granularity, Severity};

/// Identity of a node in the feature graph.
///
/// Two mappings with the same name but different granularity are different nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub name: String,
    pub granularity: Granularity,
}

impl NodeKey {
    pub fn new(name: impl Into<String>, granularity: Granularity) -> Self {
        Self {
            name: name.into(),
            granularity,
        }
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.name, self.granularity.as_str())
    }
}

/// Position of a node inside the [`FeatureModel`] that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub(crate) usize);

/// A concept, module, component or data node of the recovered feature graph.
///
/// `members` are the source elements mapped to this node; `children` and
/// `parents` are containment edges, both kept in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureNode {
    pub key: NodeKey,
    pub members: Vec<ElementRef>,
    pub children: Vec<NodeIndex>,
    pub parents: Vec<NodeIndex>,
}

/// The canonical feature declared on an element (the first one seen).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeclaredFeature {
    pub element: ElementRef,
    pub declaration: FeatureDeclaration,
}

/// The recovered feature architecture plus every diagnostic raised building it.
///
/// Only the builder mutates a model; callers get a read-only view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureModel {
    nodes: Vec<FeatureNode>,
    index: HashMap<NodeKey, NodeIndex>,
    features: Vec<DeclaredFeature>,
    diagnostics: Vec<Diagnostic>,
}

impl FeatureModel {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================================
    // Builder operations
    // ============================================================

    /// Look up the node for `key`, creating it if this is the first mapping to it.
    pub(crate) fn get_or_insert_node(&mut self, key: NodeKey) -> (NodeIndex, bool) {
        if let Some(&index) = self.index.get(&key) {
            return (index, false);
        }
        let index = NodeIndex(self.nodes.len());
        self.index.insert(key.clone(), index);
        self.nodes.push(FeatureNode {
            key,
            members: Vec::new(),
            children: Vec::new(),
            parents: Vec::new(),
        });
        (index, true)
    }

    pub(crate) fn add_member(&mut self, node: NodeIndex, element: ElementRef) {
        let members = &mut self.nodes[node.0].members;
        if !members.iter().any(|member| member.id == element.id) {
            members.push(element);
        }
    }

    /// Add a containment edge; returns false when it already existed.
    pub(crate) fn add_edge(&mut self, parent: NodeIndex, child: NodeIndex) -> bool {
        if self.nodes[parent.0].children.contains(&child) {
            return false;
        }
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parents.push(parent);
        true
    }

    pub(crate) fn push_feature(&mut self, feature: DeclaredFeature) {
        self.features.push(feature);
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    // ============================================================
    // Queries
    // ============================================================

    /// All nodes in creation order.
    pub fn nodes(&self) -> &[FeatureNode] {
        &self.nodes
    }

    pub fn node(&self, key: &NodeKey) -> Option<&FeatureNode> {
        self.index_of(key).map(|index| self.node_at(index))
    }

    pub fn index_of(&self, key: &NodeKey) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    /// Panics if `index` was produced by a different model.
    pub fn node_at(&self, index: NodeIndex) -> &FeatureNode {
        &self.nodes[index.0]
    }

    pub fn children_of(&self, key: &NodeKey) -> Vec<&FeatureNode> {
        self.node(key)
            .map(|node| node.children.iter().map(|&c| self.node_at(c)).collect())
            .unwrap_or_default()
    }

    pub fn parents_of(&self, key: &NodeKey) -> Vec<&FeatureNode> {
        self.node(key)
            .map(|node| node.parents.iter().map(|&p| self.node_at(p)).collect())
            .unwrap_or_default()
    }

    /// Nodes nothing contains, in creation order.
    pub fn roots(&self) -> Vec<&FeatureNode> {
        self.nodes.iter().filter(|n| n.parents.is_empty()).collect()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.children.len()).sum()
    }

    pub fn features(&self) -> &[DeclaredFeature] {
        &self.features
    }

    pub fn feature_for(&self, element: ElementId) -> Option<&DeclaredFeature> {
        self.features.iter().find(|f| f.element.id == element)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.diagnostics.iter().map(|d| d.severity).max()
    }

    pub fn has_errors(&self) -> bool {
        self.max_severity() == Some(Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nested view of the containment graph for rendering.
    ///
    /// Starts from parentless nodes; nodes reachable only through a cycle are
    /// added as extra roots so nothing is dropped. Each node is expanded once,
    /// where it is first reached. Later occurrences are leaves with `repeated`
    /// set, or `cycle` set when the node is already on the current path.
    pub fn tree(&self) -> Vec<FeatureTreeNode> {
        let mut expanded = vec![false; self.nodes.len()];
        let mut path = Vec::new();
        let mut roots = Vec::new();

        for (i, node) in self.nodes.iter().enumerate() {
            if node.parents.is_empty() {
                roots.push(self.subtree(NodeIndex(i), &mut path, &mut expanded));
            }
        }
        for i in 0..self.nodes.len() {
            if !expanded[i] {
                roots.push(self.subtree(NodeIndex(i), &mut path, &mut expanded));
            }
        }
        roots
    }

    fn subtree(
        &self,
        index: NodeIndex,
        path: &mut Vec<NodeIndex>,
        expanded: &mut [bool],
    ) -> FeatureTreeNode {
        let node = self.node_at(index);
        let cycle = path.contains(&index);
        if cycle || expanded[index.0] {
            return FeatureTreeNode {
                key: node.key.clone(),
                member_count: node.members.len(),
                children: Vec::new(),
                cycle,
                repeated: !cycle,
            };
        }

        expanded[index.0] = true;
        path.push(index);
        let children = node
            .children
            .iter()
            .map(|&child| self.subtree(child, path, expanded))
            .collect();
        path.pop();

        FeatureTreeNode {
            key: node.key.clone(),
            member_count: node.members.len(),
            children,
            cycle: false,
            repeated: false,
        }
    }
}

/// A node with its nested children, used for tree rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureTreeNode {
    pub key: NodeKey,
    pub member_count: usize,
    pub children: Vec<FeatureTreeNode>,
    /// Set on the repeated occurrence of a node that closes a cycle.
    #[serde(default)]
    pub cycle: bool,
    /// Set on a later occurrence of a node already expanded elsewhere.
    #[serde(default)]
    pub repeated: bool,
}
