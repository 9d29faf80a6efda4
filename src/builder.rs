//! Feature model builder.
//!
//! Turns scanned `(element, metadata)` pairs into a [`FeatureModel`]:
//!
//! 1. Feature declarations: the first one per element is canonical, later
//!    ones raise `DUPLICATE_FEATURE`.
//! 2. Mapping declarations: each resolves to the node keyed by
//!    `(concept name, granularity)`, created on first use. Blank names raise
//!    `EMPTY_NAME` and create nothing.
//! 3. Containment: every mapped element is attached below the mappings of its
//!    nearest mapped ancestor, provided the ancestor's granularity can contain
//!    it. Otherwise `UNRESOLVED_PARENT` is raised and no edge is added.
//! 4. Cycles in the resulting graph raise `CYCLE`; the graph keeps them.
//!
//! Diagnostics never stop the build. Node, member and edge order follows the
//! scan order, so identical input gives an identical model.

use std::collections::HashMap;

use crate::models::*;
use crate::scanner::Scan;
use crate::validation::{self, EdgeOrigins};

/// Build the feature model for a scan.
///
/// The returned diagnostics are the same ones the model carries.
pub fn build(scan: &Scan<'_>) -> (FeatureModel, Vec<Diagnostic>) {
    let mut builder = Builder::default();

    for pair in scan.pairs() {
        match pair.metadata {
            Metadata::Feature(declaration) => builder.declare(pair.element, declaration),
            Metadata::Mapping(declaration) => builder.map(pair.element, declaration),
            Metadata::Other => {}
        }
    }
    builder.infer_containment(scan.tree());

    for cycle in validation::detect_cycles(&builder.model, &builder.origins) {
        builder.report(cycle);
    }

    let model = builder.model;
    tracing::info!(
        "Built feature model: {} nodes, {} edges, {} features, {} diagnostics",
        model.nodes().len(),
        model.edge_count(),
        model.features().len(),
        model.diagnostics().len()
    );

    let diagnostics = model.diagnostics().to_vec();
    (model, diagnostics)
}

#[derive(Default)]
struct Builder {
    model: FeatureModel,
    /// Canonical feature name per element.
    declared: HashMap<ElementId, String>,
    /// Nodes each element maps to, in declaration order.
    mapped: HashMap<ElementId, Vec<NodeIndex>>,
    /// Mapped elements in scan order.
    mapped_order: Vec<ElementId>,
    origins: EdgeOrigins,
}

impl Builder {
    fn report(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{}", diagnostic);
        self.model.push_diagnostic(diagnostic);
    }

    fn declare(&mut self, element: &SourceElement, declaration: &FeatureDeclaration) {
        if is_blank(&declaration.name) {
            self.report(Diagnostic::empty_feature_name(element.to_ref()));
            return;
        }

        if let Some(kept) = self.declared.get(&element.id) {
            let diagnostic =
                Diagnostic::duplicate_feature(element.to_ref(), kept, &declaration.name);
            self.report(diagnostic);
            return;
        }

        tracing::debug!(
            "Feature '{}' declared on {}",
            declaration.name,
            element.qualified_name
        );
        self.declared.insert(element.id, declaration.name.clone());
        self.model.push_feature(DeclaredFeature {
            element: element.to_ref(),
            declaration: declaration.clone(),
        });
    }

    fn map(&mut self, element: &SourceElement, declaration: &MappingDeclaration) {
        if is_blank(&declaration.target_concept) {
            self.report(Diagnostic::empty_mapping_name(element.to_ref()));
            return;
        }

        let key = NodeKey::new(declaration.target_concept.clone(), declaration.granularity);
        let (node, created) = self.model.get_or_insert_node(key);
        if created {
            tracing::debug!("Created node {}", self.model.node_at(node).key);
        }
        self.model.add_member(node, element.to_ref());

        let nodes = self.mapped.entry(element.id).or_insert_with(|| {
            self.mapped_order.push(element.id);
            Vec::new()
        });
        if !nodes.contains(&node) {
            nodes.push(node);
        }
    }

    fn infer_containment(&mut self, tree: &SourceTree) {
        let order = std::mem::take(&mut self.mapped_order);

        for &id in &order {
            let Some(element) = tree.get(id) else {
                continue;
            };
            // Unmapped wrappers are skipped; only the nearest mapped ancestor counts.
            let Some(ancestor) = tree
                .ancestors(id)
                .find(|a| self.mapped.contains_key(&a.id))
            else {
                continue;
            };

            let child_nodes = self.mapped[&id].clone();
            let parent_nodes = self.mapped[&ancestor.id].clone();

            for &child in &child_nodes {
                for &parent in &parent_nodes {
                    self.link(parent, child, ancestor, element);
                }
            }
        }

        self.mapped_order = order;
    }

    fn link(
        &mut self,
        parent: NodeIndex,
        child: NodeIndex,
        ancestor: &SourceElement,
        element: &SourceElement,
    ) {
        // An element nested inside its own node adds nothing.
        if parent == child {
            return;
        }

        let parent_key = self.model.node_at(parent).key.clone();
        let child_key = self.model.node_at(child).key.clone();

        if !parent_key.granularity.can_contain(child_key.granularity) {
            let diagnostic = Diagnostic::unresolved_parent(
                ancestor.to_ref(),
                element.to_ref(),
                &parent_key,
                &child_key,
            );
            self.report(diagnostic);
            return;
        }

        if self.model.add_edge(parent, child) {
            tracing::debug!("Linked {} -> {}", parent_key, child_key);
            self.origins
                .insert((parent, child), (ancestor.to_ref(), element.to_ref()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;

    fn build_specs(specs: Vec<ElementSpec>) -> (FeatureModel, Vec<Diagnostic>) {
        let tree = SourceTree::from_specs(specs);
        let scan = scan(&tree).unwrap();
        build(&scan)
    }

    #[test]
    fn test_empty_scan_builds_empty_model() {
        let (model, diagnostics) = build_specs(vec![]);
        assert!(model.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_same_element_mapped_twice_to_same_node() {
        let (model, diagnostics) = build_specs(vec![ElementSpec::type_("A")
            .mapping(MappingDeclaration::new("Users", Granularity::Module))
            .mapping(MappingDeclaration::new("Users", Granularity::Module))]);

        assert_eq!(model.nodes().len(), 1);
        assert_eq!(model.nodes()[0].members.len(), 1);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_nesting_inside_own_node_adds_no_edge() {
        let (model, diagnostics) = build_specs(vec![ElementSpec::type_("UserRepository")
            .mapping(MappingDeclaration::new("Users", Granularity::Module))
            .child(
                ElementSpec::method("save")
                    .mapping(MappingDeclaration::new("Users", Granularity::Module)),
            )]);

        assert_eq!(model.edge_count(), 0);
        assert_eq!(model.nodes()[0].members.len(), 2);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_element_with_several_mappings_links_each() {
        let (model, diagnostics) = build_specs(vec![ElementSpec::type_("Accounts")
            .mapping(MappingDeclaration::new("Identity", Granularity::Concept))
            .mapping(MappingDeclaration::new("Accounts", Granularity::Module))
            .child(
                ElementSpec::field("store")
                    .mapping(MappingDeclaration::new("Account Store", Granularity::Data)),
            )]);

        let store = NodeKey::new("Account Store", Granularity::Data);
        let parents: Vec<&str> = model
            .parents_of(&store)
            .iter()
            .map(|n| n.key.name.as_str())
            .collect();
        assert_eq!(parents, vec!["Identity", "Accounts"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_blank_feature_name_is_not_canonical() {
        let (model, diagnostics) = build_specs(vec![ElementSpec::type_("A")
            .feature(FeatureDeclaration::new("  ", FeatureType::Functional))
            .feature(FeatureDeclaration::new("Real", FeatureType::Functional))]);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::EmptyName);
        assert_eq!(model.features().len(), 1);
        assert_eq!(model.features()[0].declaration.name, "Real");
    }

    #[test]
    fn test_diagnostics_returned_match_model() {
        let (model, diagnostics) = build_specs(vec![ElementSpec::type_("A")
            .mapping(MappingDeclaration::new("", Granularity::Module))]);
        assert_eq!(model.diagnostics(), diagnostics.as_slice());
        assert!(model.has_errors());
    }
}
