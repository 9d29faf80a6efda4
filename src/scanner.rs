//! Element scanner: flattens a source tree into `(element, metadata)` pairs.
//!
//! Pairs come out in a fixed order: roots in the order the tree lists them,
//! each element before its children, children in declaration order, and an
//! element's metadata in the order it was attached. The builder relies on
//! this order for reproducible models.

use serde::Serialize;

use crate::error::ScanError;
use crate::models::{ElementId, ElementRef, Metadata, SourceElement, SourceTree};

/// One metadata instance together with the element carrying it.
#[derive(Debug, Clone, Copy)]
pub struct ScanPair<'a> {
    pub element: &'a SourceElement,
    pub metadata: &'a Metadata,
}

/// The validated result of scanning a tree.
///
/// Only [`scan`] and [`scan_roots`] create one, so holding a `Scan` means the
/// tree's containment and parent references are consistent.
#[derive(Debug, Clone)]
pub struct Scan<'a> {
    tree: &'a SourceTree,
    pairs: Vec<ScanPair<'a>>,
    visited: usize,
}

impl<'a> Scan<'a> {
    pub fn tree(&self) -> &'a SourceTree {
        self.tree
    }

    pub fn pairs(&self) -> &[ScanPair<'a>] {
        &self.pairs
    }

    /// Number of elements visited, annotated or not.
    pub fn element_count(&self) -> usize {
        self.visited
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Owned form of the pairs, for the analyze-only dump.
    pub fn records(&self) -> Vec<ScanRecord> {
        self.pairs
            .iter()
            .map(|pair| ScanRecord {
                element: pair.element.to_ref(),
                parent: pair.element.parent,
                metadata: pair.metadata.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanRecord {
    pub element: ElementRef,
    pub parent: Option<ElementId>,
    pub metadata: Metadata,
}

/// Scan every root of `tree`.
pub fn scan(tree: &SourceTree) -> Result<Scan<'_>, ScanError> {
    scan_roots(tree, tree.roots())
}

/// Scan only the given roots, in the given order.
pub fn scan_roots<'a>(tree: &'a SourceTree, roots: &[ElementId]) -> Result<Scan<'a>, ScanError> {
    let mut walk = Walk {
        tree,
        visited: vec![false; tree.len()],
        on_path: vec![false; tree.len()],
        pairs: Vec::new(),
        count: 0,
    };

    for &root in roots {
        let element = tree.get(root).ok_or(ScanError::UnknownRoot(root))?;
        if element.parent.is_some() {
            return Err(ScanError::ParentMismatch {
                element: root,
                expected: None,
                found: element.parent,
            });
        }
        if walk.visited[root.0] {
            return Err(ScanError::SharedChild { element: root });
        }
        walk.visit(element)?;
    }

    tracing::debug!(
        "Scanned {} elements, {} metadata instances",
        walk.count,
        walk.pairs.len()
    );

    Ok(Scan {
        tree,
        pairs: walk.pairs,
        visited: walk.count,
    })
}

struct Walk<'a> {
    tree: &'a SourceTree,
    visited: Vec<bool>,
    on_path: Vec<bool>,
    pairs: Vec<ScanPair<'a>>,
    count: usize,
}

impl<'a> Walk<'a> {
    fn visit(&mut self, element: &'a SourceElement) -> Result<(), ScanError> {
        let id = element.id;
        self.visited[id.0] = true;
        self.on_path[id.0] = true;
        self.count += 1;

        for metadata in element.metadata.iter().filter(|m| m.is_declaration()) {
            self.pairs.push(ScanPair { element, metadata });
        }

        for &child_id in &element.children {
            let child = self.tree.get(child_id).ok_or(ScanError::UnknownElement {
                parent: id,
                child: child_id,
            })?;

            if self.on_path[child_id.0] {
                return Err(ScanError::ContainmentCycle { element: child_id });
            }
            if self.visited[child_id.0] {
                return Err(ScanError::SharedChild { element: child_id });
            }
            if child.parent != Some(id) {
                return Err(ScanError::ParentMismatch {
                    element: child_id,
                    expected: Some(id),
                    found: child.parent,
                });
            }
            self.visit(child)?;
        }

        self.on_path[id.0] = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;

    fn raw(id: usize, parent: Option<usize>, children: &[usize]) -> SourceElement {
        SourceElement {
            id: ElementId(id),
            kind: ElementKind::Type,
            name: format!("E{}", id),
            qualified_name: format!("E{}", id),
            parent: parent.map(ElementId),
            children: children.iter().copied().map(ElementId).collect(),
            metadata: vec![Metadata::Mapping(MappingDeclaration::new(
                format!("N{}", id),
                Granularity::Module,
            ))],
            location: None,
        }
    }

    #[test]
    fn test_parent_before_children_in_declaration_order() {
        let tree = SourceTree::from_specs(vec![
            ElementSpec::type_("A")
                .feature(FeatureDeclaration::new("a", FeatureType::Functional))
                .mapping(MappingDeclaration::new("Concept A", Granularity::Concept))
                .child(
                    ElementSpec::field("f")
                        .mapping(MappingDeclaration::new("F", Granularity::Data)),
                )
                .child(
                    ElementSpec::method("m")
                        .mapping(MappingDeclaration::new("M", Granularity::Component)),
                ),
            ElementSpec::type_("B").mapping(MappingDeclaration::new("B", Granularity::Module)),
        ]);

        let scan = scan(&tree).unwrap();
        let order: Vec<(&str, bool)> = scan
            .pairs()
            .iter()
            .map(|p| (p.element.name.as_str(), matches!(p.metadata, Metadata::Feature(_))))
            .collect();

        assert_eq!(
            order,
            vec![("A", true), ("A", false), ("f", false), ("m", false), ("B", false)]
        );
        assert_eq!(scan.element_count(), 4);
    }

    #[test]
    fn test_unannotated_elements_produce_no_pairs() {
        let tree = SourceTree::from_specs(vec![ElementSpec::type_("Plain")
            .child(ElementSpec::field("x"))
            .child(ElementSpec::constructor("Plain"))]);
        let scan = scan(&tree).unwrap();
        assert!(scan.is_empty());
        assert_eq!(scan.element_count(), 3);
    }

    #[test]
    fn test_scan_does_not_mutate_tree() {
        let tree = SourceTree::from_specs(vec![ElementSpec::type_("A")
            .mapping(MappingDeclaration::new("A", Granularity::Module))
            .child(ElementSpec::field("b"))]);
        let before = tree.clone();
        let _ = scan(&tree).unwrap();
        assert_eq!(tree, before);
    }

    #[test]
    fn test_other_annotations_are_skipped() {
        let tree = SourceTree::from_parts(
            vec![SourceElement {
                metadata: vec![
                    Metadata::Other,
                    Metadata::Mapping(MappingDeclaration::new("Users", Granularity::Module)),
                ],
                ..raw(0, None, &[])
            }],
            vec![ElementId(0)],
        );
        let scan = scan(&tree).unwrap();
        assert_eq!(scan.pairs().len(), 1);
        assert!(matches!(scan.pairs()[0].metadata, Metadata::Mapping(_)));
        assert_eq!(scan.element_count(), 1);
    }

    #[test]
    fn test_containment_cycle_is_rejected() {
        let tree = SourceTree::from_parts(
            vec![raw(0, None, &[1]), raw(1, Some(0), &[2]), raw(2, Some(1), &[0])],
            vec![ElementId(0)],
        );
        assert_eq!(
            scan(&tree).unwrap_err(),
            ScanError::ContainmentCycle { element: ElementId(0) }
        );
    }

    #[test]
    fn test_shared_child_is_rejected() {
        let tree = SourceTree::from_parts(
            vec![raw(0, None, &[1, 2]), raw(1, Some(0), &[2]), raw(2, Some(1), &[])],
            vec![ElementId(0)],
        );
        assert_eq!(
            scan(&tree).unwrap_err(),
            ScanError::SharedChild { element: ElementId(2) }
        );
    }

    #[test]
    fn test_unknown_child_is_rejected() {
        let tree = SourceTree::from_parts(vec![raw(0, None, &[5])], vec![ElementId(0)]);
        assert_eq!(
            scan(&tree).unwrap_err(),
            ScanError::UnknownElement { parent: ElementId(0), child: ElementId(5) }
        );
    }

    #[test]
    fn test_parent_back_reference_must_match() {
        let tree = SourceTree::from_parts(
            vec![raw(0, None, &[1]), raw(1, None, &[])],
            vec![ElementId(0)],
        );
        assert_eq!(
            scan(&tree).unwrap_err(),
            ScanError::ParentMismatch {
                element: ElementId(1),
                expected: Some(ElementId(0)),
                found: None,
            }
        );
    }

    #[test]
    fn test_unknown_root_is_rejected() {
        let tree = SourceTree::from_parts(vec![raw(0, None, &[])], vec![ElementId(3)]);
        assert_eq!(scan(&tree).unwrap_err(), ScanError::UnknownRoot(ElementId(3)));
    }

    #[test]
    fn test_scan_roots_uses_given_order() {
        let tree = SourceTree::from_specs(vec![
            ElementSpec::type_("A").mapping(MappingDeclaration::new("A", Granularity::Module)),
            ElementSpec::type_("B").mapping(MappingDeclaration::new("B", Granularity::Module)),
        ]);
        let scan = scan_roots(&tree, &[ElementId(1), ElementId(0)]).unwrap();
        let names: Vec<&str> = scan.pairs().iter().map(|p| p.element.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}
