//! Model-wide checks and severity policy.

use std::collections::HashMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::models::{Diagnostic, ElementRef, FeatureModel, NodeIndex, Severity};

/// For each containment edge, the (ancestor, element) pair that introduced it.
pub type EdgeOrigins = HashMap<(NodeIndex, NodeIndex), (ElementRef, ElementRef)>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Report every containment cycle once, as a `CYCLE` diagnostic naming the full path.
///
/// Depth-first over nodes and children in insertion order, so the output is
/// deterministic. Each back edge closes exactly one reported cycle.
pub fn detect_cycles(model: &FeatureModel, origins: &EdgeOrigins) -> Vec<Diagnostic> {
    let mut search = CycleSearch {
        model,
        origins,
        marks: vec![Mark::Unvisited; model.nodes().len()],
        stack: Vec::new(),
        found: Vec::new(),
    };

    for i in 0..model.nodes().len() {
        if search.marks[i] == Mark::Unvisited {
            search.visit(NodeIndex(i));
        }
    }
    search.found
}

struct CycleSearch<'a> {
    model: &'a FeatureModel,
    origins: &'a EdgeOrigins,
    marks: Vec<Mark>,
    stack: Vec<NodeIndex>,
    found: Vec<Diagnostic>,
}

impl CycleSearch<'_> {
    fn visit(&mut self, node: NodeIndex) {
        let model = self.model;
        self.marks[node.0] = Mark::OnStack;
        self.stack.push(node);

        for &child in &model.node_at(node).children {
            match self.marks[child.0] {
                Mark::Unvisited => self.visit(child),
                Mark::OnStack => self.report(child),
                Mark::Done => {}
            }
        }

        self.stack.pop();
        self.marks[node.0] = Mark::Done;
    }

    /// `start` is on the stack; the cycle runs from it to the top and back.
    fn report(&mut self, start: NodeIndex) {
        let Some(from) = self.stack.iter().position(|&n| n == start) else {
            return;
        };
        let mut path: Vec<NodeIndex> = self.stack[from..].to_vec();
        path.push(start);

        let mut elements: Vec<ElementRef> = Vec::new();
        for edge in path.windows(2) {
            if let Some((parent, child)) = self.origins.get(&(edge[0], edge[1])) {
                for element in [parent, child] {
                    if !elements.iter().any(|e| e.id == element.id) {
                        elements.push(element.clone());
                    }
                }
            }
        }

        let model = self.model;
        let keys: Vec<_> = path.iter().map(|&n| &model.node_at(n).key).collect();
        self.found.push(Diagnostic::cycle(&keys, elements));
    }
}

/// Which diagnostics make a run count as failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FailOn {
    /// Fail when any ERROR diagnostic is present.
    #[default]
    Error,
    /// Fail on any diagnostic at all.
    Warning,
    /// Never fail because of diagnostics.
    Never,
}

impl FailOn {
    pub fn threshold(&self) -> Option<Severity> {
        match self {
            Self::Error => Some(Severity::Error),
            Self::Warning => Some(Severity::Warning),
            Self::Never => None,
        }
    }

    pub fn is_failure(&self, diagnostics: &[Diagnostic]) -> bool {
        match self.threshold() {
            Some(threshold) => diagnostics.iter().any(|d| d.severity >= threshold),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiagnosticKind, ElementId, ElementKind, Granularity, NodeKey};

    fn element(id: usize) -> ElementRef {
        ElementRef {
            id: ElementId(id),
            kind: ElementKind::Type,
            qualified_name: format!("E{}", id),
            location: None,
        }
    }

    fn chain(names: &[&str], close: bool) -> (FeatureModel, EdgeOrigins) {
        let mut model = FeatureModel::new();
        let mut origins = EdgeOrigins::new();
        let indices: Vec<NodeIndex> = names
            .iter()
            .map(|name| model.get_or_insert_node(NodeKey::new(*name, Granularity::Module)).0)
            .collect();

        let mut edges: Vec<(usize, usize)> = (0..indices.len() - 1).map(|i| (i, i + 1)).collect();
        if close {
            edges.push((indices.len() - 1, 0));
        }
        for (i, (p, c)) in edges.into_iter().enumerate() {
            model.add_edge(indices[p], indices[c]);
            origins.insert((indices[p], indices[c]), (element(2 * i), element(2 * i + 1)));
        }
        (model, origins)
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let (model, origins) = chain(&["A", "B", "C"], false);
        assert!(detect_cycles(&model, &origins).is_empty());
    }

    #[test]
    fn test_three_node_cycle_reported_once() {
        let (model, origins) = chain(&["A", "B", "C"], true);
        let cycles = detect_cycles(&model, &origins);

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].kind, DiagnosticKind::Cycle);
        assert_eq!(cycles[0].severity, Severity::Error);
        assert_eq!(
            cycles[0].message,
            "containment cycle: A [MODULE] -> B [MODULE] -> C [MODULE] -> A [MODULE]"
        );
        assert_eq!(cycles[0].elements.len(), 6);
    }

    #[test]
    fn test_fail_on_thresholds() {
        let error = Diagnostic::empty_mapping_name(element(0));
        let mut warning = error.clone();
        warning.severity = Severity::Warning;

        assert!(FailOn::Error.is_failure(&[error.clone()]));
        assert!(!FailOn::Error.is_failure(&[warning.clone()]));
        assert!(FailOn::Warning.is_failure(&[warning]));
        assert!(!FailOn::Never.is_failure(&[error]));
        assert!(!FailOn::Warning.is_failure(&[]));
    }
}
