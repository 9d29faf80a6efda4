use serde::{Deserialize, Serialize};

use super::{ElementRef, NodeKey};

/// The kind of problem found while building a feature model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticKind {
    DuplicateFeature,
    UnresolvedParent,
    Cycle,
    EmptyName,
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            Self::DuplicateFeature | Self::UnresolvedParent => Severity::Warning,
            Self::Cycle | Self::EmptyName => Severity::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateFeature => "DUPLICATE_FEATURE",
            Self::UnresolvedParent => "UNRESOLVED_PARENT",
            Self::Cycle => "CYCLE",
            Self::EmptyName => "EMPTY_NAME",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DUPLICATE_FEATURE" => Some(Self::DuplicateFeature),
            "UNRESOLVED_PARENT" => Some(Self::UnresolvedParent),
            "CYCLE" => Some(Self::Cycle),
            "EMPTY_NAME" => Some(Self::EmptyName),
            _ => None,
        }
    }
}

/// Ordered so that `Error > Warning`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "WARNING" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A non-fatal finding, always attributed to the element(s) that caused it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub elements: Vec<ElementRef>,
    pub message: String,
}

impl Diagnostic {
    fn new(kind: DiagnosticKind, elements: Vec<ElementRef>, message: String) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            elements,
            message,
        }
    }

    pub fn duplicate_feature(element: ElementRef, kept: &str, ignored: &str) -> Self {
        let message = format!(
            "{} declares feature '{}' but already declares '{}'; keeping the first",
            element.qualified_name, ignored, kept
        );
        Self::new(DiagnosticKind::DuplicateFeature, vec![element], message)
    }

    pub fn empty_mapping_name(element: ElementRef) -> Self {
        let message = format!(
            "{} maps to a concept with an empty name; no node created",
            element.qualified_name
        );
        Self::new(DiagnosticKind::EmptyName, vec![element], message)
    }

    pub fn empty_feature_name(element: ElementRef) -> Self {
        let message = format!(
            "{} declares a feature with an empty name; declaration ignored",
            element.qualified_name
        );
        Self::new(DiagnosticKind::EmptyName, vec![element], message)
    }

    pub fn unresolved_parent(
        parent: ElementRef,
        child: ElementRef,
        parent_node: &NodeKey,
        child_node: &NodeKey,
    ) -> Self {
        let message = format!(
            "{} ({}) cannot contain {} ({}): a {} does not contain a {}",
            parent.qualified_name,
            parent_node,
            child.qualified_name,
            child_node,
            parent_node.granularity.as_str(),
            child_node.granularity.as_str()
        );
        Self::new(DiagnosticKind::UnresolvedParent, vec![parent, child], message)
    }

    /// `path` starts and ends with the same node.
    pub fn cycle(path: &[&NodeKey], elements: Vec<ElementRef>) -> Self {
        let rendered: Vec<String> = path.iter().map(|key| key.to_string()).collect();
        let message = format!("containment cycle: {}", rendered.join(" -> "));
        Self::new(DiagnosticKind::Cycle, elements, message)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.severity.as_str(),
            self.kind.as_str(),
            self.message
        )
    }
}
