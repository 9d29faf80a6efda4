use serde::{Deserialize, Serialize};

/// Whether a declared feature is user-facing behaviour or a quality attribute.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureType {
    #[default]
    Functional,
    NonFunctional,
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Functional => "FUNCTIONAL",
            Self::NonFunctional => "NON_FUNCTIONAL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "FUNCTIONAL" => Some(Self::Functional),
            "NON_FUNCTIONAL" => Some(Self::NonFunctional),
            _ => None,
        }
    }
}

/// The level in the concept hierarchy a mapping targets.
///
/// Ordered from coarsest to finest: `Concept` > `Module` > `Component` > `Data`.
/// A node may contain nodes of the same or a finer granularity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    #[default]
    Concept,
    Module,
    Component,
    Data,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Concept,
        Granularity::Module,
        Granularity::Component,
        Granularity::Data,
    ];

    /// Position in the hierarchy, 0 for the coarsest level.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Concept => 0,
            Self::Module => 1,
            Self::Component => 2,
            Self::Data => 3,
        }
    }

    /// Whether a node at this granularity may contain a node at `child`.
    pub fn can_contain(&self, child: Granularity) -> bool {
        self.rank() <= child.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Concept => "CONCEPT",
            Self::Module => "MODULE",
            Self::Component => "COMPONENT",
            Self::Data => "DATA",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CONCEPT" => Some(Self::Concept),
            "MODULE" => Some(Self::Module),
            "COMPONENT" => Some(Self::Component),
            "DATA" => Some(Self::Data),
            _ => None,
        }
    }
}

/// Declares that an element implements or represents a named feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureDeclaration {
    /// A missing name parses as empty and is reported as `EMPTY_NAME`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub feature_type: FeatureType,
}

impl FeatureDeclaration {
    pub fn new(name: impl Into<String>, feature_type: FeatureType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            feature_type,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Declares that an element participates in a named concept at some granularity.
///
/// Concept names are keyed exactly as written: no case folding, no trimming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MappingDeclaration {
    #[serde(default)]
    pub target_concept: String,
    #[serde(default)]
    pub granularity: Granularity,
}

impl MappingDeclaration {
    pub fn new(target_concept: impl Into<String>, granularity: Granularity) -> Self {
        Self {
            target_concept: target_concept.into(),
            granularity,
        }
    }
}

/// A single metadata instance attached to a source element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "annotation", rename_all = "snake_case")]
pub enum Metadata {
    Feature(FeatureDeclaration),
    Mapping(MappingDeclaration),
    /// Any other annotation the parser passed through. The scanner skips it.
    #[serde(other)]
    Other,
}

impl Metadata {
    /// Whether this instance carries a feature or mapping declaration.
    pub fn is_declaration(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// True when a declared name carries no visible characters.
pub fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}
