use serde::{Deserialize, Serialize};

use super::Metadata;

/// Index of an element inside its [`SourceTree`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ElementId(pub usize);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of code element an annotation is attached to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementKind {
    Type,
    Field,
    Method,
    Constructor,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Type => "TYPE",
            Self::Field => "FIELD",
            Self::Method => "METHOD",
            Self::Constructor => "CONSTRUCTOR",
        }
    }
}

/// Where an element was declared in the original source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default)]
    pub start_column: u32,
    #[serde(default)]
    pub end_column: u32,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.start_line)
    }
}

/// A node in the input code tree.
///
/// `parent` is a back-reference by id; the tree owns every element and
/// `children` lists nested elements in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceElement {
    pub id: ElementId,
    pub kind: ElementKind,
    pub name: String,
    pub qualified_name: String,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub metadata: Vec<Metadata>,
    pub location: Option<SourceLocation>,
}

impl SourceElement {
    /// Owned, lightweight reference used by the model and diagnostics.
    pub fn to_ref(&self) -> ElementRef {
        ElementRef {
            id: self.id,
            kind: self.kind,
            qualified_name: self.qualified_name.clone(),
            location: self.location.clone(),
        }
    }
}

/// A reference to a source element that outlives the tree it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElementRef {
    pub id: ElementId,
    pub kind: ElementKind,
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} ({})", self.qualified_name, location),
            None => f.write_str(&self.qualified_name),
        }
    }
}

/// Nested description of an element, the shape external parsers hand over.
///
/// A child's qualified name defaults to `<parent qualified name>.<name>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElementSpec {
    pub kind: ElementKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    #[serde(default)]
    pub metadata: Vec<Metadata>,
    #[serde(default)]
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    pub fn new(kind: ElementKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            qualified_name: None,
            location: None,
            metadata: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn type_(name: impl Into<String>) -> Self {
        Self::new(ElementKind::Type, name)
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self::new(ElementKind::Field, name)
    }

    pub fn method(name: impl Into<String>) -> Self {
        Self::new(ElementKind::Method, name)
    }

    pub fn constructor(name: impl Into<String>) -> Self {
        Self::new(ElementKind::Constructor, name)
    }

    pub fn qualified(mut self, qualified_name: impl Into<String>) -> Self {
        self.qualified_name = Some(qualified_name.into());
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn feature(mut self, declaration: super::FeatureDeclaration) -> Self {
        self.metadata.push(Metadata::Feature(declaration));
        self
    }

    pub fn mapping(mut self, declaration: super::MappingDeclaration) -> Self {
        self.metadata.push(Metadata::Mapping(declaration));
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }
}

/// Top-level input document: the roots of one or more parsed source files.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceDocument {
    pub roots: Vec<ElementSpec>,
}

/// Arena owning every element of one scan input.
///
/// Built either from nested [`ElementSpec`]s, which always yields a well-formed
/// tree, or from raw parts, which the scanner validates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTree {
    elements: Vec<SourceElement>,
    roots: Vec<ElementId>,
}

impl SourceTree {
    pub fn from_parts(elements: Vec<SourceElement>, roots: Vec<ElementId>) -> Self {
        Self { elements, roots }
    }

    pub fn from_document(document: SourceDocument) -> Self {
        Self::from_specs(document.roots)
    }

    pub fn from_specs(specs: Vec<ElementSpec>) -> Self {
        let mut tree = Self::default();
        for spec in specs {
            let id = tree.push_spec(spec, None);
            tree.roots.push(id);
        }
        tree
    }

    fn push_spec(&mut self, spec: ElementSpec, parent: Option<ElementId>) -> ElementId {
        let id = ElementId(self.elements.len());
        let qualified_name = match (spec.qualified_name, parent) {
            (Some(explicit), _) => explicit,
            (None, Some(parent)) => {
                format!("{}.{}", self.elements[parent.0].qualified_name, spec.name)
            }
            (None, None) => spec.name.clone(),
        };

        self.elements.push(SourceElement {
            id,
            kind: spec.kind,
            name: spec.name,
            qualified_name,
            parent,
            children: Vec::new(),
            metadata: spec.metadata,
            location: spec.location,
        });

        for child in spec.children {
            let child_id = self.push_spec(child, Some(id));
            self.elements[id.0].children.push(child_id);
        }
        id
    }

    /// Look up an element, rejecting ids whose slot holds a different element.
    pub fn get(&self, id: ElementId) -> Option<&SourceElement> {
        self.elements.get(id.0).filter(|element| element.id == id)
    }

    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    pub fn elements(&self) -> &[SourceElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Ancestors of `id`, nearest first.
    ///
    /// Only terminates on trees whose parent chains are acyclic; the scanner
    /// guarantees that for every tree it accepts.
    pub fn ancestors(&self, id: ElementId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.get(id).and_then(|element| element.parent),
        }
    }

    /// Find an element by its qualified name.
    pub fn find(&self, qualified_name: &str) -> Option<&SourceElement> {
        self.elements
            .iter()
            .find(|element| element.qualified_name == qualified_name)
    }
}

pub struct Ancestors<'a> {
    tree: &'a SourceTree,
    next: Option<ElementId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a SourceElement;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.tree.get(self.next?)?;
        self.next = element.parent;
        Some(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Granularity, MappingDeclaration};

    fn sample() -> SourceTree {
        SourceTree::from_specs(vec![ElementSpec::type_("UserService")
            .qualified("com.example.UserService")
            .mapping(MappingDeclaration::new("User Management", Granularity::Module))
            .child(ElementSpec::field("userRepository"))
            .child(
                ElementSpec::method("createUser")
                    .child(ElementSpec::new(ElementKind::Type, "Local")),
            )])
    }

    #[test]
    fn test_specs_flatten_in_declaration_order() {
        let tree = sample();
        let names: Vec<&str> = tree.elements().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["UserService", "userRepository", "createUser", "Local"]);
        assert_eq!(tree.roots(), &[ElementId(0)]);
        assert_eq!(tree.get(ElementId(0)).unwrap().children, vec![ElementId(1), ElementId(2)]);
    }

    #[test]
    fn test_qualified_names_follow_nesting() {
        let tree = sample();
        assert_eq!(
            tree.get(ElementId(3)).unwrap().qualified_name,
            "com.example.UserService.createUser.Local"
        );
        assert!(tree.find("com.example.UserService.userRepository").is_some());
    }

    #[test]
    fn test_ancestors_are_nearest_first() {
        let tree = sample();
        let ancestors: Vec<&str> = tree
            .ancestors(ElementId(3))
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(ancestors, vec!["createUser", "UserService"]);
        assert_eq!(tree.ancestors(ElementId(0)).count(), 0);
    }

    #[test]
    fn test_get_rejects_mismatched_slot() {
        let mut element = sample().get(ElementId(1)).unwrap().clone();
        element.id = ElementId(7);
        let tree = SourceTree::from_parts(vec![element], vec![ElementId(7)]);
        assert!(tree.get(ElementId(0)).is_none());
        assert!(tree.get(ElementId(7)).is_none());
    }

    #[test]
    fn test_document_json_shape() {
        let json = r#"{
            "roots": [{
                "kind": "TYPE",
                "name": "UserService",
                "location": {"file": "src/UserService.java", "start_line": 10, "end_line": 31},
                "metadata": [
                    {"annotation": "mapping", "target_concept": "User Management", "granularity": "MODULE"}
                ],
                "children": [{"kind": "FIELD", "name": "userRepository"}]
            }]
        }"#;
        let document: SourceDocument = serde_json::from_str(json).unwrap();
        let tree = SourceTree::from_document(document);

        assert_eq!(tree.len(), 2);
        let root = tree.get(ElementId(0)).unwrap();
        assert_eq!(root.location.as_ref().unwrap().to_string(), "src/UserService.java:10");
        assert_eq!(tree.get(ElementId(1)).unwrap().qualified_name, "UserService.userRepository");
    }
}
