//! Serializing a built feature model.
//!
//! Every format is a pure function of the model. The only failure is an I/O
//! error at the sink.

mod plantuml;
mod tree_render;

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::models::*;

pub use plantuml::render_plantuml;
pub use tree_render::render_tree;

/// Output format for an exported model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Structured document with nodes, features and diagnostics.
    #[default]
    Json,
    /// ASCII containment tree.
    Tree,
    /// PlantUML component diagram.
    Plantuml,
}

/// The persisted shape of a feature model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelDocument {
    pub nodes: Vec<NodeRecord>,
    pub features: Vec<FeatureRecord>,
    pub diagnostics: Vec<DiagnosticRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub name: String,
    pub granularity: Granularity,
    pub member_elements: Vec<String>,
    pub children: Vec<NodeKey>,
}

impl NodeRecord {
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.name.clone(), self.granularity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureRecord {
    pub element: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub elements: Vec<String>,
}

impl ModelDocument {
    pub fn node(&self, key: &NodeKey) -> Option<&NodeRecord> {
        self.nodes
            .iter()
            .find(|n| n.name == key.name && n.granularity == key.granularity)
    }
}

/// The document form of `model`, in the model's own order.
pub fn document(model: &FeatureModel) -> ModelDocument {
    let nodes = model
        .nodes()
        .iter()
        .map(|node| NodeRecord {
            name: node.key.name.clone(),
            granularity: node.key.granularity,
            member_elements: node
                .members
                .iter()
                .map(|m| m.qualified_name.clone())
                .collect(),
            children: node
                .children
                .iter()
                .map(|&c| model.node_at(c).key.clone())
                .collect(),
        })
        .collect();

    let features = model
        .features()
        .iter()
        .map(|f| FeatureRecord {
            element: f.element.qualified_name.clone(),
            name: f.declaration.name.clone(),
            description: f.declaration.description.clone(),
            feature_type: f.declaration.feature_type,
        })
        .collect();

    let diagnostics = model
        .diagnostics()
        .iter()
        .map(|d| DiagnosticRecord {
            kind: d.kind,
            severity: d.severity,
            message: d.message.clone(),
            elements: d.elements.iter().map(|e| e.qualified_name.clone()).collect(),
        })
        .collect();

    ModelDocument {
        nodes,
        features,
        diagnostics,
    }
}

/// Write `model` to `writer` in the given format.
pub fn export<W: Write>(
    model: &FeatureModel,
    format: ExportFormat,
    mut writer: W,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &document(model))?;
            writer.write_all(b"\n")?;
        }
        ExportFormat::Tree => writer.write_all(render_tree(&model.tree()).as_bytes())?,
        ExportFormat::Plantuml => writer.write_all(render_plantuml(model).as_bytes())?,
    }
    writer.flush()?;
    Ok(())
}

/// Write `model` to a file, creating parent directories as needed.
pub fn export_to_path(
    model: &FeatureModel,
    format: ExportFormat,
    path: &Path,
) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = fs::File::create(path)?;
    export(model, format, BufWriter::new(file))?;
    tracing::info!("Exported feature model to {}", path.display());
    Ok(())
}

/// Render `model` into a string.
pub fn export_to_string(model: &FeatureModel, format: ExportFormat) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = export(model, format, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::scanner::scan;

    fn model() -> FeatureModel {
        let tree = SourceTree::from_specs(vec![ElementSpec::type_("Auth")
            .feature(FeatureDeclaration::new("Login", FeatureType::Functional))
            .mapping(MappingDeclaration::new("Security", Granularity::Concept))
            .child(
                ElementSpec::method("check")
                    .mapping(MappingDeclaration::new("Session Check", Granularity::Component))
                    .mapping(MappingDeclaration::new(" ", Granularity::Data)),
            )]);
        build(&scan(&tree).unwrap()).0
    }

    #[test]
    fn test_document_mirrors_model() {
        let doc = document(&model());

        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.nodes[0].name, "Security");
        assert_eq!(doc.nodes[0].member_elements, vec!["Auth"]);
        assert_eq!(
            doc.nodes[0].children,
            vec![NodeKey::new("Session Check", Granularity::Component)]
        );
        assert_eq!(doc.features[0].element, "Auth");
        assert_eq!(doc.diagnostics.len(), 1);
        assert_eq!(doc.diagnostics[0].elements, vec!["Auth.check"]);
    }

    #[test]
    fn test_json_field_names() {
        let json = export_to_string(&model(), ExportFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["nodes"][0]["granularity"], "CONCEPT");
        assert_eq!(value["nodes"][0]["memberElements"][0], "Auth");
        assert_eq!(value["nodes"][0]["children"][0]["name"], "Session Check");
        assert_eq!(value["features"][0]["type"], "FUNCTIONAL");
        assert_eq!(value["diagnostics"][0]["kind"], "EMPTY_NAME");
        assert_eq!(value["diagnostics"][0]["severity"], "ERROR");
    }

    #[test]
    fn test_export_does_not_change_model() {
        let model = model();
        let before = model.clone();
        let _ = export_to_string(&model, ExportFormat::Plantuml);
        let _ = export_to_string(&model, ExportFormat::Json);
        assert_eq!(model, before);
    }
}
