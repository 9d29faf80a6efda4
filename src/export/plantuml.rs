//! PlantUML component diagram for a feature model.

use std::fmt::Write;

use crate::models::{FeatureModel, Granularity};

fn keyword(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Concept => "rectangle",
        Granularity::Module => "package",
        Granularity::Component => "component",
        Granularity::Data => "entity",
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "'"))
}

/// Render the model as a PlantUML script.
///
/// Each node becomes an element aliased `N<position>`, containment edges become
/// composition arrows, and member elements are attached as notes. Diagnostics
/// are emitted as comments at the top.
pub fn render_plantuml(model: &FeatureModel) -> String {
    let mut out = String::new();
    out.push_str("@startuml\n");

    for diagnostic in model.diagnostics() {
        let _ = writeln!(out, "' {}", diagnostic);
    }

    for (i, node) in model.nodes().iter().enumerate() {
        let granularity = node.key.granularity;
        let _ = write!(
            out,
            "{} {} as N{} <<{}>>",
            keyword(granularity),
            quote(&node.key.name),
            i,
            granularity.as_str()
        );
        // Packages and rectangles need a body to render as containers.
        if matches!(granularity, Granularity::Concept | Granularity::Module) {
            out.push_str(" {\n}\n");
        } else {
            out.push('\n');
        }
    }

    for (i, node) in model.nodes().iter().enumerate() {
        for child in &node.children {
            let _ = writeln!(out, "N{} *-- N{}", i, child.0);
        }
    }

    for (i, node) in model.nodes().iter().enumerate() {
        if node.members.is_empty() {
            continue;
        }
        let _ = writeln!(out, "note bottom of N{}", i);
        for member in &node.members {
            let _ = writeln!(out, "  {}", member.qualified_name);
        }
        out.push_str("end note\n");
    }

    out.push_str("@enduml\n");
    out
}
