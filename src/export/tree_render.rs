//! ASCII tree rendering for feature models.

use crate::models::{FeatureTreeNode, Granularity};

const CONCEPT: char = '◆';
const MODULE: char = '■';
const COMPONENT: char = '●';
const DATA: char = '○';
const CYCLE: &str = " ↺";
const REPEATED: &str = " ↑";

/// Get the symbol for a node granularity.
fn granularity_symbol(granularity: Granularity) -> char {
    match granularity {
        Granularity::Concept => CONCEPT,
        Granularity::Module => MODULE,
        Granularity::Component => COMPONENT,
        Granularity::Data => DATA,
    }
}

/// Render a containment tree as ASCII art with granularity symbols.
///
/// Example output:
/// ```text
/// User Management [MODULE]
/// ├── ● User Repository
/// ├── ● User Creation
/// │   └── ○ User Record
/// └── ● Role Link
/// ```
///
/// A node repeated to close a cycle is suffixed with `↺`; a node already
/// expanded higher up is printed again without children and suffixed with `↑`.
pub fn render_tree(nodes: &[FeatureTreeNode]) -> String {
    let mut output = String::new();
    for (i, node) in nodes.iter().enumerate() {
        let is_last = i == nodes.len() - 1;
        render_node(&mut output, node, "", is_last, true);
    }
    output
}

fn render_node(
    output: &mut String,
    node: &FeatureTreeNode,
    prefix: &str,
    is_last: bool,
    is_root: bool,
) {
    if is_root {
        output.push_str(&node.key.to_string());
    } else {
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
        output.push(granularity_symbol(node.key.granularity));
        output.push(' ');
        output.push_str(&node.key.name);
    }
    if node.cycle {
        output.push_str(CYCLE);
    } else if node.repeated {
        output.push_str(REPEATED);
    }
    output.push('\n');

    let child_prefix = if is_root {
        String::new()
    } else {
        let continuation = if is_last { "    " } else { "│   " };
        format!("{}{}", prefix, continuation)
    };

    for (i, child) in node.children.iter().enumerate() {
        let child_is_last = i == node.children.len() - 1;
        render_node(output, child, &child_prefix, child_is_last, false);
    }
}
