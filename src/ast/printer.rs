use std::fmt::Write;

use super::node::{DataType, NodeKind, Payload};
use super::tree::{Ast, NodeId};

/// Canonical one-line rendering of a node: modifiers, declared type, then a
/// kind-specific tail. Shared by the diagnostics contract and the tree dump.
pub fn signature(ast: &Ast, id: NodeId) -> String {
    let node = ast.node(id);
    let mut parts: Vec<String> = Vec::new();

    let modifiers = node.modifiers.render();
    if !modifiers.is_empty() {
        parts.push(modifiers);
    }
    if node.data_type != DataType::Unknown && node.kind != NodeKind::Const {
        parts.push(node.data_type.name().to_string());
    }
    parts.push(tail(ast, id));

    parts.join(" ")
}

fn tail(ast: &Ast, id: NodeId) -> String {
    let node = ast.node(id);
    match node.kind {
        NodeKind::FnHead
        | NodeKind::VarDec
        | NodeKind::VarDef
        | NodeKind::Param
        | NodeKind::For => node.name().unwrap_or("(unnamed)").to_string(),
        NodeKind::Assign => format!("{} =", node.name().unwrap_or("(unnamed)")),
        NodeKind::Call => {
            let placeholders: Vec<String> = (0..node.children().len())
                .map(|i| format!("${}", i))
                .collect();
            format!(
                "{}({})",
                node.name().unwrap_or("(unnamed)"),
                placeholders.join(",")
            )
        }
        NodeKind::Const => match &node.payload {
            Payload::Int(value) => value.to_string(),
            Payload::Float(value) => value.to_string(),
            Payload::Name(name) => name.clone(),
            _ => node.data_type.name().to_string(),
        },
        NodeKind::BinOp | NodeKind::UnaryOp => node
            .payload
            .as_op()
            .map(|op| op.symbol().to_string())
            .unwrap_or_else(|| node.kind.name().to_string()),
        _ => node.kind.name().to_string(),
    }
}

/// Indented dump of a whole subtree, one `signature (child count)` line per
/// node.
pub fn dump(ast: &Ast, root: NodeId) -> String {
    let mut out = String::new();
    dump_node(ast, root, 0, &mut out);
    out
}

fn dump_node(ast: &Ast, id: NodeId, level: usize, out: &mut String) {
    let _ = writeln!(
        out,
        "{}{} ({})",
        "  ".repeat(level),
        signature(ast, id),
        ast.child_count(id)
    );
    for &child in ast.children(id) {
        dump_node(ast, child, level + 1, out);
    }
}
