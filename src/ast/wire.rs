use serde::{Deserialize, Serialize};

use super::node::{DataType, Modifiers, NodeKind, Op, Payload};
use super::tree::{Ast, NodeId};

/// Wire form of a modifier flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    Extern,
    Export,
    Return,
}

impl From<Modifier> for Modifiers {
    fn from(modifier: Modifier) -> Self {
        match modifier {
            Modifier::Extern => Modifiers::EXTERN,
            Modifier::Export => Modifiers::EXPORT,
            Modifier::Return => Modifiers::RETURN,
        }
    }
}

fn is_unknown(data_type: &DataType) -> bool {
    *data_type == DataType::Unknown
}

/// One tree node in interchange form. The external grammar hands the driver
/// a nested object of these; the driver emits the lowered tree in the same
/// shape. Exactly one payload field is meaningful per node, selected by
/// `kind` and `data_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "is_unknown")]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<Modifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub int: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub float: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<Op>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    /// Materialize the spec (and its children) into the store, validating
    /// the payload-per-kind table.
    pub fn build(&self, ast: &mut Ast) -> Result<NodeId, String> {
        let payload = self.payload()?;
        let id = ast.add_with(self.kind, self.data_type, payload);
        let flags = self
            .modifiers
            .iter()
            .fold(Modifiers::empty(), |acc, &m| acc | Modifiers::from(m));
        ast.node_mut(id).modifiers = flags;
        for child in &self.children {
            let child_id = child.build(ast)?;
            ast.append(id, child_id);
        }
        Ok(id)
    }

    fn payload(&self) -> Result<Payload, String> {
        if self.kind.carries_name() {
            return self
                .name
                .clone()
                .map(Payload::Name)
                .ok_or_else(|| format!("{} node without a name", self.kind.name()));
        }
        match self.kind {
            NodeKind::Const => match self.data_type {
                DataType::Int | DataType::Bool => self
                    .int
                    .map(Payload::Int)
                    .ok_or_else(|| "const without an integer value".to_string()),
                DataType::Float => self
                    .float
                    .map(Payload::Float)
                    .ok_or_else(|| "const without a float value".to_string()),
                DataType::Ident => self
                    .name
                    .clone()
                    .map(Payload::Name)
                    .ok_or_else(|| "identifier const without a name".to_string()),
                other => Err(format!("const tagged `{}'", other.name())),
            },
            NodeKind::BinOp | NodeKind::UnaryOp => self
                .op
                .map(Payload::Op)
                .ok_or_else(|| format!("{} node without an operator", self.kind.name())),
            _ => Ok(Payload::None),
        }
    }

    /// Interchange form of a live subtree.
    pub fn from_tree(ast: &Ast, id: NodeId) -> NodeSpec {
        let node = ast.node(id);
        let mut modifiers = Vec::new();
        if node.modifiers.contains(Modifiers::EXTERN) {
            modifiers.push(Modifier::Extern);
        }
        if node.modifiers.contains(Modifiers::EXPORT) {
            modifiers.push(Modifier::Export);
        }
        if node.modifiers.contains(Modifiers::RETURN) {
            modifiers.push(Modifier::Return);
        }
        let (name, int, float, op) = match &node.payload {
            Payload::Name(s) => (Some(s.clone()), None, None, None),
            Payload::Int(v) => (None, Some(*v), None, None),
            Payload::Float(v) => (None, None, Some(*v), None),
            Payload::Op(o) => (None, None, None, Some(*o)),
            Payload::None => (None, None, None, None),
        };
        NodeSpec {
            kind: node.kind,
            data_type: node.data_type,
            modifiers,
            name,
            int,
            float,
            op,
            children: node
                .children()
                .iter()
                .map(|&child| NodeSpec::from_tree(ast, child))
                .collect(),
        }
    }
}

/// Decode a JSON tree into the store, returning the root id.
pub fn from_json(json: &str, ast: &mut Ast) -> Result<NodeId, String> {
    let spec: NodeSpec = serde_json::from_str(json).map_err(|e| e.to_string())?;
    spec.build(ast)
}

/// Encode a live subtree as pretty-printed JSON.
pub fn to_json(ast: &Ast, id: NodeId) -> Result<String, String> {
    serde_json::to_string_pretty(&NodeSpec::from_tree(ast, id)).map_err(|e| e.to_string())
}
