use super::tree::{Ast, NodeId};

/// Iterative pre-order walk over a tree, built for passes that rewrite the
/// tree under their own feet.
///
/// The walk keeps an explicit frontier stack instead of recursing, and it
/// stages the current node's children only on the *next* call to `next`.
/// That gives every pass the same three guarantees:
///
/// - left-to-right pre-order over the whole tree, however deep the walk is;
/// - a pass that detaches and frees the node it is standing on calls
///   `skip_children` and the dead subtree contributes nothing further;
/// - siblings already on the frontier are visited exactly once in their
///   original order, no matter how the pass rewrote earlier siblings.
///
/// Nodes inserted at or after the current position are not picked up by
/// themselves; a pass that wants its own output walked pushes it with `push`.
#[derive(Debug)]
pub struct Walk {
    frontier: Vec<NodeId>,
    current: Option<NodeId>,
    descend: bool,
}

impl Walk {
    pub fn new(root: NodeId) -> Self {
        Self {
            frontier: vec![root],
            current: None,
            descend: true,
        }
    }

    /// Advance to the next node in pre-order, staging the previous node's
    /// children first (unless `skip_children` was called on it).
    pub fn next(&mut self, ast: &Ast) -> Option<NodeId> {
        if let Some(visited) = self.current.take() {
            if self.descend {
                for &child in ast.children(visited).iter().rev() {
                    self.frontier.push(child);
                }
            }
        }
        self.descend = true;
        self.current = self.frontier.pop();
        self.current
    }

    /// Do not descend into the current node. Required after deleting it:
    /// the ids of a freed subtree must never reach the frontier.
    pub fn skip_children(&mut self) {
        self.descend = false;
    }

    /// Stage an extra node for visiting, e.g. a freshly inserted sibling.
    pub fn push(&mut self, node: NodeId) {
        self.frontier.push(node);
    }
}
