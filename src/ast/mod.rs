pub mod node;
pub mod printer;
pub mod traverse;
pub mod tree;
pub mod wire;

pub use node::{DataType, Modifiers, NodeKind, Op, Payload};
pub use traverse::Walk;
pub use tree::{Ast, Node, NodeId, BODY_FUNCS, BODY_STMTS, BODY_VARS};
