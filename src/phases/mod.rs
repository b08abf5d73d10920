pub mod analysis;
pub mod diagnostics;
pub mod loops;
pub mod preprocess;

pub use analysis::ContextAnalysis;
pub use diagnostics::Diagnostic;
pub use preprocess::Preprocess;

use crate::ast::{Ast, NodeId};

/// Drive a rewriting pass to a fixpoint: repeat until a full run reports no
/// change. For passes whose rewrites can expose new opportunities, such as
/// pruning a block whose removal empties its parent.
pub fn fixpoint<F>(ast: &mut Ast, root: NodeId, mut pass: F) -> Result<(), String>
where
    F: FnMut(&mut Ast, NodeId) -> Result<bool, String>,
{
    while pass(ast, root)? {}
    Ok(())
}
