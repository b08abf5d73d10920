pub mod ast;
pub mod error;
pub mod phases;
pub mod scope;

use ast::{Ast, NodeId};
pub use error::CompilerError;
use phases::{diagnostics, ContextAnalysis, Preprocess};

pub const VERSION: &str = "0.3.0";

/// The middle-end pipeline: preprocessing, context analysis, loop lowering,
/// each mutating the tree in place. A failing phase aborts the pipeline with
/// its own error (and exit code); analysis additionally reports its
/// per-site diagnostics before failing.
pub struct Pipeline;

impl Pipeline {
    pub fn run(ast: &mut Ast, root: NodeId) -> Result<(), CompilerError> {
        Self::run_with(ast, root, |_, _| {})
    }

    /// Run all phases, calling `observe(phase_name, ast)` after each one
    /// completes. Used by the driver for its dump flags.
    pub fn run_with<F>(ast: &mut Ast, root: NodeId, mut observe: F) -> Result<(), CompilerError>
    where
        F: FnMut(&str, &Ast),
    {
        // 1. PREPROCESSING
        let mut preprocess = Preprocess::new();
        preprocess.run(ast, root)?;
        observe("preprocess", ast);

        // 2. CONTEXT ANALYSIS
        let mut analysis = ContextAnalysis::new();
        let checked = analysis.run(ast, root);
        if checked.is_err() {
            diagnostics::report(analysis.diagnostics());
        }
        checked?;
        observe("analysis", ast);

        // 3. LOOP LOWERING
        phases::loops::run(ast, root)?;
        observe("loops", ast);

        Ok(())
    }
}
