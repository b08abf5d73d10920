use colored::Colorize;

use crate::ast::{printer, Ast, NodeId};

/// One recoverable semantic error, reported at its site and rendered with
/// the signature of the innermost enclosing function header. The analysis
/// pass collects these and keeps walking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub context: Option<String>,
}

impl Diagnostic {
    /// Build a diagnostic at `site`, capturing the enclosing function
    /// signature while the tree is at hand.
    pub fn at(ast: &Ast, site: NodeId, message: impl Into<String>) -> Self {
        let context = ast
            .enclosing_fn_head(site)
            .map(|head| printer::signature(ast, head));
        Self {
            message: message.into(),
            context,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error: {}", self.message)?;
        match &self.context {
            Some(signature) => write!(f, " in: `{}'.", signature),
            None => write!(f, " in global scope."),
        }
    }
}

/// Print diagnostics to stderr with a colored `error:` prefix. The plain
/// `Display` form stays the canonical rendering.
pub fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let rest = match &diagnostic.context {
            Some(signature) => format!("{} in: `{}'.", diagnostic.message, signature),
            None => format!("{} in global scope.", diagnostic.message),
        };
        eprintln!("{} {}", "error:".bright_red().bold(), rest);
    }
}
