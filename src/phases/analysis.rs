use super::diagnostics::Diagnostic;
use crate::ast::{Ast, DataType, NodeId, NodeKind, Op, Walk, BODY_FUNCS, BODY_VARS};
use crate::error::CompilerError;
use crate::scope::{scope_level, Frame, ScopeStack};

/// Scope resolution and type checking. Frames are built per function body by
/// cloning the innermost enclosing frame and appending parameters, local
/// variables and nested functions in three stages; a name may shadow an
/// inherited one but not collide within its own stage. Every check reports
/// at its own site and the walk continues, so one run surfaces as many
/// errors as possible.
#[derive(Debug, Default)]
pub struct ContextAnalysis {
    scopes: ScopeStack,
    diagnostics: Vec<Diagnostic>,
}

impl ContextAnalysis {
    pub fn new() -> Self {
        Self {
            scopes: ScopeStack::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn run(&mut self, ast: &mut Ast, root: NodeId) -> Result<(), CompilerError> {
        self.analyze(ast, root).map_err(CompilerError::Analysis)?;
        if self.diagnostics.is_empty() {
            Ok(())
        } else {
            Err(CompilerError::Analysis(format!(
                "{} error(s) reported",
                self.diagnostics.len()
            )))
        }
    }

    fn analyze(&mut self, ast: &mut Ast, root: NodeId) -> Result<(), String> {
        self.build_global_frame(ast, root);

        let mut walk = Walk::new(root);
        while let Some(node) = walk.next(ast) {
            match ast.kind(node) {
                NodeKind::FnBody => self.enter_fn_body(ast, node)?,
                NodeKind::Assign => self.check_assignment(ast, node),
                NodeKind::Call => self.check_call(ast, node),
                NodeKind::Const if ast.node(node).data_type == DataType::Ident => {
                    self.resolve(ast, node);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Level-0 frame: top-level variables, then top-level functions, with
    /// the same per-stage duplicate rejection as function frames.
    fn build_global_frame(&mut self, ast: &Ast, root: NodeId) {
        let mut frame = Frame::new();

        let stage = frame.len();
        for &child in ast.children(root) {
            if ast.kind(child) == NodeKind::VarDec {
                self.stage_declare(ast, &mut frame, stage, child);
            }
        }

        let stage = frame.len();
        for &child in ast.children(root) {
            if ast.kind(child) == NodeKind::FnHead {
                self.stage_declare(ast, &mut frame, stage, child);
            }
        }

        self.scopes.set(0, frame);
    }

    fn stage_declare(&mut self, ast: &Ast, frame: &mut Frame, stage_start: usize, decl: NodeId) {
        let name = match ast.name(decl) {
            Some(name) => name,
            None => return,
        };
        if frame.stage_contains(ast, stage_start, name) {
            self.diagnostics.push(Diagnostic::at(
                ast,
                decl,
                format!("redeclaration of variable `{}'", name),
            ));
        } else {
            frame.push(decl);
        }
    }

    fn enter_fn_body(&mut self, ast: &mut Ast, body: NodeId) -> Result<(), String> {
        let vars = ast.body_block(body, BODY_VARS)?;
        let funcs = ast.body_block(body, BODY_FUNCS)?;
        let level = scope_level(ast, vars);
        if level == 0 {
            return Err("function body at the tree root".to_string());
        }
        let mut frame = self
            .scopes
            .frame_at(level - 1)
            .cloned()
            .ok_or("no enclosing scope frame")?;

        // stage 1: parameters
        if let Some(head) = ast.parent(body).filter(|&p| ast.kind(p) == NodeKind::FnHead) {
            if ast.child_count(head) > 0 && ast.kind(ast.child(head, 0)) == NodeKind::Block {
                let params_block = ast.child(head, 0);
                let stage = frame.len();
                for &param in ast.children(params_block) {
                    if ast.kind(param) == NodeKind::Param {
                        self.stage_declare(ast, &mut frame, stage, param);
                    }
                }
            }
        }

        // stage 2: local variables
        let stage = frame.len();
        for &decl in ast.children(vars) {
            if ast.kind(decl) == NodeKind::VarDec {
                self.stage_declare(ast, &mut frame, stage, decl);
            }
        }

        // stage 3: nested functions
        let stage = frame.len();
        for &func in ast.children(funcs) {
            if ast.kind(func) == NodeKind::FnHead {
                self.stage_declare(ast, &mut frame, stage, func);
            }
        }

        self.scopes.set(level, frame);

        if ast.child_count(body) == 4 {
            self.check_return(ast, body);
        }
        Ok(())
    }

    fn check_return(&mut self, ast: &Ast, body: NodeId) {
        let head = match ast.parent(body).filter(|&p| ast.kind(p) == NodeKind::FnHead) {
            Some(head) => head,
            None => return,
        };
        let expr = ast.child(body, 3);
        let found = self.infer(ast, expr);
        let declared = ast.node(head).data_type;
        if found != declared {
            let name = ast.name(head).unwrap_or("(unnamed)").to_string();
            self.diagnostics.push(Diagnostic::at(
                ast,
                expr,
                format!(
                    "return type mismatch: `{}' is declared `{}' but returns `{}'",
                    name,
                    declared.name(),
                    found.name()
                ),
            ));
        }
    }

    fn check_assignment(&mut self, ast: &Ast, node: NodeId) {
        let target = match self.resolve(ast, node) {
            Some(target) => target,
            None => return,
        };
        let name = ast.name(node).unwrap_or("(unnamed)").to_string();
        if ast.kind(target) == NodeKind::FnHead {
            self.diagnostics.push(Diagnostic::at(
                ast,
                node,
                format!("invalid assignment target `{}'", name),
            ));
            return;
        }
        if ast.child_count(node) != 1 {
            return;
        }
        let declared = ast.node(target).data_type;
        let found = self.infer(ast, ast.child(node, 0));
        if found != declared {
            self.diagnostics.push(Diagnostic::at(
                ast,
                node,
                format!(
                    "data type mismatch: `{}' is of type `{}' but is assigned a value of type `{}'",
                    name,
                    declared.name(),
                    found.name()
                ),
            ));
        }
    }

    fn check_call(&mut self, ast: &Ast, node: NodeId) {
        let callee = match self.resolve(ast, node) {
            Some(callee) => callee,
            None => return,
        };
        let name = ast.name(node).unwrap_or("(unnamed)").to_string();
        if ast.kind(callee) != NodeKind::FnHead {
            self.diagnostics.push(Diagnostic::at(
                ast,
                node,
                format!("invalid callee `{}'", name),
            ));
            return;
        }

        let params = self.fn_params(ast, callee);
        let arg_count = ast.child_count(node);
        if arg_count < params.len() {
            self.diagnostics.push(Diagnostic::at(
                ast,
                node,
                format!("not enough arguments in call to `{}'", name),
            ));
        } else if arg_count > params.len() {
            self.diagnostics.push(Diagnostic::at(
                ast,
                node,
                format!("too many arguments in call to `{}'", name),
            ));
        }

        for index in 0..arg_count.min(params.len()) {
            let expected = ast.node(params[index]).data_type;
            let found = self.infer(ast, ast.child(node, index));
            if found != expected {
                self.diagnostics.push(Diagnostic::at(
                    ast,
                    node,
                    format!(
                        "argument type mismatch in call to `{}': \
                         argument {} is of type `{}' but should be of type `{}'",
                        name,
                        index + 1,
                        found.name(),
                        expected.name()
                    ),
                ));
            }
        }
    }

    fn fn_params(&self, ast: &Ast, head: NodeId) -> Vec<NodeId> {
        if ast.child_count(head) == 0 {
            return Vec::new();
        }
        let block = ast.child(head, 0);
        if ast.kind(block) != NodeKind::Block {
            return Vec::new();
        }
        ast.children(block)
            .iter()
            .copied()
            .filter(|&param| ast.kind(param) == NodeKind::Param)
            .collect()
    }

    /// Resolve the identifier carried by `node`, reporting a missing
    /// definition at the site. Inference resolves silently instead; an
    /// unresolved name is diagnosed exactly once, where the walk visits it.
    fn resolve(&mut self, ast: &Ast, node: NodeId) -> Option<NodeId> {
        let name = match ast.name(node) {
            Some(name) => name,
            None => return None,
        };
        let found = self
            .scopes
            .frame_at(scope_level(ast, node))
            .and_then(|frame| frame.lookup(ast, name));
        if found.is_none() {
            self.diagnostics.push(Diagnostic::at(
                ast,
                node,
                format!("missing definition of identifier: `{}'", name),
            ));
        }
        found
    }

    fn lookup(&self, ast: &Ast, node: NodeId) -> Option<NodeId> {
        let name = ast.name(node)?;
        self.scopes
            .frame_at(scope_level(ast, node))
            .and_then(|frame| frame.lookup(ast, name))
    }

    /// Expression type inference over the four primitive types. Operator
    /// nodes whose operands are not both `int` or both `float` record a type
    /// mismatch at the operator and yield `?`; there is no implicit
    /// widening. Unresolved identifiers propagate `?` silently.
    fn infer(&mut self, ast: &Ast, node: NodeId) -> DataType {
        match ast.kind(node) {
            NodeKind::Const => {
                if ast.node(node).data_type == DataType::Ident {
                    match self.lookup(ast, node) {
                        Some(decl) => ast.node(decl).data_type,
                        None => DataType::Unknown,
                    }
                } else {
                    ast.node(node).data_type
                }
            }
            NodeKind::Cast => ast.node(node).data_type,
            NodeKind::Call => match self.lookup(ast, node) {
                Some(decl) if ast.kind(decl) == NodeKind::FnHead => ast.node(decl).data_type,
                _ => DataType::Unknown,
            },
            NodeKind::BinOp => {
                if ast.child_count(node) != 2 {
                    return DataType::Unknown;
                }
                let lhs = self.infer(ast, ast.child(node, 0));
                let rhs = self.infer(ast, ast.child(node, 1));
                match (lhs, rhs) {
                    (DataType::Int, DataType::Int) => DataType::Int,
                    (DataType::Float, DataType::Float) => DataType::Float,
                    _ => {
                        self.diagnostics.push(Diagnostic::at(
                            ast,
                            node,
                            format!("type mismatch: `{}' and `{}'", lhs.name(), rhs.name()),
                        ));
                        DataType::Unknown
                    }
                }
            }
            NodeKind::UnaryOp => {
                if ast.child_count(node) != 1 {
                    return DataType::Unknown;
                }
                let operand = self.infer(ast, ast.child(node, 0));
                let legal = match ast.node(node).payload.as_op() {
                    Some(Op::Not) => operand == DataType::Bool,
                    Some(Op::Neg) => matches!(operand, DataType::Int | DataType::Float),
                    _ => false,
                };
                if legal {
                    operand
                } else {
                    let symbol = ast
                        .node(node)
                        .payload
                        .as_op()
                        .map(|op| op.symbol())
                        .unwrap_or("?");
                    self.diagnostics.push(Diagnostic::at(
                        ast,
                        node,
                        format!("type mismatch: `{}' operand of `{}'", operand.name(), symbol),
                    ));
                    DataType::Unknown
                }
            }
            _ => DataType::Unknown,
        }
    }
}
