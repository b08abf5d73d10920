use crate::ast::{
    Ast, DataType, NodeId, NodeKind, Payload, Walk, BODY_STMTS, BODY_VARS,
};
use crate::error::CompilerError;

/// Reserved name of the implicit global-initializer function. User code that
/// declares the same name is reused as-is; the collision is not guarded.
pub const GLOBAL_INIT_NAME: &str = "__init";

/// Structural preprocessing: splits combined declaration+initializer nodes
/// and hoists implicit loop-counter declarations. Both steps are idempotent
/// once applied. The lazily created `__init` body is carried here, per
/// compilation run, never as global state.
#[derive(Debug, Default)]
pub struct Preprocess {
    init_body: Option<NodeId>,
}

impl Preprocess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&mut self, ast: &mut Ast, root: NodeId) -> Result<(), CompilerError> {
        self.split_var_defs(ast, root)
            .map_err(CompilerError::Preprocess)?;
        self.hoist_loop_counters(ast, root)
            .map_err(CompilerError::Preprocess)?;
        Ok(())
    }

    /// Rewrite every `VarDef` into a `VarDec` plus an `Assign` carrying the
    /// moved initializer expression. Local declarations land in the enclosing
    /// function's `Vars`/`Stmts` blocks; global ones keep their position in
    /// the global block and route the assignment into `__init`.
    fn split_var_defs(&mut self, ast: &mut Ast, root: NodeId) -> Result<(), String> {
        let mut walk = Walk::new(root);
        while let Some(node) = walk.next(ast) {
            if ast.kind(node) != NodeKind::VarDef {
                continue;
            }
            let name = ast
                .name(node)
                .ok_or("var_def without a name")?
                .to_string();
            if ast.child_count(node) != 1 {
                return Err(format!(
                    "var_def `{}' with {} children",
                    name,
                    ast.child_count(node)
                ));
            }
            let data_type = ast.node(node).data_type;
            let modifiers = ast.node(node).modifiers;
            let parent = ast.parent(node).ok_or("var_def at the tree root")?;

            let initializer = ast.child(node, 0);
            ast.remove(node, initializer);

            let declaration = ast.var_dec(&name, data_type);
            ast.node_mut(declaration).modifiers = modifiers;
            let assignment = ast.assign(&name);
            ast.append(assignment, initializer);

            match ast.enclosing_fn_body(node) {
                Some(body) => {
                    let vars = ast.body_block(body, BODY_VARS)?;
                    let stmts = ast.body_block(body, BODY_STMTS)?;
                    ast.append(vars, declaration);
                    ast.append(stmts, assignment);
                    ast.remove(parent, node);
                }
                None => {
                    let position = ast
                        .position(parent, node)
                        .expect("var_def detached from its parent");
                    ast.remove(parent, node);
                    ast.insert(parent, declaration, position);
                    let body = self.global_init_body(ast, root)?;
                    let stmts = ast.body_block(body, BODY_STMTS)?;
                    ast.append(stmts, assignment);
                }
            }

            ast.free_node(node);
            walk.skip_children();
        }
        Ok(())
    }

    /// The `Stmts`-bearing body of the global initializer, scanning top-level
    /// functions for a user-defined one before synthesizing. One instance per
    /// compilation run.
    fn global_init_body(&mut self, ast: &mut Ast, root: NodeId) -> Result<NodeId, String> {
        if let Some(body) = self.init_body {
            return Ok(body);
        }

        let top_level: Vec<NodeId> = ast.children(root).to_vec();
        for candidate in top_level {
            if ast.kind(candidate) == NodeKind::FnHead
                && ast.name(candidate) == Some(GLOBAL_INIT_NAME)
            {
                let body = ast
                    .children(candidate)
                    .iter()
                    .copied()
                    .find(|&child| ast.kind(child) == NodeKind::FnBody)
                    .ok_or_else(|| format!("`{}' has no function body", GLOBAL_INIT_NAME))?;
                self.init_body = Some(body);
                return Ok(body);
            }
        }

        // void __init(): empty params block, three empty body blocks.
        let head = ast.add_with(
            NodeKind::FnHead,
            DataType::Void,
            Payload::Name(GLOBAL_INIT_NAME.to_string()),
        );
        let params = ast.block();
        ast.append(head, params);
        let body = ast.add(NodeKind::FnBody);
        for _ in 0..3 {
            let block = ast.block();
            ast.append(body, block);
        }
        ast.append(head, body);
        ast.append(root, head);

        self.init_body = Some(body);
        Ok(body)
    }

    /// Give every `For` loop an `Int` declaration of its loop variable in the
    /// nearest enclosing function's `Vars` block. Loop lowering runs in a
    /// later phase and relies on the counter being declared.
    fn hoist_loop_counters(&self, ast: &mut Ast, root: NodeId) -> Result<(), String> {
        let mut walk = Walk::new(root);
        while let Some(node) = walk.next(ast) {
            if ast.kind(node) != NodeKind::For {
                continue;
            }
            let name = ast
                .name(node)
                .ok_or("for loop without a loop variable")?
                .to_string();
            let body = ast
                .enclosing_fn_body(node)
                .ok_or_else(|| format!("for loop over `{}' outside of a function", name))?;
            let vars = ast.body_block(body, BODY_VARS)?;
            let already_declared = ast.children(vars).iter().any(|&decl| {
                ast.kind(decl) == NodeKind::VarDec && ast.name(decl) == Some(name.as_str())
            });
            if already_declared {
                continue;
            }
            let declaration = ast.var_dec(&name, DataType::Int);
            ast.append(vars, declaration);
        }
        Ok(())
    }
}

/// One pruning sweep: detach and free childless nodes that carry no meaning
/// of their own. Returns whether anything was removed; drive with
/// `phases::fixpoint`, since emptying a block can empty its parent.
pub fn prune_empty_nodes(ast: &mut Ast, root: NodeId) -> Result<bool, String> {
    let mut changed = false;
    let mut walk = Walk::new(root);
    while let Some(node) = walk.next(ast) {
        if ast.child_count(node) > 0 {
            continue;
        }
        if matches!(
            ast.kind(node),
            NodeKind::Const | NodeKind::VarDec | NodeKind::FnHead | NodeKind::Param
        ) {
            continue;
        }
        let parent = match ast.parent(node) {
            Some(parent) => parent,
            None => continue,
        };
        ast.remove(parent, node);
        ast.free_node(node);
        walk.skip_children();
        changed = true;
    }
    Ok(changed)
}
