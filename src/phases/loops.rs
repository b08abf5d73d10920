use crate::ast::{Ast, NodeId, NodeKind, Op, Walk};
use crate::error::CompilerError;

/// Lower `while` and `for` loops into the canonical `if`-guarded `do-while`
/// form the later stages understand.
pub fn run(ast: &mut Ast, root: NodeId) -> Result<(), CompilerError> {
    while_to_do(ast, root).map_err(CompilerError::Lowering)?;
    for_to_do(ast, root).map_err(CompilerError::Lowering)?;
    Ok(())
}

/// `while (c) body` becomes `if (c) do body while (c')`, with the repeat test
/// a clone of the guard. The body runs zero times when the guard is false at
/// entry, otherwise as a pre-tested loop on top of post-tested iteration.
pub fn while_to_do(ast: &mut Ast, root: NodeId) -> Result<(), String> {
    let mut walk = Walk::new(root);
    while let Some(node) = walk.next(ast) {
        if ast.kind(node) != NodeKind::While {
            continue;
        }
        if ast.child_count(node) != 2 {
            return Err(format!(
                "while loop with {} children",
                ast.child_count(node)
            ));
        }
        let parent = ast.parent(node).ok_or("while loop at the tree root")?;
        let condition = ast.child(node, 0);
        let body = ast.child(node, 1);
        ast.remove(node, condition);
        ast.remove(node, body);

        let repeat_test = ast.clone_tree(condition);
        let do_stmt = ast.add(NodeKind::DoWhile);
        ast.append(do_stmt, repeat_test);
        ast.append(do_stmt, body);

        let if_stmt = ast.add(NodeKind::If);
        ast.append(if_stmt, condition);
        ast.append(if_stmt, do_stmt);

        let position = ast
            .position(parent, node)
            .expect("while loop detached from its parent");
        ast.insert(parent, if_stmt, position);
        ast.remove(parent, node);
        ast.free_node(node);
        walk.skip_children();
    }
    Ok(())
}

/// `for (i, lo, hi, step) body` becomes, at the loop's position:
/// `i = lo; if (i < hi) do { body; i = i + step; } while (i < hi)`.
/// The bounds are read from the loop's literal-integer children and embedded
/// as fresh constants; the body is reused in place.
pub fn for_to_do(ast: &mut Ast, root: NodeId) -> Result<(), String> {
    let mut walk = Walk::new(root);
    while let Some(node) = walk.next(ast) {
        if ast.kind(node) != NodeKind::For {
            continue;
        }
        let name = ast
            .name(node)
            .ok_or("for loop without a loop variable")?
            .to_string();
        let count = ast.child_count(node);
        if !(3..=4).contains(&count) {
            return Err(format!("for loop over `{}' with {} children", name, count));
        }
        let parent = ast.parent(node).ok_or("for loop at the tree root")?;

        let lo = literal_int(ast, ast.child(node, 0), &name)?;
        let hi = literal_int(ast, ast.child(node, 1), &name)?;
        let step = if count == 4 {
            literal_int(ast, ast.child(node, 2), &name)?
        } else {
            1
        };

        let body = ast.child(node, count - 1);
        ast.remove(node, body);

        // i = lo;
        let init = ast.assign(&name);
        let lo_const = ast.int_const(lo);
        ast.append(init, lo_const);

        let repeat_test = counter_test(ast, &name, hi);
        let do_stmt = ast.add(NodeKind::DoWhile);
        ast.append(do_stmt, repeat_test);
        ast.append(do_stmt, body);

        // i = i + step, as the body's final statement
        let increment = ast.assign(&name);
        let sum = ast.bin_op(Op::Add);
        let counter = ast.ident(&name);
        let step_const = ast.int_const(step);
        ast.append(sum, counter);
        ast.append(sum, step_const);
        ast.append(increment, sum);
        ast.append(body, increment);

        let guard = counter_test(ast, &name, hi);
        let if_stmt = ast.add(NodeKind::If);
        ast.append(if_stmt, guard);
        ast.append(if_stmt, do_stmt);

        let position = ast
            .position(parent, node)
            .expect("for loop detached from its parent");
        ast.insert(parent, init, position);
        ast.insert(parent, if_stmt, position + 1);
        ast.remove(parent, node);
        // The shell still owns the constant bounds; the body was handed off.
        ast.free(node);
        walk.skip_children();
    }
    Ok(())
}

fn counter_test(ast: &mut Ast, name: &str, hi: i64) -> NodeId {
    let test = ast.bin_op(Op::Lt);
    let counter = ast.ident(name);
    let bound = ast.int_const(hi);
    ast.append(test, counter);
    ast.append(test, bound);
    test
}

fn literal_int(ast: &Ast, id: NodeId, loop_name: &str) -> Result<i64, String> {
    if ast.kind(id) == NodeKind::Const {
        if let Some(value) = ast.node(id).payload.as_int() {
            return Ok(value);
        }
    }
    Err(format!(
        "for loop over `{}' with a non-literal bound",
        loop_name
    ))
}
