use civicc::ast::{Ast, DataType, NodeId, NodeKind, Op, Payload, BODY_FUNCS, BODY_STMTS, BODY_VARS};
use civicc::phases::ContextAnalysis;
use civicc::scope::{scope_level, Frame};
use civicc::CompilerError;

fn function(ast: &mut Ast, root: NodeId, name: &str, return_type: DataType) -> (NodeId, NodeId) {
    let head = ast.add_with(
        NodeKind::FnHead,
        return_type,
        Payload::Name(name.to_string()),
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
    (head, body)
}

fn param(ast: &mut Ast, head: NodeId, name: &str, data_type: DataType) -> NodeId {
    let node = ast.add_with(NodeKind::Param, data_type, Payload::Name(name.to_string()));
    let params = ast.child(head, 0);
    ast.append(params, node);
    node
}

fn local(ast: &mut Ast, body: NodeId, name: &str, data_type: DataType) -> NodeId {
    let declaration = ast.var_dec(name, data_type);
    let vars = ast.body_block(body, BODY_VARS).unwrap();
    ast.append(vars, declaration);
    declaration
}

fn assign_sum(ast: &mut Ast, body: NodeId, target: &str, lhs: i64, rhs: i64) -> NodeId {
    let assignment = ast.assign(target);
    let sum = ast.bin_op(Op::Add);
    let left = ast.int_const(lhs);
    let right = ast.int_const(rhs);
    ast.append(sum, left);
    ast.append(sum, right);
    ast.append(assignment, sum);
    let stmts = ast.body_block(body, BODY_STMTS).unwrap();
    ast.append(stmts, assignment);
    assignment
}

fn call(ast: &mut Ast, body: NodeId, callee: &str, args: &[i64]) -> NodeId {
    let node = ast.add_with(
        NodeKind::Call,
        DataType::Unknown,
        Payload::Name(callee.to_string()),
    );
    for &value in args {
        let arg = ast.int_const(value);
        ast.append(node, arg);
    }
    let stmts = ast.body_block(body, BODY_STMTS).unwrap();
    ast.append(stmts, node);
    node
}

fn messages(analysis: &ContextAnalysis) -> Vec<String> {
    analysis
        .diagnostics()
        .iter()
        .map(|d| d.message.clone())
        .collect()
}

#[test]
fn scope_levels_count_enclosing_blocks() {
    let mut ast = Ast::new();
    let root = ast.block();
    let global = ast.var_dec("g", DataType::Int);
    ast.append(root, global);
    let (_, body) = function(&mut ast, root, "main", DataType::Int);
    let vars = ast.body_block(body, BODY_VARS).unwrap();
    let stmts = ast.body_block(body, BODY_STMTS).unwrap();
    let assignment = ast.assign("x");
    let one = ast.int_const(1);
    ast.append(assignment, one);
    ast.append(stmts, assignment);

    assert_eq!(scope_level(&ast, global), 0);
    assert_eq!(scope_level(&ast, vars), 1);
    assert_eq!(scope_level(&ast, assignment), 1);

    // A declared return value counts one level deeper than the body blocks
    // it sits beside.
    let returned = ast.int_const(0);
    ast.append(body, returned);
    assert_eq!(scope_level(&ast, returned), 1);
}

#[test]
fn frame_lookup_is_newest_first() {
    let mut ast = Ast::new();
    let older = ast.var_dec("x", DataType::Int);
    let newer = ast.var_dec("x", DataType::Float);
    let mut frame = Frame::new();
    frame.push(older);
    frame.push(newer);
    assert_eq!(frame.lookup(&ast, "x"), Some(newer));
    assert_eq!(frame.lookup(&ast, "y"), None);
}

#[test]
fn shadowing_an_outer_declaration_is_legal() {
    let mut ast = Ast::new();
    let root = ast.block();
    let global = ast.var_dec("x", DataType::Float);
    ast.append(root, global);
    let (_, body) = function(&mut ast, root, "main", DataType::Int);
    local(&mut ast, body, "x", DataType::Int);
    assign_sum(&mut ast, body, "x", 1, 2);

    let mut analysis = ContextAnalysis::new();
    analysis.run(&mut ast, root).unwrap();
    assert!(analysis.diagnostics().is_empty());
}

#[test]
fn same_stage_redeclaration_is_rejected() {
    let mut ast = Ast::new();
    let root = ast.block();
    let (_, body) = function(&mut ast, root, "main", DataType::Int);
    local(&mut ast, body, "x", DataType::Int);
    local(&mut ast, body, "x", DataType::Float);

    let mut analysis = ContextAnalysis::new();
    let result = analysis.run(&mut ast, root);
    assert!(matches!(result, Err(CompilerError::Analysis(_))));
    assert_eq!(messages(&analysis), vec!["redeclaration of variable `x'"]);
}

#[test]
fn parameters_and_locals_collide_across_stages_silently() {
    // A local may shadow a parameter: the stages are checked independently.
    let mut ast = Ast::new();
    let root = ast.block();
    let (head, body) = function(&mut ast, root, "main", DataType::Int);
    param(&mut ast, head, "x", DataType::Float);
    local(&mut ast, body, "x", DataType::Int);
    assign_sum(&mut ast, body, "x", 1, 2);

    let mut analysis = ContextAnalysis::new();
    analysis.run(&mut ast, root).unwrap();
    assert!(analysis.diagnostics().is_empty());
}

#[test]
fn int_arithmetic_assignment_passes() {
    let mut ast = Ast::new();
    let root = ast.block();
    let (_, body) = function(&mut ast, root, "main", DataType::Int);
    local(&mut ast, body, "x", DataType::Int);
    assign_sum(&mut ast, body, "x", 1, 2);

    let mut analysis = ContextAnalysis::new();
    analysis.run(&mut ast, root).unwrap();
}

#[test]
fn float_target_rejects_int_expression() {
    let mut ast = Ast::new();
    let root = ast.block();
    let (_, body) = function(&mut ast, root, "main", DataType::Int);
    local(&mut ast, body, "x", DataType::Float);
    assign_sum(&mut ast, body, "x", 1, 2);

    let mut analysis = ContextAnalysis::new();
    let result = analysis.run(&mut ast, root);
    assert!(result.is_err());
    assert_eq!(
        messages(&analysis),
        vec!["data type mismatch: `x' is of type `float' but is assigned a value of type `int'"]
    );
}

#[test]
fn bool_is_not_a_binop_operand() {
    let mut ast = Ast::new();
    let root = ast.block();
    let (_, body) = function(&mut ast, root, "main", DataType::Int);
    local(&mut ast, body, "b", DataType::Bool);
    local(&mut ast, body, "x", DataType::Int);

    let assignment = ast.assign("x");
    let sum = ast.bin_op(Op::Add);
    let lhs = ast.ident("b");
    let rhs = ast.int_const(1);
    ast.append(sum, lhs);
    ast.append(sum, rhs);
    ast.append(assignment, sum);
    let stmts = ast.body_block(body, BODY_STMTS).unwrap();
    ast.append(stmts, assignment);

    let mut analysis = ContextAnalysis::new();
    let result = analysis.run(&mut ast, root);
    assert!(result.is_err());
    let reported = messages(&analysis);
    assert_eq!(reported[0], "type mismatch: `bool' and `int'");
    // The failed operand also fails the assignment itself.
    assert_eq!(
        reported[1],
        "data type mismatch: `x' is of type `int' but is assigned a value of type `?'"
    );
}

#[test]
fn call_arity_is_checked_both_ways() {
    let mut ast = Ast::new();
    let root = ast.block();
    let (helper_head, _) = function(&mut ast, root, "helper", DataType::Void);
    param(&mut ast, helper_head, "n", DataType::Int);
    let (_, main_body) = function(&mut ast, root, "main", DataType::Int);

    call(&mut ast, main_body, "helper", &[1, 2]);
    let mut analysis = ContextAnalysis::new();
    assert!(analysis.run(&mut ast, root).is_err());
    assert_eq!(messages(&analysis), vec!["too many arguments in call to `helper'"]);

    let stmts = ast.body_block(main_body, BODY_STMTS).unwrap();
    let extra = ast.child(stmts, 0);
    ast.remove(stmts, extra);
    ast.free(extra);
    call(&mut ast, main_body, "helper", &[]);
    let mut analysis = ContextAnalysis::new();
    assert!(analysis.run(&mut ast, root).is_err());
    assert_eq!(
        messages(&analysis),
        vec!["not enough arguments in call to `helper'"]
    );
}

#[test]
fn argument_types_are_checked_pairwise() {
    let mut ast = Ast::new();
    let root = ast.block();
    let (helper_head, _) = function(&mut ast, root, "helper", DataType::Void);
    param(&mut ast, helper_head, "n", DataType::Int);
    param(&mut ast, helper_head, "f", DataType::Float);
    let (_, main_body) = function(&mut ast, root, "main", DataType::Int);

    let node = ast.add_with(
        NodeKind::Call,
        DataType::Unknown,
        Payload::Name("helper".to_string()),
    );
    let first = ast.int_const(1);
    let second = ast.int_const(2);
    ast.append(node, first);
    ast.append(node, second);
    let stmts = ast.body_block(main_body, BODY_STMTS).unwrap();
    ast.append(stmts, node);

    let mut analysis = ContextAnalysis::new();
    assert!(analysis.run(&mut ast, root).is_err());
    assert_eq!(
        messages(&analysis),
        vec![
            "argument type mismatch in call to `helper': \
             argument 2 is of type `int' but should be of type `float'"
        ]
    );
}

#[test]
fn calling_a_variable_is_invalid() {
    let mut ast = Ast::new();
    let root = ast.block();
    let global = ast.var_dec("x", DataType::Int);
    ast.append(root, global);
    let (_, main_body) = function(&mut ast, root, "main", DataType::Int);
    call(&mut ast, main_body, "x", &[]);

    let mut analysis = ContextAnalysis::new();
    assert!(analysis.run(&mut ast, root).is_err());
    assert_eq!(messages(&analysis), vec!["invalid callee `x'"]);
}

#[test]
fn assigning_to_a_function_is_invalid() {
    let mut ast = Ast::new();
    let root = ast.block();
    function(&mut ast, root, "helper", DataType::Void);
    let (_, main_body) = function(&mut ast, root, "main", DataType::Int);
    assign_sum(&mut ast, main_body, "helper", 1, 2);

    let mut analysis = ContextAnalysis::new();
    assert!(analysis.run(&mut ast, root).is_err());
    assert_eq!(
        messages(&analysis),
        vec!["invalid assignment target `helper'"]
    );
}

#[test]
fn unresolved_identifiers_are_reported_once_with_context() {
    let mut ast = Ast::new();
    let root = ast.block();
    let (_, main_body) = function(&mut ast, root, "main", DataType::Int);
    assign_sum(&mut ast, main_body, "ghost", 1, 2);

    let mut analysis = ContextAnalysis::new();
    assert!(analysis.run(&mut ast, root).is_err());
    let diagnostics = analysis.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].to_string(),
        "error: missing definition of identifier: `ghost' in: `int main'."
    );
}

#[test]
fn global_diagnostics_render_without_a_function() {
    let mut ast = Ast::new();
    let root = ast.block();
    let first = ast.var_dec("x", DataType::Int);
    let second = ast.var_dec("x", DataType::Float);
    ast.append(root, first);
    ast.append(root, second);

    let mut analysis = ContextAnalysis::new();
    assert!(analysis.run(&mut ast, root).is_err());
    assert_eq!(
        analysis.diagnostics()[0].to_string(),
        "error: redeclaration of variable `x' in global scope."
    );
}

#[test]
fn return_expression_must_match_the_declared_type() {
    let mut ast = Ast::new();
    let root = ast.block();
    let (_, body) = function(&mut ast, root, "main", DataType::Int);
    let returned = ast.float_const(1.5);
    ast.append(body, returned);

    let mut analysis = ContextAnalysis::new();
    assert!(analysis.run(&mut ast, root).is_err());
    assert_eq!(
        messages(&analysis),
        vec!["return type mismatch: `main' is declared `int' but returns `float'"]
    );

    // Matching types pass.
    let mut ast = Ast::new();
    let root = ast.block();
    let (_, body) = function(&mut ast, root, "main", DataType::Int);
    let returned = ast.int_const(0);
    ast.append(body, returned);
    let mut analysis = ContextAnalysis::new();
    analysis.run(&mut ast, root).unwrap();
}

#[test]
fn unary_operators_constrain_their_operand() {
    let mut ast = Ast::new();
    let root = ast.block();
    let (_, body) = function(&mut ast, root, "main", DataType::Int);
    local(&mut ast, body, "b", DataType::Bool);
    local(&mut ast, body, "x", DataType::Int);

    // b = !b; is fine, x = -b; is not.
    let stmts = ast.body_block(body, BODY_STMTS).unwrap();
    let ok = ast.assign("b");
    let not = ast.unary_op(Op::Not);
    let flag = ast.ident("b");
    ast.append(not, flag);
    ast.append(ok, not);
    ast.append(stmts, ok);

    let bad = ast.assign("x");
    let neg = ast.unary_op(Op::Neg);
    let flag = ast.ident("b");
    ast.append(neg, flag);
    ast.append(bad, neg);
    ast.append(stmts, bad);

    let mut analysis = ContextAnalysis::new();
    assert!(analysis.run(&mut ast, root).is_err());
    let reported = messages(&analysis);
    assert_eq!(reported[0], "type mismatch: `bool' operand of `-'");
}

#[test]
fn casts_take_their_target_type() {
    let mut ast = Ast::new();
    let root = ast.block();
    let (_, body) = function(&mut ast, root, "main", DataType::Int);
    local(&mut ast, body, "x", DataType::Int);

    // x = (int) 1.5;
    let assignment = ast.assign("x");
    let cast = ast.add_with(NodeKind::Cast, DataType::Int, Payload::None);
    let value = ast.float_const(1.5);
    ast.append(cast, value);
    ast.append(assignment, cast);
    let stmts = ast.body_block(body, BODY_STMTS).unwrap();
    ast.append(stmts, assignment);

    let mut analysis = ContextAnalysis::new();
    analysis.run(&mut ast, root).unwrap();
}

#[test]
fn calls_in_expressions_take_the_declared_return_type() {
    let mut ast = Ast::new();
    let root = ast.block();
    function(&mut ast, root, "answer", DataType::Int);
    let (_, main_body) = function(&mut ast, root, "main", DataType::Int);
    local(&mut ast, main_body, "x", DataType::Int);

    // x = answer();
    let assignment = ast.assign("x");
    let node = ast.add_with(
        NodeKind::Call,
        DataType::Unknown,
        Payload::Name("answer".to_string()),
    );
    ast.append(assignment, node);
    let stmts = ast.body_block(main_body, BODY_STMTS).unwrap();
    ast.append(stmts, assignment);

    let mut analysis = ContextAnalysis::new();
    analysis.run(&mut ast, root).unwrap();
}

#[test]
fn nested_functions_resolve_and_shadow() {
    let mut ast = Ast::new();
    let root = ast.block();
    let (_, outer_body) = function(&mut ast, root, "outer", DataType::Int);
    local(&mut ast, outer_body, "x", DataType::Int);

    // A nested function living in the Funcs block sees and shadows the
    // enclosing scope.
    let funcs = ast.body_block(outer_body, BODY_FUNCS).unwrap();
    let inner_head = ast.add_with(
        NodeKind::FnHead,
        DataType::Void,
        Payload::Name("inner".to_string()),
    );
    let inner_params = ast.block();
    ast.append(inner_head, inner_params);
    let inner_body = ast.add(NodeKind::FnBody);
    for _ in 0..3 {
        let block = ast.block();
        ast.append(inner_body, block);
    }
    ast.append(inner_head, inner_body);
    ast.append(funcs, inner_head);

    local(&mut ast, inner_body, "x", DataType::Float);
    let assignment = ast.assign("x");
    let value = ast.float_const(2.5);
    ast.append(assignment, value);
    let inner_stmts = ast.body_block(inner_body, BODY_STMTS).unwrap();
    ast.append(inner_stmts, assignment);

    let mut analysis = ContextAnalysis::new();
    analysis.run(&mut ast, root).unwrap();
    assert!(analysis.diagnostics().is_empty());
}
