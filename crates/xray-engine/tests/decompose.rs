use pretty_assertions::assert_eq;
use xray_engine::ast::FnDecl;
use xray_engine::decompose::{decompose_unit, AtomicOp, DStmt, DecomposedUnit};
use xray_engine::parser::parse_module;
use xray_engine::{BinaryOp, BindingId, DecomposeError, NodeKind};

fn decompose_fn(source: &str) -> DecomposedUnit {
    let unit = try_decompose_fn(source);
    unit.expect("decomposition should succeed")
}

fn try_decompose_fn(source: &str) -> Result<DecomposedUnit, DecomposeError> {
    let module = parse_module(source).expect("parse");
    let decl: &FnDecl = &module.functions[0];
    decompose_unit(&decl.body)
}

fn span_text<'a>(source: &'a str, unit: &DecomposedUnit, id: BindingId) -> &'a str {
    let binding = unit.map.get(id).expect("binding");
    &source[binding.span.start..binding.span.end]
}

#[test]
fn bindings_follow_post_order_with_source_ordered_operands() {
    let source = "fn f(a, b) { return g(a) / (b - 5); }";
    let unit = decompose_fn(source);

    assert_eq!(unit.map.len(), 5);
    assert_eq!(span_text(source, &unit, BindingId(0)), "a");
    assert_eq!(span_text(source, &unit, BindingId(1)), "g(a)");
    assert_eq!(span_text(source, &unit, BindingId(2)), "b");
    assert_eq!(span_text(source, &unit, BindingId(3)), "(b - 5)");
    assert_eq!(span_text(source, &unit, BindingId(4)), "g(a) / (b - 5)");

    let root = unit.map.get(BindingId(4)).expect("root binding");
    assert_eq!(root.kind, NodeKind::Binary { op: BinaryOp::Div });
    assert_eq!(root.operands.as_slice(), &[BindingId(1), BindingId(3)]);
    assert_eq!(unit.map.roots(), &[BindingId(4)]);

    let call = unit.map.get(BindingId(1)).expect("call binding");
    assert_eq!(
        call.kind,
        NodeKind::Call {
            callee: "g".to_string()
        }
    );
    assert_eq!(call.operands.as_slice(), &[BindingId(0)]);
}

#[test]
fn decomposition_is_deterministic() {
    let source = "fn f(a, b, c) { let x = a * b + len(c); return x % (a || b); }";
    let first = decompose_fn(source);
    let second = decompose_fn(source);
    assert_eq!(first.map, second.map);
    assert_eq!(first.body, second.body);
}

#[test]
fn atomic_statements_are_left_unbound() {
    let unit = decompose_fn("fn f(a) { let x = a; let y = 5; return y; }");
    assert!(unit.map.is_empty());
    assert!(unit.map.roots().is_empty());
}

#[test]
fn scalar_literal_operands_are_not_bound() {
    let source = "fn f(b) { return b - 5; }";
    let unit = decompose_fn(source);
    // `b` and `b - 5` are bound; the literal `5` is not.
    assert_eq!(unit.map.len(), 2);
    let root = unit.map.get(BindingId(1)).expect("root");
    assert_eq!(root.operands.as_slice(), &[BindingId(0)]);
}

#[test]
fn short_circuit_operands_are_conditionally_wrapped() {
    let source = "fn f(a, b) { return a && g(b); }";
    let unit = decompose_fn(source);

    // Post-order: a, b, g(b), then the `&&` node.
    assert_eq!(unit.map.len(), 4);
    let sc = unit.map.get(BindingId(3)).expect("sc binding");
    assert_eq!(sc.kind, NodeKind::Binary { op: BinaryOp::And });
    assert_eq!(sc.operands.as_slice(), &[BindingId(0), BindingId(2)]);

    // The right operand's steps live inside the conditional step, not the
    // statement prelude: they must not run when `a` is falsy.
    let DStmt::Return { prelude, .. } = &unit.body[0] else {
        panic!("expected return statement");
    };
    assert_eq!(prelude.len(), 2);
    let AtomicOp::ShortCircuit { op, right, .. } = &prelude[1].op else {
        panic!("expected short-circuit step, got {:?}", prelude[1].op);
    };
    assert_eq!(*op, BinaryOp::And);
    assert_eq!(right.len(), 2);
}

#[test]
fn collection_literals_bind_with_decomposed_children() {
    let source = "fn f(a) { return [a + 1, 2]; }";
    let unit = decompose_fn(source);
    // a, a + 1, and the list literal; the scalar `2` stays unbound.
    assert_eq!(unit.map.len(), 3);
    let list = unit.map.get(BindingId(2)).expect("list binding");
    assert_eq!(list.kind, NodeKind::Literal);
    assert_eq!(list.operands.as_slice(), &[BindingId(1)]);
}

#[test]
fn condition_expressions_become_statement_roots() {
    let source = "fn f(a) { while a > 0 { a = a - 1; } return a; }";
    let unit = decompose_fn(source);
    // Roots: the while condition and the assignment value.
    assert_eq!(unit.map.roots().len(), 2);
    let cond_root = unit.map.roots()[0];
    assert_eq!(span_text(source, &unit, cond_root), "a > 0");
}

#[test]
fn pathological_nesting_fails_decomposition_not_the_host() {
    let negs = "!".repeat(80);
    let source = format!("fn f(a) {{ return {negs}a; }}");
    let err = try_decompose_fn(&source).expect_err("too deep");
    assert!(matches!(err, DecomposeError::ExpressionTooDeep { .. }));
}
