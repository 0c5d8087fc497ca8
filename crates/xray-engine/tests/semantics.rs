//! Instrumentation must be observationally equivalent to direct evaluation:
//! same results, same errors (kind, message, and position), same evaluation
//! order.

use pretty_assertions::assert_eq;
use xray_engine::{Engine, ErrorKind, ScriptError, Value};

fn engines(source: &str) -> (Engine, Engine) {
    let mut instrumented = Engine::new();
    instrumented
        .load_module("test.xr", source)
        .expect("load instrumented");
    let mut direct = Engine::new();
    direct
        .load_module_uninstrumented("test.xr", source)
        .expect("load direct");
    (instrumented, direct)
}

fn err_fingerprint(err: &ScriptError) -> (ErrorKind, String, usize, usize) {
    (err.kind, err.message.clone(), err.span.start, err.span.end)
}

fn assert_equivalent(source: &str, function: &str, args: &[Value]) -> Result<Value, ScriptError> {
    let (instrumented, direct) = engines(source);
    let lhs = instrumented.call(function, args);
    let rhs = direct.call(function, args);
    match (&lhs, &rhs) {
        (Ok(a), Ok(b)) => assert_eq!(a, b, "results diverge for {function}"),
        (Err(a), Err(b)) => {
            assert_eq!(
                err_fingerprint(a),
                err_fingerprint(b),
                "errors diverge for {function}"
            );
        }
        _ => panic!("instrumented {lhs:?} vs direct {rhs:?} for {function}"),
    }
    lhs
}

#[test]
fn arithmetic_and_precedence() {
    let source = "fn f(a, b) { return a * b + b % 3 - -a; }";
    let result = assert_equivalent(source, "f", &[Value::from(4), Value::from(7)]);
    assert_eq!(result.expect("value"), Value::Number(33.0));
}

#[test]
fn division_by_zero_raises_identically() {
    let source = "fn g(x) { return x * 2; }\nfn f(a, b) { return g(a) / (b - 5); }";
    let err = assert_equivalent(source, "f", &[Value::from(10), Value::from(5)])
        .expect_err("division by zero");
    assert_eq!(err.kind, ErrorKind::DivisionByZero);
    assert_eq!(err.message, "division by zero");
}

#[test]
fn operand_evaluation_order_is_preserved() {
    // `first()` must fail before `second()` is ever considered.
    let source = "\
        fn first() { return fail(\"first\"); }\n\
        fn second() { return fail(\"second\"); }\n\
        fn f() { return first() + second(); }";
    let err = assert_equivalent(source, "f", &[]).expect_err("first fails");
    assert_eq!(err.kind, ErrorKind::Explicit);
    assert_eq!(err.message, "first");
}

#[test]
fn short_circuit_returns_the_operand_value() {
    let source = "fn f(a, b) { return a || b; }\nfn g(a, b) { return a && b; }";
    assert_eq!(
        assert_equivalent(source, "f", &[Value::from(0), Value::from(5)]).expect("value"),
        Value::Number(5.0)
    );
    assert_eq!(
        assert_equivalent(source, "f", &[Value::from(2), Value::from(5)]).expect("value"),
        Value::Number(2.0)
    );
    assert_eq!(
        assert_equivalent(source, "g", &[Value::Bool(false), Value::from(5)]).expect("value"),
        Value::Bool(false)
    );
    assert_eq!(
        assert_equivalent(source, "g", &[Value::Bool(true), Value::from(5)]).expect("value"),
        Value::Number(5.0)
    );
}

#[test]
fn short_circuit_skips_the_right_operand_entirely() {
    // `undefined_call` does not exist; reaching it would raise.
    let source = "fn f(a) { return a && undefined_call(); }";
    let result = assert_equivalent(source, "f", &[Value::Bool(false)]);
    assert_eq!(result.expect("no call happens"), Value::Bool(false));

    let err = assert_equivalent(source, "f", &[Value::Bool(true)]).expect_err("call happens");
    assert_eq!(err.kind, ErrorKind::UndefinedFunction);
}

#[test]
fn loops_and_control_flow() {
    let source = "\
        fn sum(n) {\n\
            let total = 0;\n\
            let i = 0;\n\
            while i < n {\n\
                i = i + 1;\n\
                total = total + i;\n\
            }\n\
            return total;\n\
        }\n\
        fn pick(a) { if a > 10 { return \"big\"; } else if a > 5 { return \"mid\"; } return \"small\"; }";
    assert_eq!(
        assert_equivalent(source, "sum", &[Value::from(10)]).expect("value"),
        Value::Number(55.0)
    );
    assert_eq!(
        assert_equivalent(source, "pick", &[Value::from(7)]).expect("value"),
        Value::from("mid")
    );
    assert_eq!(
        assert_equivalent(source, "pick", &[Value::from(2)]).expect("value"),
        Value::from("small")
    );
}

#[test]
fn collections_fields_and_indexing() {
    let source = "\
        fn build(a) { return {name: \"row\", cells: [a, a * 2, a * 3]}; }\n\
        fn second_cell(a) { return build(a).cells[1]; }\n\
        fn missing(a) { return build(a).nope; }\n\
        fn out_of_range(a) { return build(a).cells[9]; }";
    assert_eq!(
        assert_equivalent(source, "second_cell", &[Value::from(3)]).expect("value"),
        Value::Number(6.0)
    );
    let err = assert_equivalent(source, "missing", &[Value::from(1)]).expect_err("unknown field");
    assert_eq!(err.kind, ErrorKind::UnknownField);
    let err =
        assert_equivalent(source, "out_of_range", &[Value::from(1)]).expect_err("out of bounds");
    assert_eq!(err.kind, ErrorKind::IndexOutOfBounds);
}

#[test]
fn undefined_names_and_assignment_rules() {
    let source = "fn f() { return nope + 1; }\nfn g() { ghost = 3; return ghost; }";
    let err = assert_equivalent(source, "f", &[]).expect_err("undefined name");
    assert_eq!(err.kind, ErrorKind::UndefinedName);
    let err = assert_equivalent(source, "g", &[]).expect_err("assign to undeclared");
    assert_eq!(err.kind, ErrorKind::UndefinedName);
}

#[test]
fn builtin_semantics_match() {
    let source = "\
        fn f(a) { return len(a) + min(3, 1, 2) + max(1, 2); }\n\
        fn s(a) { return str(a) + \"!\"; }\n\
        fn bad(a) { return abs(a, a); }";
    assert_eq!(
        assert_equivalent(source, "f", &[Value::from("abcd")]).expect("value"),
        Value::Number(7.0)
    );
    assert_eq!(
        assert_equivalent(source, "s", &[Value::from(12)]).expect("value"),
        Value::from("12!")
    );
    let err = assert_equivalent(source, "bad", &[Value::from(1)]).expect_err("arity");
    assert_eq!(err.kind, ErrorKind::ArityMismatch);
}

#[test]
fn type_mismatches_match() {
    let source = "fn f(a, b) { return a - b; }";
    let err = assert_equivalent(source, "f", &[Value::from("x"), Value::from(1)])
        .expect_err("type mismatch");
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[test]
fn runaway_recursion_stops_with_an_error_not_a_crash() {
    let source = "fn r(n) { return r(n + 1); }";
    let (instrumented, direct) = engines(source);
    let lhs = instrumented.call("r", &[Value::from(0)]).expect_err("limit");
    let rhs = direct.call("r", &[Value::from(0)]).expect_err("limit");
    assert_eq!(lhs.kind, ErrorKind::RecursionLimit);
    assert_eq!(rhs.kind, ErrorKind::RecursionLimit);
}

#[test]
fn function_arity_is_enforced() {
    let source = "fn f(a, b) { return a + b; }";
    let (instrumented, _) = engines(source);
    let err = instrumented
        .call("f", &[Value::from(1)])
        .expect_err("arity mismatch");
    assert_eq!(err.kind, ErrorKind::ArityMismatch);
}

#[test]
fn module_bodies_execute_top_level_statements() {
    let source = "fn dbl(x) { return x * 2; }\nlet a = dbl(21);\na;";
    let (instrumented, direct) = engines(source);
    assert_eq!(
        instrumented.run_module("test.xr").expect("module body"),
        direct.run_module("test.xr").expect("module body")
    );
}

#[test]
fn duplicate_functions_across_modules_are_rejected() {
    let mut engine = Engine::new();
    engine
        .load_module("a.xr", "fn f() { return 1; }")
        .expect("load a");
    let err = engine
        .load_module("b.xr", "fn f() { return 2; }")
        .expect_err("duplicate");
    assert!(matches!(
        err,
        xray_engine::LoadError::DuplicateFunction { .. }
    ));

    // Reloading the same module replaces it instead.
    engine
        .load_module("a.xr", "fn f() { return 3; }")
        .expect("reload a");
    assert_eq!(engine.call("f", &[]).expect("value"), Value::Number(3.0));

    assert!(engine.unload_module("a.xr"));
    let err = engine.call("f", &[]).expect_err("gone");
    assert_eq!(err.kind, ErrorKind::UndefinedFunction);
}
