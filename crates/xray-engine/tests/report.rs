//! Report rendering: the end-to-end scenarios, format details, ordering,
//! truncation, and graceful degradation.

use pretty_assertions::assert_eq;
use xray_engine::report::frame_tree;
use xray_engine::{ColorMode, Engine, ErrorKind, FrameOrder, ReportConfig, Value};

const DEMO: &str = "fn g(x) { return x * 2; }\nfn f(a, b) { return g(a) / (b - 5); }";

fn demo_engine() -> Engine {
    let mut engine = Engine::new();
    engine.load_module("demo.xr", DEMO).expect("load");
    engine
}

#[test]
fn division_by_zero_report_matches_byte_for_byte() {
    let engine = demo_engine();
    let err = engine
        .call("f", &[Value::from(10), Value::from(5)])
        .expect_err("division by zero");

    let underline = format!("  | {}^{}\n", " ".repeat(20), "~".repeat(13));
    let expected = format!(
        concat!(
            "Frame #1: demo.xr:2 in f\n",
            "\n",
            "line 2, cols 21-34\n",
            "1 | fn g(x) {{ return x * 2; }}\n",
            "2 | fn f(a, b) {{ return g(a) / (b - 5); }}\n",
            "{underline}",
            "\n",
            "`-- g(a) / (b - 5) = unreached\n",
            "    |-- g(a) = 20\n",
            "    |   `-- a = 10\n",
            "    `-- b - 5 = 0\n",
            "        `-- b = 5\n",
            "\n",
            "DivisionByZero: division by zero\n",
        ),
        underline = underline
    );
    assert_eq!(engine.diagnose(&err), expected);
}

#[test]
fn rendering_is_idempotent() {
    let engine = demo_engine();
    let err = engine
        .call("f", &[Value::from(10), Value::from(5)])
        .expect_err("division by zero");
    assert_eq!(engine.diagnose(&err), engine.diagnose(&err));
}

#[test]
fn tree_shape_mirrors_reached_bindings() {
    let engine = demo_engine();
    let err = engine
        .call("f", &[Value::from(10), Value::from(5)])
        .expect_err("division by zero");

    let tree = frame_tree(&err.frames[0]).expect("tree");
    // Five bound sub-expressions: the division, g(a), a, (b - 5), b.
    assert_eq!(tree.size(), 5);
    // Four were reached; the division itself failed before recording.
    assert_eq!(err.frames[0].slice.as_ref().expect("slice").reached_count(), 4);
    assert_eq!(tree.value, None);
    assert_eq!(tree.children.len(), 2);
    assert_eq!(tree.children[0].text, "g(a)");
    assert_eq!(tree.children[1].text, "b - 5");
    assert_eq!(
        tree.find("g(a)").and_then(|n| n.value.clone()),
        Some(Value::Number(20.0))
    );
    assert_eq!(
        tree.find("b").and_then(|n| n.value.clone()),
        Some(Value::Number(5.0))
    );
}

#[test]
fn short_circuit_fidelity_in_reports() {
    let source = "\
        fn two() { return 2; }\n\
        fn boom() { return fail(\"later\"); }\n\
        fn h(a) { return (a && two()) + boom(); }";
    let mut engine = Engine::new();
    engine.load_module("sc.xr", source).expect("load");

    // Falsy left: the right operand is never evaluated.
    let err = engine
        .call("h", &[Value::Bool(false)])
        .expect_err("boom fails");
    let report = engine.diagnose(&err);
    assert!(report.contains("a = false"), "missing left operand:\n{report}");
    assert!(
        report.contains("two() = unreached"),
        "short-circuited call must be unreached:\n{report}"
    );
    assert!(
        report.contains("a && two() = false"),
        "operator result missing:\n{report}"
    );

    // Truthy left: both operands populated.
    let err = engine
        .call("h", &[Value::Bool(true)])
        .expect_err("boom fails");
    let report = engine.diagnose(&err);
    assert!(report.contains("two() = 2"), "call not populated:\n{report}");
}

#[test]
fn nested_failures_render_one_frame_per_invocation() {
    let source = "fn inner(x) { return 10 / x; }\nfn outer(a) { return inner(a - 2) + 1; }";
    let mut engine = Engine::new();
    engine.load_module("nested.xr", source).expect("load");
    let err = engine.call("outer", &[Value::from(2)]).expect_err("inner fails");
    assert_eq!(err.frames.len(), 2);

    let report = engine.diagnose(&err);
    assert!(report.contains("Frame #1: nested.xr:1 in inner"), "{report}");
    assert!(report.contains("Frame #2: nested.xr:2 in outer"), "{report}");
    assert!(report.contains(&"-".repeat(70)), "missing frame rule:\n{report}");
    assert!(report.contains("x = 0"), "{report}");
    assert!(report.contains("a - 2 = 0"), "{report}");
    assert!(report.contains("inner(a - 2) = unreached"), "{report}");

    let outermost_first = Engine::with_config(ReportConfig {
        frame_order: FrameOrder::OutermostFirst,
        ..ReportConfig::default()
    });
    let report = outermost_first.diagnose(&err);
    assert!(report.contains("Frame #1: nested.xr:2 in outer"), "{report}");
    assert!(report.contains("Frame #2: nested.xr:1 in inner"), "{report}");
}

#[test]
fn original_error_is_never_altered_by_diagnosis() {
    let engine = demo_engine();
    let err = engine
        .call("f", &[Value::from(10), Value::from(5)])
        .expect_err("division by zero");
    let kind = err.kind;
    let message = err.message.clone();
    let span = err.span;

    let _ = engine.diagnose(&err);
    let _ = engine.diagnose(&err);
    assert_eq!(err.kind, kind);
    assert_eq!(err.message, message);
    assert_eq!(err.span, span);
}

#[test]
fn uninstrumented_frames_render_location_only() {
    // Pathological nesting disables instrumentation for this unit; it still
    // runs (directly) and still reports, just without a value tree.
    let negs = "!".repeat(80);
    let source = format!("fn deep(a) {{ return {negs}(1 / 0); }}");
    let mut engine = Engine::new();
    engine.load_module("deep.xr", &source).expect("load");

    let err = engine.call("deep", &[Value::from(1)]).expect_err("div by zero");
    assert_eq!(err.kind, ErrorKind::DivisionByZero);
    assert!(err.frames[0].map.is_none());

    let report = engine.diagnose(&err);
    assert!(report.contains("Frame #1: deep.xr:1 in deep"), "{report}");
    assert!(!report.contains("`--"), "no tree for uninstrumented frames:\n{report}");
    assert!(report.contains("DivisionByZero: division by zero"), "{report}");
}

#[test]
fn value_previews_respect_the_length_budget() {
    let source = "fn t(a) { return [a, a, a, a, a, a, a] + 0; }";
    let mut engine = Engine::with_config(ReportConfig {
        max_value_len: 16,
        ..ReportConfig::default()
    });
    engine.load_module("t.xr", source).expect("load");
    let err = engine
        .call("t", &[Value::from("abcdefghij")])
        .expect_err("cannot add list and number");
    let report = engine.diagnose(&err);
    assert!(report.contains("+4 more]"), "expected sampled list:\n{report}");
}

#[test]
fn context_lines_are_configurable() {
    let mut engine = Engine::with_config(ReportConfig {
        context_lines: 0,
        ..ReportConfig::default()
    });
    engine.load_module("demo.xr", DEMO).expect("load");
    let err = engine
        .call("f", &[Value::from(10), Value::from(5)])
        .expect_err("division by zero");
    let report = engine.diagnose(&err);
    assert!(!report.contains("1 | fn g"), "context should be absent:\n{report}");
    assert!(report.contains("2 | fn f"), "failing line must stay:\n{report}");
}

#[test]
fn color_mode_always_emits_ansi() {
    let mut engine = Engine::with_config(ReportConfig {
        color: ColorMode::Always,
        ..ReportConfig::default()
    });
    engine.load_module("demo.xr", DEMO).expect("load");
    let err = engine
        .call("f", &[Value::from(10), Value::from(5)])
        .expect_err("division by zero");
    let report = engine.diagnose(&err);
    assert!(report.contains("\x1b["), "{report}");

    let plain = demo_engine();
    assert!(!plain.diagnose(&err).contains("\x1b["));
}

#[test]
fn trees_serialize_for_host_boundaries() {
    let engine = demo_engine();
    let err = engine
        .call("f", &[Value::from(10), Value::from(5)])
        .expect_err("division by zero");
    let tree = frame_tree(&err.frames[0]).expect("tree");
    let json = serde_json::to_string(&tree).expect("serialize");
    assert!(json.contains("\"text\":\"g(a)\""), "{json}");
    assert!(json.contains("\"value\":null"), "{json}");
}

#[test]
fn frameless_errors_still_render() {
    let engine = demo_engine();
    let err = engine.call("nope", &[]).expect_err("unknown function");
    assert!(err.frames.is_empty());
    let report = engine.diagnose(&err);
    assert!(report.contains("UndefinedFunction: undefined function `nope`"));
}
