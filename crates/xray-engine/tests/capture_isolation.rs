//! Capture slices are owned by exactly one invocation: concurrent calls
//! never cross-contaminate, and every slice is released when its invocation
//! ends, whether it returned normally, failed, or was abandoned.

use std::sync::Arc;

use xray_engine::{BindingId, Engine, ErrorKind, Value};

const WORK: &str = "fn work(a, b) { return a * 2 / (b - 5); }";

#[test]
fn concurrent_invocations_keep_independent_slices() {
    let mut engine = Engine::new();
    engine.load_module("work.xr", WORK).expect("load");
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                let a = Value::Number(i as f64 + 1.0);
                let err = engine
                    .call("work", &[a, Value::Number(5.0)])
                    .expect_err("division by zero");
                (i, engine.diagnose(&err))
            })
        })
        .collect();

    for handle in handles {
        let (i, report) = handle.join().expect("thread");
        let doubled = (i + 1) * 2;
        // Each report carries its own invocation's values, nobody else's.
        assert!(
            report.contains(&format!("a * 2 = {doubled}")),
            "report for thread {i} lost its own capture:\n{report}"
        );
        for other in 0..8 {
            if other != i {
                let foreign = (other + 1) * 2;
                assert!(
                    !report.contains(&format!("a * 2 = {foreign}")),
                    "report for thread {i} shows thread {other}'s value:\n{report}"
                );
            }
        }
    }

    assert_eq!(engine.active_invocations(), 0);
}

#[test]
fn successful_calls_release_their_slices() {
    let mut engine = Engine::new();
    engine.load_module("work.xr", WORK).expect("load");
    for i in 0..100 {
        engine
            .call("work", &[Value::from(i), Value::from(i + 6)])
            .expect("no error");
    }
    assert_eq!(engine.active_invocations(), 0);
}

#[test]
fn failing_calls_move_slices_into_the_error() {
    let mut engine = Engine::new();
    engine.load_module("work.xr", WORK).expect("load");
    let err = engine
        .call("work", &[Value::from(3), Value::from(5)])
        .expect_err("division by zero");

    // Evicted from the store the moment the invocation unwound...
    assert_eq!(engine.active_invocations(), 0);
    // ...but still readable for report generation.
    let frame = &err.frames[0];
    let slice = frame.slice.as_ref().expect("slice");
    assert!(slice.reached_count() > 0);
}

#[test]
fn loop_bindings_keep_only_the_last_value() {
    let source = "\
        fn spin(n) {\n\
            let i = 0;\n\
            while i < n {\n\
                i = i + 1;\n\
            }\n\
            return i / 0;\n\
        }";
    let mut engine = Engine::new();
    engine.load_module("spin.xr", source).expect("load");
    let err = engine
        .call("spin", &[Value::from(3)])
        .expect_err("division by zero");
    assert_eq!(err.kind, ErrorKind::DivisionByZero);

    let frame = &err.frames[0];
    let map = frame.map.as_ref().expect("binding map");
    let slice = frame.slice.as_ref().expect("slice");
    let source_text = &frame.source.text;

    // The condition `i < n` ran four times; only the final (false) value
    // survives. Its `i` operand holds the last iteration's 3.
    let mut checked = 0;
    for (id, binding) in map.iter() {
        let text = &source_text[binding.span.start..binding.span.end];
        if text == "i < n" {
            assert_eq!(slice.get(id), Some(&Value::Bool(false)));
            checked += 1;
        }
        if text == "i + 1" {
            assert_eq!(slice.get(id), Some(&Value::Number(3.0)));
            checked += 1;
        }
    }
    assert_eq!(checked, 2, "expected to find the loop bindings");
}

#[test]
fn snapshot_reads_do_not_leak_across_invocations() {
    let store = xray_engine::capture::CaptureStore::new();
    let a = store.begin(2);
    let b = store.begin(2);
    store.record(a, BindingId(0), Value::from(1));
    store.record(b, BindingId(0), Value::from(2));

    let snap_a = store.snapshot(a).expect("snapshot a");
    let snap_b = store.snapshot(b).expect("snapshot b");
    assert_eq!(snap_a.get(BindingId(0)), Some(&Value::Number(1.0)));
    assert_eq!(snap_b.get(BindingId(0)), Some(&Value::Number(2.0)));

    store.discard(a);
    store.discard(b);
    assert_eq!(store.active(), 0);
}
