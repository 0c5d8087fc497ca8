//! Load a script, install the global failure hook, and let a division by
//! zero print a full expression-level report to stderr.

use xray_engine::{Engine, Value};

const SOURCE: &str = "\
fn g(x) {
    return x * 2;
}

fn f(a, b) {
    return g(a) / (b - 5);
}
";

fn main() {
    let mut engine = Engine::new();
    engine.load_module("demo.xr", SOURCE).expect("load demo module");
    engine.install_hooks();

    match engine.call_reported("f", &[Value::from(10), Value::from(5)]) {
        Ok(value) => println!("f(10, 5) = {value}"),
        Err(err) => println!("f(10, 5) failed: {err}"),
    }
}
