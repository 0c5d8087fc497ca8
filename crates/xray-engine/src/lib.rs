#![forbid(unsafe_code)]
#![deny(unreachable_patterns)]

//! Expression-level failure diagnosis for an embedded script language.
//!
//! The engine rewrites every compound expression in a loaded script into a
//! sequence of atomic bound steps ([`decompose`]), records the last value
//! each step produced during a call ([`capture`]), and, when an error
//! escapes, renders, per unwound frame, the surrounding source with the
//! failing span underlined and a tree of every evaluated sub-expression and
//! its value ([`report`]).
//!
//! Instrumentation is observationally transparent: results, errors, and
//! side-effect order are identical to running the original source, and the
//! original error always propagates unchanged in kind, message, and
//! position.
//!
//! ```
//! use xray_engine::{Engine, Value};
//!
//! let mut engine = Engine::new();
//! engine
//!     .load_module(
//!         "demo.xr",
//!         "fn g(x) { return x * 2; }\n\
//!          fn f(a, b) { return g(a) / (b - 5); }\n",
//!     )
//!     .expect("load");
//!
//! match engine.call("f", &[Value::from(10), Value::from(5)]) {
//!     Ok(_) => unreachable!("f(10, 5) divides by zero"),
//!     Err(err) => {
//!         let report = engine.diagnose(&err);
//!         assert!(report.contains("g(a) = 20"));
//!         assert!(report.contains("b - 5 = 0"));
//!     }
//! }
//! ```

pub mod ast;
pub mod capture;
pub mod decompose;
pub mod engine;
pub mod error;
pub mod functions;
pub mod hook;
pub mod parser;
pub mod report;

mod eval;

pub use engine::Engine;
pub use error::{DecomposeError, FrameCapture, LoadError, ParseError, ScriptError};
pub use xray_model::{
    BinaryOp, Binding, BindingId, BindingMap, ColorMode, ErrorKind, FrameOrder, HookTargets,
    LineIndex, NodeKind, ReportConfig, SourceFile, Span, UnaryOp, Value,
};
