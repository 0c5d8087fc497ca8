//! Script evaluation.
//!
//! Two evaluators share one semantics layer ([`ops`]): the *direct* evaluator
//! walks the syntax tree (fallback for units whose decomposition failed, and
//! the oracle for equivalence tests), while the *instrumented* evaluator runs
//! decomposed step sequences and records every binding value through the
//! capture store. Instrumentation must be observationally equivalent: same
//! results, same errors, same side-effect order.

use std::sync::Arc;

use ahash::AHashMap;
use xray_model::{ErrorKind, SourceFile, Span, Value};

use crate::capture::CaptureStore;
use crate::decompose::DecomposedUnit;
use crate::error::ScriptError;

pub(crate) mod direct;
pub(crate) mod instrumented;
pub(crate) mod ops;

/// Deep recursion aborts with `RecursionLimit` instead of exhausting the
/// host's stack; the diagnostic layer must never take the process down.
pub(crate) const MAX_CALL_DEPTH: usize = 128;

/// Executable body of an installed function.
#[derive(Debug, Clone)]
pub(crate) enum FnBody {
    /// Decomposed, capture-recording form.
    Instrumented(Arc<DecomposedUnit>),
    /// Direct AST evaluation; used when decomposition of the unit failed.
    Direct(Arc<Vec<crate::ast::Stmt>>),
}

/// An installed function (or module body, under the name `<module>`).
#[derive(Debug, Clone)]
pub(crate) struct FnEntry {
    pub name: String,
    pub name_span: Span,
    pub params: Vec<String>,
    pub body: FnBody,
    pub source: Arc<SourceFile>,
}

/// Shared evaluation context: the installed-function registry and the
/// process-wide capture store.
#[derive(Clone, Copy)]
pub(crate) struct EvalContext<'a> {
    pub functions: &'a AHashMap<String, Arc<FnEntry>>,
    pub store: &'a CaptureStore,
}

/// Statement-level control flow.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Flow {
    Normal,
    Return(Value),
}

impl Flow {
    pub(crate) fn into_value(self) -> Value {
        match self {
            Flow::Normal => Value::Null,
            Flow::Return(value) => value,
        }
    }
}

/// Local variables of one invocation.
#[derive(Debug, Default)]
pub(crate) struct Scope {
    vars: AHashMap<String, Value>,
}

impl Scope {
    pub(crate) fn from_params(params: &[String], args: Vec<Value>) -> Self {
        let mut vars = AHashMap::with_capacity(params.len());
        for (param, arg) in params.iter().zip(args) {
            vars.insert(param.clone(), arg);
        }
        Self { vars }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub(crate) fn declare(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    pub(crate) fn assign(&mut self, name: &str, value: Value) -> Result<(), (ErrorKind, String)> {
        match self.vars.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err((
                ErrorKind::UndefinedName,
                format!("assignment to undefined variable `{name}`"),
            )),
        }
    }
}

struct SliceGuard<'a> {
    store: &'a CaptureStore,
    token: crate::capture::InvocationToken,
    active: bool,
}

impl SliceGuard<'_> {
    fn take(mut self) -> Option<crate::capture::CaptureSlice> {
        self.active = false;
        self.store.take(self.token)
    }
}

impl Drop for SliceGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            self.store.discard(self.token);
        }
    }
}

/// Invoke an installed function. On error, the invocation's capture slice is
/// evicted from the store and attached to the propagating error's frame
/// chain; on success the slice is discarded.
pub(crate) fn call_function(
    ctx: EvalContext<'_>,
    entry: &FnEntry,
    args: Vec<Value>,
    call_span: Span,
    depth: usize,
) -> Result<Value, ScriptError> {
    if depth > MAX_CALL_DEPTH {
        return Err(ScriptError::new(
            ErrorKind::RecursionLimit,
            format!("call depth exceeds {MAX_CALL_DEPTH}"),
            call_span,
        ));
    }
    if args.len() != entry.params.len() {
        return Err(ScriptError::new(
            ErrorKind::ArityMismatch,
            format!(
                "{} expects {} argument{}, got {}",
                entry.name,
                entry.params.len(),
                if entry.params.len() == 1 { "" } else { "s" },
                args.len()
            ),
            call_span,
        ));
    }

    let mut scope = Scope::from_params(&entry.params, args);
    match &entry.body {
        FnBody::Instrumented(unit) => {
            let token = ctx.store.begin(unit.map.len());
            // Releases the slice on any exit path that neither returns
            // normally nor hands the slice to the error (cancellation rule).
            let guard = SliceGuard {
                store: ctx.store,
                token,
                active: true,
            };
            let result = instrumented::exec_block(ctx, unit, &unit.body, &mut scope, token, depth);
            match result {
                Ok(flow) => {
                    drop(guard);
                    Ok(flow.into_value())
                }
                Err(mut err) => {
                    let slice = guard.take();
                    err.attach_frame(
                        entry.name.clone(),
                        Arc::clone(&entry.source),
                        Some(Arc::clone(&unit.map)),
                        slice,
                    );
                    Err(err)
                }
            }
        }
        FnBody::Direct(body) => {
            let result = direct::exec_block(ctx, body, &mut scope, depth);
            match result {
                Ok(flow) => Ok(flow.into_value()),
                Err(mut err) => {
                    err.attach_frame(
                        entry.name.clone(),
                        Arc::clone(&entry.source),
                        None,
                        None,
                    );
                    Err(err)
                }
            }
        }
    }
}
