//! Instrumented evaluation of decomposed step sequences.
//!
//! Each step performs one operation and records its value in the capture
//! store under the step's binding before the next step runs. A step that
//! fails records nothing, so its binding (and every binding downstream of
//! it) reads as unreached in the report.

use std::collections::BTreeMap;

use xray_model::{BinaryOp, ErrorKind, Value};

use crate::capture::InvocationToken;
use crate::decompose::{AtomicOp, DStmt, DecomposedUnit, Operand, Step};
use crate::error::ScriptError;
use crate::functions::Builtin;

use super::{call_function, ops, EvalContext, Flow, Scope};

pub(crate) fn exec_block(
    ctx: EvalContext<'_>,
    unit: &DecomposedUnit,
    stmts: &[DStmt],
    scope: &mut Scope,
    token: InvocationToken,
    depth: usize,
) -> Result<Flow, ScriptError> {
    for stmt in stmts {
        match exec_stmt(ctx, unit, stmt, scope, token, depth)? {
            Flow::Normal => {}
            flow @ Flow::Return(_) => return Ok(flow),
        }
    }
    Ok(Flow::Normal)
}

fn exec_stmt(
    ctx: EvalContext<'_>,
    unit: &DecomposedUnit,
    stmt: &DStmt,
    scope: &mut Scope,
    token: InvocationToken,
    depth: usize,
) -> Result<Flow, ScriptError> {
    match stmt {
        DStmt::Let {
            name,
            prelude,
            value,
            ..
        } => {
            run_steps(ctx, prelude, scope, token, depth)?;
            let value = read_operand(ctx, value, scope, token)?;
            scope.declare(name, value);
            Ok(Flow::Normal)
        }
        DStmt::Assign {
            name,
            prelude,
            value,
            span,
        } => {
            run_steps(ctx, prelude, scope, token, depth)?;
            let value = read_operand(ctx, value, scope, token)?;
            scope
                .assign(name, value)
                .map_err(|(kind, message)| ScriptError::new(kind, message, *span))?;
            Ok(Flow::Normal)
        }
        DStmt::Return { prelude, value, .. } => {
            run_steps(ctx, prelude, scope, token, depth)?;
            let value = match value {
                Some(operand) => read_operand(ctx, operand, scope, token)?,
                None => Value::Null,
            };
            Ok(Flow::Return(value))
        }
        DStmt::If {
            prelude,
            cond,
            then_body,
            else_body,
            ..
        } => {
            run_steps(ctx, prelude, scope, token, depth)?;
            let cond = read_operand(ctx, cond, scope, token)?;
            if cond.is_truthy() {
                exec_block(ctx, unit, then_body, scope, token, depth)
            } else {
                exec_block(ctx, unit, else_body, scope, token, depth)
            }
        }
        DStmt::While {
            prelude,
            cond,
            body,
            ..
        } => {
            loop {
                // Re-running the prelude overwrites the shared bindings; only
                // the last iteration's values survive in the capture slice.
                run_steps(ctx, prelude, scope, token, depth)?;
                let cond = read_operand(ctx, cond, scope, token)?;
                if !cond.is_truthy() {
                    break;
                }
                match exec_block(ctx, unit, body, scope, token, depth)? {
                    Flow::Normal => {}
                    flow @ Flow::Return(_) => return Ok(flow),
                }
            }
            Ok(Flow::Normal)
        }
        DStmt::Expr { prelude, value, .. } => {
            run_steps(ctx, prelude, scope, token, depth)?;
            read_operand(ctx, value, scope, token)?;
            Ok(Flow::Normal)
        }
    }
}

fn run_steps(
    ctx: EvalContext<'_>,
    steps: &[Step],
    scope: &mut Scope,
    token: InvocationToken,
    depth: usize,
) -> Result<(), ScriptError> {
    for step in steps {
        let value = eval_step(ctx, step, scope, token, depth)?;
        ctx.store.record(token, step.id, value);
    }
    Ok(())
}

fn eval_step(
    ctx: EvalContext<'_>,
    step: &Step,
    scope: &mut Scope,
    token: InvocationToken,
    depth: usize,
) -> Result<Value, ScriptError> {
    match &step.op {
        AtomicOp::LoadName { name } => scope.get(name).cloned().ok_or_else(|| {
            ScriptError::new(
                ErrorKind::UndefinedName,
                format!("undefined variable `{name}`"),
                step.span,
            )
        }),
        AtomicOp::Unary { op, operand } => {
            let operand = read_operand(ctx, operand, scope, token)?;
            ops::apply_unary(*op, &operand)
                .map_err(|(kind, message)| ScriptError::new(kind, message, step.span))
        }
        AtomicOp::Binary { op, left, right } => {
            let left = read_operand(ctx, left, scope, token)?;
            let right = read_operand(ctx, right, scope, token)?;
            ops::apply_binary(*op, &left, &right)
                .map_err(|(kind, message)| ScriptError::new(kind, message, step.span))
        }
        AtomicOp::ShortCircuit {
            op,
            left,
            right,
            right_out,
        } => {
            let left = read_operand(ctx, left, scope, token)?;
            let take_left = match op {
                BinaryOp::And => !left.is_truthy(),
                _ => left.is_truthy(),
            };
            if take_left {
                // The skipped operand's steps never run; its bindings stay
                // unreached.
                Ok(left)
            } else {
                run_steps(ctx, right, scope, token, depth)?;
                read_operand(ctx, right_out, scope, token)
            }
        }
        AtomicOp::Call { callee, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(read_operand(ctx, arg, scope, token)?);
            }
            if let Some(entry) = ctx.functions.get(callee) {
                let entry = entry.clone();
                call_function(ctx, &entry, values, step.span, depth + 1).map_err(|mut err| {
                    err.set_unwind_span(step.span);
                    err
                })
            } else if let Some(builtin) = Builtin::lookup(callee) {
                builtin
                    .call(&values)
                    .map_err(|(kind, message)| ScriptError::new(kind, message, step.span))
            } else {
                Err(ScriptError::new(
                    ErrorKind::UndefinedFunction,
                    format!("undefined function `{callee}`"),
                    step.span,
                ))
            }
        }
        AtomicOp::Field { base, field } => {
            let base = read_operand(ctx, base, scope, token)?;
            ops::field_access(&base, field)
                .map_err(|(kind, message)| ScriptError::new(kind, message, step.span))
        }
        AtomicOp::Index { base, index } => {
            let base = read_operand(ctx, base, scope, token)?;
            let index = read_operand(ctx, index, scope, token)?;
            ops::index_access(&base, &index)
                .map_err(|(kind, message)| ScriptError::new(kind, message, step.span))
        }
        AtomicOp::MakeList { items } => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(read_operand(ctx, item, scope, token)?);
            }
            Ok(Value::List(out))
        }
        AtomicOp::MakeRecord { fields } => {
            let mut out = BTreeMap::new();
            for (name, operand) in fields {
                let value = read_operand(ctx, operand, scope, token)?;
                out.insert(name.clone(), value);
            }
            Ok(Value::Record(out))
        }
    }
}

/// Resolve a step operand to a value.
///
/// A `Binding` operand always refers to a step that already ran in this
/// invocation; a miss means a decomposition/capture mismatch, which must not
/// crash the host; it degrades to `null` and is logged.
fn read_operand(
    ctx: EvalContext<'_>,
    operand: &Operand,
    scope: &mut Scope,
    token: InvocationToken,
) -> Result<Value, ScriptError> {
    match operand {
        Operand::Const(value) => Ok(value.clone()),
        Operand::Name { name, span } => scope.get(name).cloned().ok_or_else(|| {
            ScriptError::new(
                ErrorKind::UndefinedName,
                format!("undefined variable `{name}`"),
                *span,
            )
        }),
        Operand::Binding(id) => match ctx.store.read(token, *id) {
            Some(value) => Ok(value),
            None => {
                log::debug!("operand binding {} missing from capture slice", id.0);
                Ok(Value::Null)
            }
        },
    }
}
