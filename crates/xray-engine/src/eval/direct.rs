//! Direct (uninstrumented) tree-walking evaluation.
//!
//! Runs units whose decomposition failed, and serves as the semantics oracle
//! in equivalence tests. Error frames produced here carry no binding map, so
//! reports show them with source-location-only info.

use std::collections::BTreeMap;

use xray_model::{ErrorKind, Value};

use crate::ast::{Expr, ExprKind, Stmt, StmtKind};
use crate::error::ScriptError;
use crate::functions::Builtin;

use super::{call_function, ops, EvalContext, Flow, Scope};

pub(crate) fn exec_block(
    ctx: EvalContext<'_>,
    stmts: &[Stmt],
    scope: &mut Scope,
    depth: usize,
) -> Result<Flow, ScriptError> {
    for stmt in stmts {
        match exec_stmt(ctx, stmt, scope, depth)? {
            Flow::Normal => {}
            flow @ Flow::Return(_) => return Ok(flow),
        }
    }
    Ok(Flow::Normal)
}

fn exec_stmt(
    ctx: EvalContext<'_>,
    stmt: &Stmt,
    scope: &mut Scope,
    depth: usize,
) -> Result<Flow, ScriptError> {
    match &stmt.kind {
        StmtKind::Let { name, value } => {
            let value = eval_expr(ctx, value, scope, depth)?;
            scope.declare(name, value);
            Ok(Flow::Normal)
        }
        StmtKind::Assign { name, value } => {
            let value = eval_expr(ctx, value, scope, depth)?;
            scope
                .assign(name, value)
                .map_err(|(kind, message)| ScriptError::new(kind, message, stmt.span))?;
            Ok(Flow::Normal)
        }
        StmtKind::Return { value } => {
            let value = match value {
                Some(expr) => eval_expr(ctx, expr, scope, depth)?,
                None => Value::Null,
            };
            Ok(Flow::Return(value))
        }
        StmtKind::If {
            cond,
            then_body,
            else_body,
        } => {
            let cond = eval_expr(ctx, cond, scope, depth)?;
            if cond.is_truthy() {
                exec_block(ctx, then_body, scope, depth)
            } else {
                exec_block(ctx, else_body, scope, depth)
            }
        }
        StmtKind::While { cond, body } => {
            loop {
                let cond = eval_expr(ctx, cond, scope, depth)?;
                if !cond.is_truthy() {
                    break;
                }
                match exec_block(ctx, body, scope, depth)? {
                    Flow::Normal => {}
                    flow @ Flow::Return(_) => return Ok(flow),
                }
            }
            Ok(Flow::Normal)
        }
        StmtKind::Expr { value } => {
            eval_expr(ctx, value, scope, depth)?;
            Ok(Flow::Normal)
        }
    }
}

pub(crate) fn eval_expr(
    ctx: EvalContext<'_>,
    expr: &Expr,
    scope: &mut Scope,
    depth: usize,
) -> Result<Value, ScriptError> {
    match &expr.kind {
        ExprKind::Number(n) => Ok(Value::Number(*n)),
        ExprKind::Text(s) => Ok(Value::Text(s.clone())),
        ExprKind::Bool(b) => Ok(Value::Bool(*b)),
        ExprKind::Null => Ok(Value::Null),
        ExprKind::Name(name) => scope.get(name).cloned().ok_or_else(|| {
            ScriptError::new(
                ErrorKind::UndefinedName,
                format!("undefined variable `{name}`"),
                expr.span,
            )
        }),
        ExprKind::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval_expr(ctx, item, scope, depth)?);
            }
            Ok(Value::List(out))
        }
        ExprKind::Record(fields) => {
            let mut out = BTreeMap::new();
            for (name, value) in fields {
                let value = eval_expr(ctx, value, scope, depth)?;
                out.insert(name.clone(), value);
            }
            Ok(Value::Record(out))
        }
        ExprKind::Unary { op, operand } => {
            let operand = eval_expr(ctx, operand, scope, depth)?;
            ops::apply_unary(*op, &operand)
                .map_err(|(kind, message)| ScriptError::new(kind, message, expr.span))
        }
        ExprKind::Binary { op, left, right } if op.is_short_circuit() => {
            let left = eval_expr(ctx, left, scope, depth)?;
            let take_left = match op {
                xray_model::BinaryOp::And => !left.is_truthy(),
                _ => left.is_truthy(),
            };
            if take_left {
                // The operand's value, not a bool, is the operator's result.
                Ok(left)
            } else {
                eval_expr(ctx, right, scope, depth)
            }
        }
        ExprKind::Binary { op, left, right } => {
            let left = eval_expr(ctx, left, scope, depth)?;
            let right = eval_expr(ctx, right, scope, depth)?;
            ops::apply_binary(*op, &left, &right)
                .map_err(|(kind, message)| ScriptError::new(kind, message, expr.span))
        }
        ExprKind::Call { callee, args, .. } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(ctx, arg, scope, depth)?);
            }
            if let Some(entry) = ctx.functions.get(callee) {
                let entry = entry.clone();
                call_function(ctx, &entry, values, expr.span, depth + 1).map_err(|mut err| {
                    err.set_unwind_span(expr.span);
                    err
                })
            } else if let Some(builtin) = Builtin::lookup(callee) {
                builtin
                    .call(&values)
                    .map_err(|(kind, message)| ScriptError::new(kind, message, expr.span))
            } else {
                Err(ScriptError::new(
                    ErrorKind::UndefinedFunction,
                    format!("undefined function `{callee}`"),
                    expr.span,
                ))
            }
        }
        ExprKind::Field { base, field } => {
            let base = eval_expr(ctx, base, scope, depth)?;
            ops::field_access(&base, field)
                .map_err(|(kind, message)| ScriptError::new(kind, message, expr.span))
        }
        ExprKind::Index { base, index } => {
            let base = eval_expr(ctx, base, scope, depth)?;
            let index = eval_expr(ctx, index, scope, depth)?;
            ops::index_access(&base, &index)
                .map_err(|(kind, message)| ScriptError::new(kind, message, expr.span))
        }
    }
}
