//! Static decomposition of expression trees into atomic bound steps.
//!
//! Each compound expression is lowered, post-order, into a sequence of
//! single-operation [`Step`]s. A step evaluates exactly one operation over
//! already-computed operands and records the result under a fresh
//! [`BindingId`]. Short-circuit operators lower to a conditional step whose
//! right-operand steps simply never run when the operator short-circuits,
//! leaving their capture entries unreached.
//!
//! Decomposition is deterministic and side-effect free: binding identities
//! are assigned in post-order traversal of the source tree, so the same
//! source always yields a structurally identical [`BindingMap`].

use std::sync::Arc;

use smallvec::SmallVec;
use xray_model::{BinaryOp, Binding, BindingId, BindingMap, NodeKind, Span, UnaryOp, Value};

use crate::ast::{Expr, ExprKind, Stmt, StmtKind};
use crate::error::DecomposeError;

/// Recursion guard for pathological nesting; deeper units fall back to
/// direct evaluation instead of risking the host's stack.
pub const MAX_EXPR_DEPTH: usize = 64;

/// Operand of an atomic step.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Value recorded by an earlier step of the same statement.
    Binding(BindingId),
    /// Unbound bare-name load (whole-statement skip rule).
    Name { name: String, span: Span },
    /// Scalar literal; never bound, cannot fail.
    Const(Value),
}

impl Operand {
    pub fn as_binding(&self) -> Option<BindingId> {
        match self {
            Operand::Binding(id) => Some(*id),
            _ => None,
        }
    }
}

/// One atomic operation, recorded under `id` when executed.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub id: BindingId,
    pub span: Span,
    pub op: AtomicOp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AtomicOp {
    LoadName {
        name: String,
    },
    Unary {
        op: UnaryOp,
        operand: Operand,
    },
    /// Non-short-circuit operators only; `&&`/`||` lower to `ShortCircuit`.
    Binary {
        op: BinaryOp,
        left: Operand,
        right: Operand,
    },
    /// `left` is evaluated by earlier steps; `right` runs only when the
    /// operator does not short-circuit on `left`'s truthiness.
    ShortCircuit {
        op: BinaryOp,
        left: Operand,
        right: Vec<Step>,
        right_out: Operand,
    },
    Call {
        callee: String,
        args: Vec<Operand>,
    },
    Field {
        base: Operand,
        field: String,
    },
    Index {
        base: Operand,
        index: Operand,
    },
    MakeList {
        items: Vec<Operand>,
    },
    MakeRecord {
        fields: Vec<(String, Operand)>,
    },
}

/// A rewritten statement: the original control shape plus the atomic steps
/// that compute its expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum DStmt {
    Let {
        name: String,
        prelude: Vec<Step>,
        value: Operand,
        span: Span,
    },
    Assign {
        name: String,
        prelude: Vec<Step>,
        value: Operand,
        span: Span,
    },
    Return {
        prelude: Vec<Step>,
        value: Option<Operand>,
        span: Span,
    },
    If {
        prelude: Vec<Step>,
        cond: Operand,
        then_body: Vec<DStmt>,
        else_body: Vec<DStmt>,
        span: Span,
    },
    /// Condition steps re-run before every iteration; their bindings are
    /// shared across iterations, so only the last value survives.
    While {
        prelude: Vec<Step>,
        cond: Operand,
        body: Vec<DStmt>,
        span: Span,
    },
    Expr {
        prelude: Vec<Step>,
        value: Operand,
        span: Span,
    },
}

/// The rewritten body of one function or module unit plus its binding map.
///
/// The map is read-only from here on and shared across every invocation of
/// the unit, so it is handed out behind `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecomposedUnit {
    pub body: Vec<DStmt>,
    pub map: Arc<BindingMap>,
}

pub fn decompose_unit(body: &[Stmt]) -> Result<DecomposedUnit, DecomposeError> {
    let mut lowerer = Lowerer {
        map: BindingMap::new(),
    };
    let body = lowerer.lower_block(body)?;
    Ok(DecomposedUnit {
        body,
        map: Arc::new(lowerer.map),
    })
}

struct Lowerer {
    map: BindingMap,
}

impl Lowerer {
    fn lower_block(&mut self, stmts: &[Stmt]) -> Result<Vec<DStmt>, DecomposeError> {
        stmts.iter().map(|stmt| self.lower_stmt(stmt)).collect()
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<DStmt, DecomposeError> {
        Ok(match &stmt.kind {
            StmtKind::Let { name, value } => {
                let (prelude, value) = self.lower_root_expr(value)?;
                DStmt::Let {
                    name: name.clone(),
                    prelude,
                    value,
                    span: stmt.span,
                }
            }
            StmtKind::Assign { name, value } => {
                let (prelude, value) = self.lower_root_expr(value)?;
                DStmt::Assign {
                    name: name.clone(),
                    prelude,
                    value,
                    span: stmt.span,
                }
            }
            StmtKind::Return { value } => match value {
                Some(value) => {
                    let (prelude, value) = self.lower_root_expr(value)?;
                    DStmt::Return {
                        prelude,
                        value: Some(value),
                        span: stmt.span,
                    }
                }
                None => DStmt::Return {
                    prelude: Vec::new(),
                    value: None,
                    span: stmt.span,
                },
            },
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let (prelude, cond) = self.lower_root_expr(cond)?;
                DStmt::If {
                    prelude,
                    cond,
                    then_body: self.lower_block(then_body)?,
                    else_body: self.lower_block(else_body)?,
                    span: stmt.span,
                }
            }
            StmtKind::While { cond, body } => {
                let (prelude, cond) = self.lower_root_expr(cond)?;
                DStmt::While {
                    prelude,
                    cond,
                    body: self.lower_block(body)?,
                    span: stmt.span,
                }
            }
            StmtKind::Expr { value } => {
                let (prelude, value) = self.lower_root_expr(value)?;
                DStmt::Expr {
                    prelude,
                    value,
                    span: stmt.span,
                }
            }
        })
    }

    /// Lower one statement-level expression. Atomic expressions are left
    /// unbound (skip rule); anything compound is decomposed and its root
    /// binding registered as a statement root.
    fn lower_root_expr(&mut self, expr: &Expr) -> Result<(Vec<Step>, Operand), DecomposeError> {
        if expr.is_atomic() {
            return Ok((Vec::new(), atomic_operand(expr)));
        }
        let mut steps = Vec::new();
        let value = self.lower_expr(expr, &mut steps, 0)?;
        if let Some(root) = value.as_binding() {
            self.map.push_root(root);
        }
        Ok((steps, value))
    }

    fn lower_expr(
        &mut self,
        expr: &Expr,
        steps: &mut Vec<Step>,
        depth: usize,
    ) -> Result<Operand, DecomposeError> {
        if depth > MAX_EXPR_DEPTH {
            return Err(DecomposeError::ExpressionTooDeep {
                limit: MAX_EXPR_DEPTH,
                span: expr.span,
            });
        }

        match &expr.kind {
            ExprKind::Number(n) => Ok(Operand::Const(Value::Number(*n))),
            ExprKind::Text(s) => Ok(Operand::Const(Value::Text(s.clone()))),
            ExprKind::Bool(b) => Ok(Operand::Const(Value::Bool(*b))),
            ExprKind::Null => Ok(Operand::Const(Value::Null)),
            ExprKind::Name(name) => {
                // Bound inside compound expressions: a name operand's value
                // (and whether it was reached at all) is part of the report.
                let id = self.bind(
                    expr.span,
                    NodeKind::Name { name: name.clone() },
                    &[],
                );
                steps.push(Step {
                    id,
                    span: expr.span,
                    op: AtomicOp::LoadName { name: name.clone() },
                });
                Ok(Operand::Binding(id))
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.lower_expr(operand, steps, depth + 1)?;
                let id = self.bind(
                    expr.span,
                    NodeKind::Unary { op: *op },
                    &[&operand],
                );
                steps.push(Step {
                    id,
                    span: expr.span,
                    op: AtomicOp::Unary { op: *op, operand },
                });
                Ok(Operand::Binding(id))
            }
            ExprKind::Binary { op, left, right } if op.is_short_circuit() => {
                let left = self.lower_expr(left, steps, depth + 1)?;
                let mut right_steps = Vec::new();
                let right_out = self.lower_expr(right, &mut right_steps, depth + 1)?;
                let id = self.bind(
                    expr.span,
                    NodeKind::Binary { op: *op },
                    &[&left, &right_out],
                );
                steps.push(Step {
                    id,
                    span: expr.span,
                    op: AtomicOp::ShortCircuit {
                        op: *op,
                        left,
                        right: right_steps,
                        right_out,
                    },
                });
                Ok(Operand::Binding(id))
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.lower_expr(left, steps, depth + 1)?;
                let right = self.lower_expr(right, steps, depth + 1)?;
                let id = self.bind(
                    expr.span,
                    NodeKind::Binary { op: *op },
                    &[&left, &right],
                );
                steps.push(Step {
                    id,
                    span: expr.span,
                    op: AtomicOp::Binary {
                        op: *op,
                        left,
                        right,
                    },
                });
                Ok(Operand::Binding(id))
            }
            ExprKind::Call {
                callee,
                callee_span: _,
                args,
            } => {
                let mut lowered = Vec::with_capacity(args.len());
                for arg in args {
                    lowered.push(self.lower_expr(arg, steps, depth + 1)?);
                }
                let operand_refs: Vec<&Operand> = lowered.iter().collect();
                let id = self.bind(
                    expr.span,
                    NodeKind::Call {
                        callee: callee.clone(),
                    },
                    &operand_refs,
                );
                steps.push(Step {
                    id,
                    span: expr.span,
                    op: AtomicOp::Call {
                        callee: callee.clone(),
                        args: lowered,
                    },
                });
                Ok(Operand::Binding(id))
            }
            ExprKind::Field { base, field } => {
                let base = self.lower_expr(base, steps, depth + 1)?;
                let id = self.bind(
                    expr.span,
                    NodeKind::Field {
                        field: field.clone(),
                    },
                    &[&base],
                );
                steps.push(Step {
                    id,
                    span: expr.span,
                    op: AtomicOp::Field {
                        base,
                        field: field.clone(),
                    },
                });
                Ok(Operand::Binding(id))
            }
            ExprKind::Index { base, index } => {
                let base = self.lower_expr(base, steps, depth + 1)?;
                let index = self.lower_expr(index, steps, depth + 1)?;
                let id = self.bind(
                    expr.span,
                    NodeKind::Index,
                    &[&base, &index],
                );
                steps.push(Step {
                    id,
                    span: expr.span,
                    op: AtomicOp::Index { base, index },
                });
                Ok(Operand::Binding(id))
            }
            ExprKind::List(items) => {
                let mut lowered = Vec::with_capacity(items.len());
                for item in items {
                    lowered.push(self.lower_expr(item, steps, depth + 1)?);
                }
                let operand_refs: Vec<&Operand> = lowered.iter().collect();
                let id = self.bind(expr.span, NodeKind::Literal, &operand_refs);
                steps.push(Step {
                    id,
                    span: expr.span,
                    op: AtomicOp::MakeList { items: lowered },
                });
                Ok(Operand::Binding(id))
            }
            ExprKind::Record(fields) => {
                let mut lowered = Vec::with_capacity(fields.len());
                for (name, value) in fields {
                    lowered.push((name.clone(), self.lower_expr(value, steps, depth + 1)?));
                }
                let operand_refs: Vec<&Operand> =
                    lowered.iter().map(|(_, op)| op).collect();
                let id = self.bind(expr.span, NodeKind::Literal, &operand_refs);
                steps.push(Step {
                    id,
                    span: expr.span,
                    op: AtomicOp::MakeRecord { fields: lowered },
                });
                Ok(Operand::Binding(id))
            }
        }
    }

    /// Register a binding whose operand list keeps only bound operands, in
    /// left-to-right source order (unbound scalar literals drop out).
    fn bind(&mut self, span: Span, kind: NodeKind, operands: &[&Operand]) -> BindingId {
        let operands: SmallVec<[BindingId; 2]> = operands
            .iter()
            .filter_map(|op| op.as_binding())
            .collect();
        self.map.push(Binding {
            span,
            kind,
            operands,
        })
    }
}

fn atomic_operand(expr: &Expr) -> Operand {
    match &expr.kind {
        ExprKind::Number(n) => Operand::Const(Value::Number(*n)),
        ExprKind::Text(s) => Operand::Const(Value::Text(s.clone())),
        ExprKind::Bool(b) => Operand::Const(Value::Bool(*b)),
        ExprKind::Null => Operand::Const(Value::Null),
        ExprKind::Name(name) => Operand::Name {
            name: name.clone(),
            span: expr.span,
        },
        _ => unreachable!("atomic_operand called on compound expression"),
    }
}
