//! Span-carrying syntax tree for script sources.
//!
//! Every expression node records the half-open byte span it was parsed from;
//! the decomposer copies those spans onto bindings so the report renderer can
//! quote the exact source text of each evaluated sub-expression.

use xray_model::{BinaryOp, Span, UnaryOp};

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub functions: Vec<FnDecl>,
    /// Top-level statements, executed as the module body unit.
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: String,
    pub name_span: Span,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Let {
        name: String,
        value: Expr,
    },
    Assign {
        name: String,
        value: Expr,
    },
    Return {
        value: Option<Expr>,
    },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Expr {
        value: Expr,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
    Name(String),
    List(Vec<Expr>),
    Record(Vec<(String, Expr)>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Includes the short-circuit operators `&&` / `||`; the decomposer and
    /// both evaluators special-case those by `op.is_short_circuit()`.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        callee: String,
        callee_span: Span,
        args: Vec<Expr>,
    },
    Field {
        base: Box<Expr>,
        field: String,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
}

impl Expr {
    /// Scalar literals carry no diagnostic value and are never bound.
    pub fn is_scalar_literal(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Number(_) | ExprKind::Text(_) | ExprKind::Bool(_) | ExprKind::Null
        )
    }

    /// Expressions with no compound structure are left unbound when they form
    /// a whole statement (decomposition skip rule).
    pub fn is_atomic(&self) -> bool {
        self.is_scalar_literal() || matches!(self.kind, ExprKind::Name(_))
    }
}
