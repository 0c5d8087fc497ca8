use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::span::Span;

/// Identity of one bound sub-expression, scoped to a single [`BindingMap`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BindingId(pub u32);

impl BindingId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Short-circuit conjunction. Decomposed with conditional wrapping, never
    /// by unconditional pre-evaluation of both operands.
    And,
    /// Short-circuit disjunction; same wrapping rule as [`BinaryOp::And`].
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// Syntactic kind of a bound sub-expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Call { callee: String },
    Binary { op: BinaryOp },
    Unary { op: UnaryOp },
    Field { field: String },
    Index,
    /// Collection literal (list or record). Scalar literals are never bound.
    Literal,
    Name { name: String },
}

/// One bound sub-expression: where it sits in the source, what it is, and
/// which other bindings feed it. Created at decomposition time; immutable
/// thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub span: Span,
    pub kind: NodeKind,
    /// Operand bindings in left-to-right source order. Empty for leaves and
    /// for nodes whose only operands are unbound scalar literals.
    pub operands: SmallVec<[BindingId; 2]>,
}

/// All bindings produced by decomposing one function or module body.
///
/// Read-only after decomposition; shared (behind `Arc`) across every
/// invocation of the code unit that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingMap {
    bindings: Vec<Binding>,
    /// Root binding of each decomposed statement expression, in source order.
    roots: Vec<BindingId>,
}

impl BindingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decomposition-time only: append a binding and get its identity.
    pub fn push(&mut self, binding: Binding) -> BindingId {
        let id = BindingId(self.bindings.len() as u32);
        self.bindings.push(binding);
        id
    }

    /// Decomposition-time only: mark `id` as the root of a statement's
    /// expression tree.
    pub fn push_root(&mut self, id: BindingId) {
        self.roots.push(id);
    }

    pub fn get(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id.index())
    }

    pub fn contains(&self, id: BindingId) -> bool {
        id.index() < self.bindings.len()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(idx, b)| (BindingId(idx as u32), b))
    }

    pub fn roots(&self) -> &[BindingId] {
        &self.roots
    }

    /// Statement root whose span contains `span`, if any. Statement spans
    /// never overlap, so the first match is the only match.
    pub fn root_containing(&self, span: Span) -> Option<BindingId> {
        self.roots
            .iter()
            .copied()
            .find(|id| self.get(*id).is_some_and(|b| b.span.contains(span)))
    }

    /// Narrowest binding whose span contains `span`. Used as a fallback when
    /// the error location does not sit inside any statement root.
    pub fn innermost_containing(&self, span: Span) -> Option<BindingId> {
        self.iter()
            .filter(|(_, b)| b.span.contains(span))
            .min_by_key(|(_, b)| b.span.len())
            .map(|(id, _)| id)
    }
}
