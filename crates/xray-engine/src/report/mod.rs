//! Frame walking and expression-tree reconstruction.
//!
//! A propagating [`ScriptError`](crate::error::ScriptError) already carries
//! one [`FrameCapture`](crate::error::FrameCapture) per unwound invocation,
//! innermost first. This module turns each capture back into a rooted value
//! tree: the statement root whose span contains the error location, with one
//! node per bound sub-expression and the recorded value (or unreached) at
//! each node.

use serde::Serialize;
use xray_model::{BindingId, BindingMap, NodeKind, SourceFile, Span, Value};

use crate::capture::CaptureSlice;
use crate::error::FrameCapture;

mod render;

pub use render::{preview, render};

/// One reconstructed sub-expression node. Derived on demand from a binding,
/// its capture entry, and its operands; never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExprNode {
    pub span: Span,
    pub kind: NodeKind,
    /// Source text of the span, whitespace-collapsed for display. Falls back
    /// to a kind-based placeholder when the span cannot be sliced.
    pub text: String,
    /// `None` exactly when the binding's step never executed.
    pub value: Option<Value>,
    /// Operand nodes in left-to-right source order.
    pub children: Vec<ExprNode>,
}

impl ExprNode {
    /// Total node count, for tree-shape assertions.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(ExprNode::size).sum::<usize>()
    }

    /// Depth-first search for the node covering exactly `text`.
    pub fn find(&self, text: &str) -> Option<&ExprNode> {
        if self.text == text {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(text))
    }
}

/// Rebuild the value tree for one captured frame.
///
/// Returns `None` for uninstrumented frames (no binding map) and when the
/// error location matches no binding; both degrade to location-only frames.
pub fn frame_tree(frame: &FrameCapture) -> Option<ExprNode> {
    let map = frame.map.as_deref()?;
    let root = map
        .root_containing(frame.error_span)
        .or_else(|| map.innermost_containing(frame.error_span))?;
    Some(build_node(
        map,
        frame.slice.as_ref(),
        root,
        &frame.source,
    ))
}

fn build_node(
    map: &BindingMap,
    slice: Option<&CaptureSlice>,
    id: BindingId,
    source: &SourceFile,
) -> ExprNode {
    let Some(binding) = map.get(id) else {
        // Dangling operand reference; keep the report alive with a stub.
        return ExprNode {
            span: Span::new(0, 0),
            kind: NodeKind::Literal,
            text: "<unknown>".to_string(),
            value: None,
            children: Vec::new(),
        };
    };
    let value = slice.and_then(|slice| slice.get(id).cloned());
    let children = binding
        .operands
        .iter()
        // Operands always precede their parent in post-order id assignment;
        // refusing forward edges keeps malformed maps from looping.
        .filter(|child| **child < id)
        .map(|child| build_node(map, slice, *child, source))
        .collect();
    ExprNode {
        span: binding.span,
        kind: binding.kind.clone(),
        text: node_text(source, binding.span, &binding.kind),
        value,
        children,
    }
}

/// Span text with runs of whitespace (including newlines) collapsed so every
/// tree label fits on one line. Redundant outer parentheses are dropped, the
/// way the original source would read without grouping.
fn node_text(source: &SourceFile, span: Span, kind: &NodeKind) -> String {
    match source.span_text(span) {
        Some(text) => {
            let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
            strip_outer_parens(&collapsed).to_string()
        }
        None => placeholder(kind),
    }
}

fn strip_outer_parens(text: &str) -> &str {
    let mut out = text.trim();
    while out.starts_with('(') && out.ends_with(')') && outer_parens_match(out) {
        out = out[1..out.len() - 1].trim();
    }
    out
}

/// True when the opening parenthesis at position 0 closes at the final
/// character. Texts with unbalanced parens (spans sliced mid-expression)
/// report false and keep their text untouched.
fn outer_parens_match(text: &str) -> bool {
    let mut depth: i32 = 0;
    for (idx, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
                if depth == 0 {
                    return idx == text.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

fn placeholder(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Call { callee } => format!("{callee}(...)"),
        NodeKind::Binary { op } => format!("<{}>", op.symbol()),
        NodeKind::Unary { op } => format!("<{}>", op.symbol()),
        NodeKind::Field { field } => format!(".{field}"),
        NodeKind::Index => "<index>".to_string(),
        NodeKind::Literal => "<literal>".to_string(),
        NodeKind::Name { name } => name.clone(),
    }
}
