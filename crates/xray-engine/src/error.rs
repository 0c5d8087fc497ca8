use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use xray_model::{BindingMap, ErrorKind, SourceFile, Span};

use crate::capture::CaptureSlice;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected character '{ch}'")]
    UnexpectedChar { ch: char, span: Span },
    #[error("unterminated string literal")]
    UnterminatedString { span: Span },
    #[error("invalid number literal: {text}")]
    InvalidNumber { text: String, span: Span },
    #[error("expected {expected}, found {found}")]
    Expected {
        expected: String,
        found: String,
        span: Span,
    },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedChar { span, .. }
            | ParseError::UnterminatedString { span }
            | ParseError::InvalidNumber { span, .. }
            | ParseError::Expected { span, .. } => *span,
        }
    }
}

/// Decomposition failures are fatal to instrumenting one unit only; the unit
/// falls back to direct evaluation and the engine logs the reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecomposeError {
    #[error("expression nesting exceeds {limit} levels")]
    ExpressionTooDeep { limit: usize, span: Span },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("parse error in module {module}: {source}")]
    Parse {
        module: String,
        #[source]
        source: ParseError,
    },
    #[error("function {name} is already installed")]
    DuplicateFunction { name: String },
}

/// One active invocation captured while an error unwound through it.
///
/// Owns the invocation's evicted capture slice, so the slice stays readable
/// for report generation exactly as long as the error itself is alive.
#[derive(Debug, Clone)]
pub struct FrameCapture {
    /// Enclosing function name (`<module>` for the module body unit).
    pub function: String,
    pub source: Arc<SourceFile>,
    /// Where the error sat within this frame: the origin expression for the
    /// innermost frame, the call expression for every outer frame.
    pub error_span: Span,
    /// `None` for uninstrumented frames (decomposition fallback).
    pub map: Option<Arc<BindingMap>>,
    /// `None` when no capture slice survived; the reconstructor then reports
    /// every binding as unreached instead of failing.
    pub slice: Option<CaptureSlice>,
}

/// A script runtime failure, carrying the frame chain it unwound through.
///
/// Kind, message, and origin span are fixed at the error site and never
/// altered afterwards; diagnosis only ever appends frame captures.
#[derive(Debug, Clone)]
pub struct ScriptError {
    pub kind: ErrorKind,
    pub message: String,
    /// Span of the expression that originally failed (innermost frame).
    pub span: Span,
    /// Unwound invocations, innermost first.
    pub frames: Vec<FrameCapture>,
    /// Where the error currently sits while it unwinds; consumed each time a
    /// frame capture is attached.
    pub(crate) unwind_span: Span,
}

impl ScriptError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            frames: Vec::new(),
            unwind_span: span,
        }
    }

    /// Record that the error is now propagating through the expression at
    /// `span` in the caller's frame.
    pub(crate) fn set_unwind_span(&mut self, span: Span) {
        self.unwind_span = span;
    }

    pub(crate) fn attach_frame(
        &mut self,
        function: impl Into<String>,
        source: Arc<SourceFile>,
        map: Option<Arc<BindingMap>>,
        slice: Option<CaptureSlice>,
    ) {
        self.frames.push(FrameCapture {
            function: function.into(),
            source,
            error_span: self.unwind_span,
            map,
            slice,
        });
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ScriptError {}
