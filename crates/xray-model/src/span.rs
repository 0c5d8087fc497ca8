use serde::{Deserialize, Serialize};

/// Half-open byte span into a script source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn contains(self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }
}

/// Maps byte offsets to 1-based line/column positions and back to line text.
///
/// Columns count characters, not bytes, so they line up with what a terminal
/// renders when the report underlines a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineIndex {
    /// Byte offset of the start of each line. `line_starts[0]` is always 0.
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (pos, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(pos + 1);
            }
        }
        Self { line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 1-based line number containing `offset`. Offsets past the end of the
    /// text land on the last line.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }

    /// Byte range of a 1-based line, excluding its trailing newline.
    pub fn line_range<'a>(&self, text: &'a str, line: usize) -> Option<&'a str> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .map(|next| next.saturating_sub(1))
            .unwrap_or(text.len());
        text.get(start..end.max(start))
    }

    /// 1-based (line, column) of a byte offset, counting characters.
    ///
    /// Offsets that do not sit on a character boundary (possible only with
    /// spans from an untrusted source) fall back to a byte-counted column
    /// instead of failing; diagnostics must never raise.
    pub fn line_col(&self, text: &str, offset: usize) -> (usize, usize) {
        let offset = offset.min(text.len());
        let line = self.line_of(offset);
        let line_start = self.line_starts[line - 1];
        let col = match text.get(line_start..offset) {
            Some(prefix) => prefix.chars().count() + 1,
            None => offset.saturating_sub(line_start) + 1,
        };
        (line, col)
    }
}

/// A named script source paired with its line index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
    index: LineIndex,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let index = LineIndex::new(&text);
        Self {
            name: name.into(),
            text,
            index,
        }
    }

    pub fn index(&self) -> &LineIndex {
        &self.index
    }

    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        self.index.line_col(&self.text, offset)
    }

    pub fn line_text(&self, line: usize) -> Option<&str> {
        self.index.line_range(&self.text, line)
    }

    /// Source text of a span. Out-of-range or non-boundary spans yield `None`
    /// rather than panicking; the renderer degrades on missing text.
    pub fn span_text(&self, span: Span) -> Option<&str> {
        self.text.get(span.start..span.end)
    }
}
