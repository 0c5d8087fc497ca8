//! Report text rendering.
//!
//! Pure formatting: identical inputs yield byte-identical text. Missing
//! snippet lines, absent trees, and out-of-range spans degrade to whatever
//! can still be shown; rendering never fails and never touches the error.

use unicode_segmentation::UnicodeSegmentation;
use xray_model::{ColorMode, FrameOrder, ReportConfig, Value};

use crate::error::{FrameCapture, ScriptError};

use super::{frame_tree, ExprNode};

const RULE_WIDTH: usize = 70;
const UNREACHED: &str = "unreached";

struct Palette {
    red: &'static str,
    cyan: &'static str,
    dim: &'static str,
    bold: &'static str,
    reset: &'static str,
}

impl Palette {
    fn for_mode(mode: ColorMode) -> Self {
        match mode {
            ColorMode::Never => Palette {
                red: "",
                cyan: "",
                dim: "",
                bold: "",
                reset: "",
            },
            ColorMode::Always => Palette {
                red: "\x1b[91m",
                cyan: "\x1b[96m",
                dim: "\x1b[2m",
                bold: "\x1b[1m",
                reset: "\x1b[0m",
            },
        }
    }
}

/// Render a full diagnostic report for an escaping (or already-caught)
/// script error.
pub fn render(err: &ScriptError, config: &ReportConfig) -> String {
    let colors = Palette::for_mode(config.color);
    let mut frames: Vec<&FrameCapture> = err.frames.iter().collect();
    if config.frame_order == FrameOrder::OutermostFirst {
        frames.reverse();
    }

    let mut out = String::new();
    let rule = format!("{}{}{}\n", colors.dim, "-".repeat(RULE_WIDTH), colors.reset);
    for (idx, frame) in frames.iter().enumerate() {
        if idx > 0 {
            out.push_str(&rule);
        }
        render_frame(&mut out, idx + 1, frame, config, &colors);
    }
    out.push('\n');
    out.push_str(&format!(
        "{}{}{}: {}{}\n",
        colors.red, colors.bold, err.kind, err.message, colors.reset
    ));
    out
}

fn render_frame(
    out: &mut String,
    ordinal: usize,
    frame: &FrameCapture,
    config: &ReportConfig,
    colors: &Palette,
) {
    let source = &frame.source;
    let span = frame.error_span;
    let (start_line, start_col) = source.line_col(span.start);
    let (end_line, end_col_excl) = source.line_col(span.end.max(span.start));
    let end_col = end_col_excl.saturating_sub(1).max(start_col);

    out.push_str(&format!(
        "{}Frame #{}: {}:{} in {}{}\n",
        colors.bold, ordinal, source.name, start_line, frame.function, colors.reset
    ));
    out.push('\n');

    if end_line != start_line {
        out.push_str(&format!(
            "{}lines {}-{}, cols {}-{}{}\n",
            colors.cyan, start_line, end_line, start_col, end_col, colors.reset
        ));
    } else {
        out.push_str(&format!(
            "{}line {}, cols {}-{}{}\n",
            colors.cyan, start_line, start_col, end_col, colors.reset
        ));
    }

    render_context(out, frame, start_line, end_line, start_col, config, colors);

    if let Some(tree) = frame_tree(frame) {
        out.push('\n');
        render_tree(out, &tree, "", true, config, colors);
    }
}

fn render_context(
    out: &mut String,
    frame: &FrameCapture,
    start_line: usize,
    end_line: usize,
    start_col: usize,
    config: &ReportConfig,
    colors: &Palette,
) {
    let source = &frame.source;
    let first = start_line.saturating_sub(config.context_lines).max(1);
    let last = end_line + config.context_lines;
    let width = last.to_string().len();

    for line in first..=last {
        let Some(text) = source.line_text(line) else {
            break;
        };
        let in_span = (start_line..=end_line).contains(&line);
        let tint = if in_span { colors.bold } else { colors.dim };
        if text.is_empty() {
            out.push_str(&format!("{}{:>width$} |{}\n", tint, line, colors.reset));
        } else {
            out.push_str(&format!(
                "{}{:>width$} |{} {}\n",
                tint, line, colors.reset, text,
            ));
        }
        if line == start_line {
            render_underline(out, frame, line, start_col, end_line, width, colors);
        }
    }
}

/// Column underline (`^~~~`) under the first line of the failing span.
fn render_underline(
    out: &mut String,
    frame: &FrameCapture,
    line: usize,
    start_col: usize,
    end_line: usize,
    width: usize,
    colors: &Palette,
) {
    let span = frame.error_span;
    let source = &frame.source;
    let Some(line_text) = source.line_text(line) else {
        return;
    };
    let line_chars = line_text.chars().count();

    let span_chars = if end_line == line {
        source
            .span_text(span)
            .map(|text| text.chars().count())
            .unwrap_or(1)
    } else {
        // Multi-line span: underline to the end of the first line.
        (line_chars + 1).saturating_sub(start_col)
    };
    let len = span_chars.max(1);
    let pad = " ".repeat(start_col.saturating_sub(1));
    let underline: String = "^".to_string() + &"~".repeat(len - 1);
    out.push_str(&format!(
        "{:>width$} | {}{}{}{}\n",
        "", pad, colors.red, underline, colors.reset,
    ));
}

fn render_tree(
    out: &mut String,
    node: &ExprNode,
    prefix: &str,
    is_last: bool,
    config: &ReportConfig,
    colors: &Palette,
) {
    let glyph = if is_last { "`-- " } else { "|-- " };
    let value_text = match &node.value {
        Some(value) => format!(
            "{}{}{}",
            colors.cyan,
            preview(value, config.max_value_len),
            colors.reset
        ),
        None => format!("{}{}{}", colors.dim, UNREACHED, colors.reset),
    };
    out.push_str(&format!("{prefix}{glyph}{} = {value_text}\n", node.text));

    let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "|   " });
    let count = node.children.len();
    for (idx, child) in node.children.iter().enumerate() {
        render_tree(out, child, &child_prefix, idx + 1 == count, config, colors);
    }
}

/// Budgeted value rendering: large collections show a head sample, long text
/// truncates inside its quotes. Truncation is grapheme-aware so multi-byte
/// text never splits mid-cluster.
pub fn preview(value: &Value, max_len: usize) -> String {
    let full = value.to_string();
    if full.graphemes(true).count() <= max_len {
        return full;
    }
    match value {
        Value::List(items) if items.len() > 5 => {
            let head: Vec<String> = items.iter().take(3).map(|v| v.to_string()).collect();
            format!("[{}, ... +{} more]", head.join(", "), items.len() - 3)
        }
        Value::Record(fields) if fields.len() > 3 => {
            let head: Vec<String> = fields
                .iter()
                .take(2)
                .map(|(k, v)| format!("{k}: {v}"))
                .collect();
            format!("{{{}, ... +{} more}}", head.join(", "), fields.len() - 2)
        }
        Value::Text(_) => {
            let keep = max_len.saturating_sub(4).max(1);
            let prefix: String = full.graphemes(true).take(keep).collect();
            format!("{prefix}...\"")
        }
        _ => {
            let keep = max_len.saturating_sub(3).max(1);
            let prefix: String = full.graphemes(true).take(keep).collect();
            format!("{prefix}...")
        }
    }
}
