//! Human-readable rendering of diagnostics with a source excerpt.

use std::fmt::Write;

use colored::Colorize;

use crate::Diagnostic;
use crate::token::Span;

/// Render one diagnostic as a compiler-style block:
///
/// ```text
/// error: invalid character '@'
///  --> main.gx:2:3
///   |
/// 2 | x @ 1
///   |   ^
/// ```
///
/// `source` is the buffer the diagnostic was produced from. The excerpt
/// is omitted when the span lies outside it. ANSI colours are only
/// emitted when `color` is set.
#[must_use]
pub fn render(diagnostic: &Diagnostic, source: &[u8], color: bool) -> String {
    let span = diagnostic.span();
    let message = diagnostic.message();
    let location = format!("{}:{}:{}", diagnostic.source_id(), span.line, span.column);
    let gutter = span.line.to_string();
    let pad = " ".repeat(gutter.len());

    let mut out = String::new();
    if color {
        let _ = writeln!(out, "{}: {}", "error".red().bold(), message.bold());
        let _ = writeln!(out, "{pad}{} {location}", "-->".blue().bold());
    } else {
        let _ = writeln!(out, "error: {message}");
        let _ = writeln!(out, "{pad}--> {location}");
    }

    let Some(line) = source_line(source, span) else {
        return out;
    };
    let text = String::from_utf8_lossy(line);
    let underline = underline(line, span);

    if color {
        let bar = "|".blue().bold();
        let _ = writeln!(out, "{pad} {bar}");
        let _ = writeln!(out, "{} {bar} {text}", gutter.blue().bold());
        let _ = writeln!(out, "{pad} {bar} {}", underline.red().bold());
    } else {
        let _ = writeln!(out, "{pad} |");
        let _ = writeln!(out, "{gutter} | {text}");
        let _ = writeln!(out, "{pad} | {underline}");
    }
    out
}

/// The full source line containing `span.start`, without its newline.
fn source_line(source: &[u8], span: Span) -> Option<&[u8]> {
    if span.start > source.len() {
        return None;
    }
    let line_start = source[..span.start]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |index| index + 1);
    let line_end = source[line_start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(source.len(), |index| line_start + index);

    let mut line = &source[line_start..line_end];
    if line_start == 0 {
        line = line.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(line);
    }
    Some(line.strip_suffix(b"\r").unwrap_or(line))
}

/// Caret line under the span, measured in characters of the rendered
/// excerpt. The carets stop at the end of the line and are never fewer
/// than one.
fn underline(line: &[u8], span: Span) -> String {
    let chars = |bytes: &[u8]| String::from_utf8_lossy(bytes).chars().count();
    let start = span.column.saturating_sub(1).min(line.len());
    let end = start.saturating_add(span.len()).min(line.len());
    format!(
        "{}{}",
        " ".repeat(chars(&line[..start])),
        "^".repeat(chars(&line[start..end]).max(1))
    )
}
