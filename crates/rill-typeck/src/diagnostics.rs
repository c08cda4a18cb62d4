//! Ariadne-based rendering of compilation messages.
//!
//! Errors carry structured fields only; this module turns them into
//! terminal output (optionally colored) or JSON for editor integrations.
//! Every message renders its primary location as `file:line:col` plus a
//! source excerpt with the offending span underlined; secondary locations
//! get excerpts of their own.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use serde_json::json;

use rill_common::{LineIndex, SourceLocation};
use rill_ast::resolved::SourceFile;

use crate::error::CompilationMessage;

/// Rendering options.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticOptions {
    /// Whether to emit ANSI colors.
    pub color: bool,
    /// Whether to emit JSON objects instead of rendered text.
    pub json: bool,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        DiagnosticOptions { color: false, json: false }
    }
}

fn source_of<'a>(sources: &'a [SourceFile], loc: SourceLocation) -> Option<&'a SourceFile> {
    sources.get(loc.source.0 as usize)
}

fn clamp(range: Range<usize>, len: usize) -> Range<usize> {
    let start = range.start.min(len);
    let end = range.end.min(len).max(start);
    if start == end {
        // Ariadne needs a nonempty span to draw the underline.
        start..end.saturating_add(1).min(len)
    } else {
        start..end
    }
}

fn loc_range(loc: SourceLocation) -> Range<usize> {
    loc.span.start as usize..loc.span.end as usize
}

/// `file:line:col` of a location.
pub fn describe_location(sources: &[SourceFile], loc: SourceLocation) -> String {
    match source_of(sources, loc) {
        Some(file) => {
            let index = LineIndex::new(&file.text);
            let (line, col) = index.line_col(loc.span.start);
            format!("{}:{}:{}", file.name, line, col)
        }
        None => format!("<unknown>:{}", loc.span.start),
    }
}

/// Render one message as human-readable text.
pub fn render_message(
    msg: &CompilationMessage,
    sources: &[SourceFile],
    options: &DiagnosticOptions,
) -> String {
    if options.json {
        return render_message_json(msg, sources).to_string();
    }

    let mut out = String::new();
    out.push_str(&render_excerpt(msg, msg.loc(), sources, options, true));
    for secondary in msg.secondary_locs() {
        out.push_str(&render_excerpt(msg, secondary, sources, options, false));
    }
    out
}

fn render_excerpt(
    msg: &CompilationMessage,
    loc: SourceLocation,
    sources: &[SourceFile],
    options: &DiagnosticOptions,
    primary: bool,
) -> String {
    let Some(file) = source_of(sources, loc) else {
        return format!("[{}] {}\n", msg.code(), msg);
    };
    let config = Config::default().with_color(options.color);
    let range = clamp(loc_range(loc), file.text.len());

    let kind = if primary { ReportKind::Error } else { ReportKind::Advice };
    let label_msg = if primary { msg.to_string() } else { "related location".to_string() };

    let mut builder = Report::build(kind, range.clone())
        .with_code(msg.code())
        .with_message(msg.to_string())
        .with_config(config);
    builder.add_label(Label::new(range).with_message(label_msg).with_color(Color::Red));

    let mut buf = Vec::new();
    let _ = builder.finish().write(Source::from(file.text.as_str()), &mut buf);
    let rendered = String::from_utf8_lossy(&buf).into_owned();
    format!("{}\n{}", describe_location(sources, loc), rendered)
}

/// Render one message as a JSON object with its structured fields.
pub fn render_message_json(msg: &CompilationMessage, sources: &[SourceFile]) -> serde_json::Value {
    let loc = msg.loc();
    let (line, col) = match source_of(sources, loc) {
        Some(file) => LineIndex::new(&file.text).line_col(loc.span.start),
        None => (0, 0),
    };
    json!({
        "code": msg.code(),
        "message": msg.to_string(),
        "file": source_of(sources, loc).map(|f| f.name.clone()),
        "line": line,
        "col": col,
        "span": { "start": loc.span.start, "end": loc.span.end },
        "secondary": msg
            .secondary_locs()
            .iter()
            .map(|l| json!({
                "file": source_of(sources, *l).map(|f| f.name.clone()),
                "span": { "start": l.span.start, "end": l.span.end },
            }))
            .collect::<Vec<_>>(),
    })
}

/// Sort and deduplicate messages for output: stable order by (source,
/// offset, code), duplicates about the same location and kind collapsed.
pub fn finalize_messages(mut msgs: Vec<CompilationMessage>) -> Vec<CompilationMessage> {
    msgs.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    msgs.dedup_by(|a, b| a.sort_key() == b.sort_key() && a.to_string() == b.to_string());
    msgs
}
