//! Splits assistant output into typed segments.
//!
//! Segmentation runs in three passes over the raw text:
//! 1. fenced code blocks (a closing fence is required)
//! 2. pipe tables inside the non-code spans
//! 3. optional `#tag` extraction inside the remaining prose
//!
//! The result is a pure function of the input, so callers re-run it on every
//! reveal tick instead of caching segments.

use std::sync::LazyLock;

use regex::Regex;

/// Default language label for fences without an info string.
pub const DEFAULT_CODE_LANGUAGE: &str = "text";

static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```([\w+#.-]+)?\r?\n([\s\S]*?)```").expect("code fence regex is valid")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[A-Za-z0-9_]+").expect("tag regex is valid"));

/// A classified, contiguous span of a message's raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Prose, rendered through the markdown pipeline.
    Text { content: String },
    /// Fenced code block with its interior trimmed.
    Code { language: String, code: String },
    /// Markdown table; one entry per source line (header, separator, rows).
    Table { raw_rows: Vec<String> },
    /// A `#token` annotation, including the leading `#`.
    Tag { content: String },
}

impl Segment {
    fn text(content: &str) -> Self {
        Segment::Text {
            content: content.to_string(),
        }
    }

    /// Returns the table block as newline-joined source lines.
    pub fn table_source(&self) -> Option<String> {
        match self {
            Segment::Table { raw_rows } => Some(raw_rows.join("\n")),
            _ => None,
        }
    }
}

/// Segmentation switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentOptions {
    /// Emit `Segment::Tag` for `#token` annotations instead of leaving them in
    /// the prose (where the markdown renderer styles them inline).
    pub extract_tags: bool,
}

/// Segments `content` with default options.
pub fn segment(content: &str) -> Vec<Segment> {
    segment_with(content, SegmentOptions::default())
}

/// Segments `content` into code, table, tag and text spans, in source order.
pub fn segment_with(content: &str, options: SegmentOptions) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in CODE_FENCE_RE.captures_iter(content) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            push_prose(&content[last..whole.start()], options, &mut segments);
        }

        let language = caps
            .get(1)
            .map_or(DEFAULT_CODE_LANGUAGE, |m| m.as_str())
            .to_string();
        let code = caps
            .get(2)
            .map_or("", |m| m.as_str())
            .trim()
            .replace("\r\n", "\n");
        segments.push(Segment::Code { language, code });

        last = whole.end();
    }

    if last < content.len() {
        push_prose(&content[last..], options, &mut segments);
    }

    segments
}

/// Handles a span with no code fences: tables first, then prose.
fn push_prose(span: &str, options: SegmentOptions, out: &mut Vec<Segment>) {
    if span.trim().is_empty() {
        return;
    }

    let mut last = 0;
    for table in find_tables(span) {
        if table.start > last {
            push_text(&span[last..table.start], options, out);
        }
        out.push(Segment::Table {
            raw_rows: table.rows,
        });
        last = table.end;
    }

    if last < span.len() {
        push_text(&span[last..], options, out);
    }
}

fn push_text(span: &str, options: SegmentOptions, out: &mut Vec<Segment>) {
    if span.trim().is_empty() {
        return;
    }
    if !options.extract_tags {
        out.push(Segment::text(span));
        return;
    }

    let mut last = 0;
    for (start, end) in find_tags(span) {
        let before = &span[last..start];
        if !before.trim().is_empty() {
            out.push(Segment::text(before));
        }
        out.push(Segment::Tag {
            content: span[start..end].to_string(),
        });
        last = end;
    }

    let rest = &span[last..];
    if !rest.trim().is_empty() {
        out.push(Segment::text(rest));
    }
}

/// Byte ranges of `#tag` tokens bounded by whitespace or the span edges.
pub(crate) fn find_tags(text: &str) -> Vec<(usize, usize)> {
    find_tags_bounded(text, char::is_whitespace, char::is_whitespace)
}

/// Byte ranges of `#tag` tokens whose neighbours satisfy `before` and
/// `after`. Span edges always count as boundaries.
pub(crate) fn find_tags_bounded(
    text: &str,
    before: impl Fn(char) -> bool,
    after: impl Fn(char) -> bool,
) -> Vec<(usize, usize)> {
    TAG_RE
        .find_iter(text)
        .filter(|m| {
            let before_ok = text[..m.start()].chars().next_back().is_none_or(&before);
            let after_ok = text[m.end()..].chars().next().is_none_or(&after);
            before_ok && after_ok
        })
        .map(|m| (m.start(), m.end()))
        .collect()
}

/// A table located inside a prose span.
#[derive(Debug)]
struct TableMatch {
    start: usize,
    end: usize,
    rows: Vec<String>,
}

/// One source line with its byte range (terminator excluded).
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    start: usize,
    end: usize,
    text: &'a str,
}

fn lines_with_offsets(span: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for piece in span.split_inclusive('\n') {
        let body = piece.strip_suffix('\n').unwrap_or(piece);
        let body = body.strip_suffix('\r').unwrap_or(body);
        lines.push(Line {
            start,
            end: start + body.len(),
            text: body,
        });
        start += piece.len();
    }
    lines
}

fn is_pipe_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// A separator row is made of pipes, dashes, colons and spaces only.
pub(crate) fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    is_pipe_row(trimmed)
        && trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'))
}

/// Finds runs of pipe rows whose second row is a separator.
///
/// Pipe rows that precede the header inside the same run stay prose.
fn find_tables(span: &str) -> Vec<TableMatch> {
    let lines = lines_with_offsets(span);
    let mut tables = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if !is_pipe_row(lines[i].text) {
            i += 1;
            continue;
        }

        let run_start = i;
        while i < lines.len() && is_pipe_row(lines[i].text) {
            i += 1;
        }
        let run = &lines[run_start..i];

        let header = (0..run.len().saturating_sub(1)).find(|&h| is_separator_row(run[h + 1].text));
        if let Some(h) = header {
            let rows = &run[h..];
            tables.push(TableMatch {
                start: rows[0].start,
                end: rows[rows.len() - 1].end,
                rows: rows.iter().map(|l| l.text.trim().to_string()).collect(),
            });
        }
    }

    tables
}
