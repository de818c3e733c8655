//! Markdown-to-HTML rendering for prose segments.
//!
//! Rendering is an ordered pipeline of pure `&str -> String` stages. HTML is
//! escaped first, so every tag in the output is one a stage introduced.
//! Inline code is swapped for placeholders right after escaping and restored
//! last, which keeps later stages from reading markdown syntax inside code.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::segment::find_tags_bounded;

static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("inline code regex is valid"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*\n]+)\*\*").expect("bold regex is valid"));
static ITALIC_BOUNDED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|\s)(?:_([^_\n]+)_|\*([^*\n]+)\*)").expect("italic regex is valid")
});
static ITALIC_LOOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"()(?:_([^_\n]+)_|\*([^*\n]+)\*)").expect("italic regex is valid")
});
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,4})[ \t]+(.+)$").expect("heading regex is valid"));
static BLOCKQUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^&gt;[ \t]?(.*)$").expect("blockquote regex is valid"));
static UNORDERED_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+][ \t]+(.+)$").expect("list regex is valid"));
static ORDERED_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.[ \t]+(.+)$").expect("list regex is valid"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]\n]+)\]\(([^)\s]+)\)").expect("link regex is valid"));

const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

/// Block-level tags that the paragraph stage passes through unwrapped.
const STRUCTURAL_PREFIXES: &[&str] = &[
    "<h1", "<h2", "<h3", "<h4", "<ul", "<ol", "<li", "<blockquote", "<hr",
];

/// How emphasis delimiters must be bounded to count as italics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItalicPolicy {
    /// `*x*` / `_x_` only when preceded by whitespace or line start and
    /// followed by whitespace or line end.
    #[default]
    WhitespaceBounded,
    /// Any `*x*` / `_x_` pair on one line, including inside words.
    Loose,
}

/// Whether `#token` annotations are styled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagPolicy {
    /// Style `#token` when bounded by whitespace or line edges.
    #[default]
    WhitespaceBounded,
    /// Leave `#token` as plain text.
    Disabled,
}

/// Markdown rendering policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownOptions {
    pub italic: ItalicPolicy,
    pub tags: TagPolicy,
}

/// Renders prose segments and table cells to HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer {
    options: MarkdownOptions,
}

impl MarkdownRenderer {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> MarkdownOptions {
        self.options
    }

    /// Renders a prose block, including block elements and paragraphs.
    ///
    /// Call once per raw segment; feeding rendered output back in escapes it
    /// a second time.
    pub fn render(&self, text: &str) -> String {
        let normalized = text.replace("\r\n", "\n");
        let escaped = escape_html(&normalized);
        let (protected, code_spans) = protect_inline_code(&escaped);

        let mut out = render_bold(&protected);
        out = render_italic(&out, self.options.italic);
        out = render_headings(&out);
        out = render_blockquotes(&out);
        out = render_lists(&out);
        out = render_links(&out);
        out = render_rules(&out);
        if self.options.tags == TagPolicy::WhitespaceBounded {
            out = render_tags(&out);
        }
        out = wrap_paragraphs(&out);

        restore_inline_code(&out, &code_spans)
    }

    /// Renders inline markup only (code, emphasis, links, tags), without
    /// block elements or paragraph wrapping. Used for table cells.
    pub fn render_inline(&self, text: &str) -> String {
        let escaped = escape_html(text.trim());
        let (protected, code_spans) = protect_inline_code(&escaped);

        let mut out = render_bold(&protected);
        out = render_italic(&out, self.options.italic);
        out = render_links(&out);
        if self.options.tags == TagPolicy::WhitespaceBounded {
            out = render_tags(&out);
        }

        restore_inline_code(&out, &code_spans)
    }
}

/// Renders `text` with default policies.
pub fn render_markdown(text: &str) -> String {
    MarkdownRenderer::default().render(text)
}

/// Escapes HTML-significant characters. Placeholder sentinels are dropped so
/// input text can never forge an inline-code placeholder.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            PLACEHOLDER_OPEN | PLACEHOLDER_CLOSE => {}
            _ => out.push(c),
        }
    }
    out
}

fn protect_inline_code(text: &str) -> (String, Vec<String>) {
    let mut spans = Vec::new();
    let out = INLINE_CODE_RE.replace_all(text, |caps: &Captures<'_>| {
        let index = spans.len();
        spans.push(format!("<code class=\"inline-code\">{}</code>", &caps[1]));
        format!("{PLACEHOLDER_OPEN}{index}{PLACEHOLDER_CLOSE}")
    });
    (out.into_owned(), spans)
}

fn restore_inline_code(text: &str, spans: &[String]) -> String {
    if spans.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find(PLACEHOLDER_OPEN) {
        out.push_str(&rest[..open]);
        let after = &rest[open + PLACEHOLDER_OPEN.len_utf8()..];
        let Some(close) = after.find(PLACEHOLDER_CLOSE) else {
            rest = after;
            continue;
        };
        if let Some(span) = after[..close].parse::<usize>().ok().and_then(|i| spans.get(i)) {
            out.push_str(span);
        }
        rest = &after[close + PLACEHOLDER_CLOSE.len_utf8()..];
    }
    out.push_str(rest);
    out
}

fn render_bold(text: &str) -> String {
    BOLD_RE
        .replace_all(text, "<strong>$1</strong>")
        .into_owned()
}

fn render_italic(text: &str, policy: ItalicPolicy) -> String {
    let (re, bounded) = match policy {
        ItalicPolicy::WhitespaceBounded => (&*ITALIC_BOUNDED_RE, true),
        ItalicPolicy::Loose => (&*ITALIC_LOOSE_RE, false),
    };

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut pos = 0;

    while pos <= text.len() {
        let Some(caps) = re.captures_at(text, pos) else {
            break;
        };
        let (Some(whole), Some(lead)) = (caps.get(0), caps.get(1)) else {
            break;
        };

        let followed_ok = text[whole.end()..]
            .chars()
            .next()
            .is_none_or(char::is_whitespace);
        if bounded && !followed_ok {
            // Retry one character further so a later delimiter can still open.
            pos = whole.start() + text[whole.start()..].chars().next().map_or(1, char::len_utf8);
            continue;
        }

        let inner = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        out.push_str(&text[last..whole.start()]);
        out.push_str(lead.as_str());
        out.push_str("<em>");
        out.push_str(inner);
        out.push_str("</em>");

        last = whole.end();
        pos = whole.end();
    }

    out.push_str(&text[last..]);
    out
}

/// Applies `f` to each line, rejoining with `\n`.
fn map_lines(text: &str, f: impl FnMut(&str) -> String) -> String {
    text.split('\n').map(f).collect::<Vec<_>>().join("\n")
}

fn render_headings(text: &str) -> String {
    map_lines(text, |line| match HEADING_RE.captures(line) {
        Some(caps) => {
            let level = caps[1].len();
            let class = match level {
                1 => "main-heading",
                2 => "heading",
                3 => "subheading",
                _ => "minor-heading",
            };
            format!("<h{level} class=\"{class}\">{}</h{level}>", caps[2].trim_end())
        }
        None => line.to_string(),
    })
}

fn render_blockquotes(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut quote: Vec<String> = Vec::new();

    let flush = |quote: &mut Vec<String>, out: &mut Vec<String>| {
        if !quote.is_empty() {
            out.push(format!("<blockquote>{}</blockquote>", quote.join("<br>")));
            quote.clear();
        }
    };

    for line in text.split('\n') {
        if let Some(caps) = BLOCKQUOTE_RE.captures(line) {
            quote.push(caps[1].to_string());
        } else {
            flush(&mut quote, &mut out);
            out.push(line.to_string());
        }
    }
    flush(&mut quote, &mut out);

    out.join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

fn list_item(line: &str) -> Option<(ListKind, String)> {
    if let Some(caps) = UNORDERED_ITEM_RE.captures(line) {
        return Some((ListKind::Unordered, caps[1].to_string()));
    }
    ORDERED_ITEM_RE
        .captures(line)
        .map(|caps| (ListKind::Ordered, caps[1].to_string()))
}

/// Converts list item lines and groups consecutive items of one kind into a
/// single `<ul>`/`<ol>` line.
fn render_lists(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut group: Option<(ListKind, Vec<String>)> = None;

    let flush = |group: &mut Option<(ListKind, Vec<String>)>, out: &mut Vec<String>| {
        if let Some((kind, items)) = group.take() {
            let tag = kind.tag();
            let body: String = items.iter().map(|i| format!("<li>{i}</li>")).collect();
            out.push(format!("<{tag} class=\"list\">{body}</{tag}>"));
        }
    };

    for line in text.split('\n') {
        match list_item(line) {
            Some((kind, item)) => {
                let extends = matches!(&group, Some((current, _)) if *current == kind);
                if extends {
                    if let Some((_, items)) = group.as_mut() {
                        items.push(item);
                    }
                } else {
                    flush(&mut group, &mut out);
                    group = Some((kind, vec![item]));
                }
            }
            None => {
                flush(&mut group, &mut out);
                out.push(line.to_string());
            }
        }
    }
    flush(&mut group, &mut out);

    out.join("\n")
}

/// Only web, mail and relative targets become live links.
fn is_safe_href(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    match lower.split_once(':') {
        Some((scheme, _)) if !scheme.contains('/') => {
            matches!(scheme, "http" | "https" | "mailto")
        }
        _ => true,
    }
}

fn render_links(text: &str) -> String {
    LINK_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let label = &caps[1];
            let href = &caps[2];
            if is_safe_href(href) {
                format!(
                    "<a href=\"{href}\" target=\"_blank\" rel=\"noopener noreferrer\" class=\"link\">{label}</a>"
                )
            } else {
                label.to_string()
            }
        })
        .into_owned()
}

fn render_rules(text: &str) -> String {
    map_lines(text, |line| {
        if line == "---" {
            "<hr class=\"rule\" />".to_string()
        } else {
            line.to_string()
        }
    })
}

/// Styles `#tag` tokens. Runs after the block stages, so a tag may also sit
/// against markup they introduced (`<li>#a`, `#a</h2>`, `#a<br>`). Input
/// angle brackets are escaped by then, so any `<` or `>` here is markup.
fn render_tags(text: &str) -> String {
    map_lines(text, |line| {
        let tags = find_tags_bounded(
            line,
            |c| c.is_whitespace() || c == '>',
            |c| c.is_whitespace() || c == '<',
        );
        if tags.is_empty() {
            return line.to_string();
        }
        let mut out = String::with_capacity(line.len() + tags.len() * 24);
        let mut last = 0;
        for (start, end) in tags {
            out.push_str(&line[last..start]);
            out.push_str("<span class=\"tag\">");
            out.push_str(&line[start..end]);
            out.push_str("</span>");
            last = end;
        }
        out.push_str(&line[last..]);
        out
    })
}

fn is_structural(line: &str) -> bool {
    STRUCTURAL_PREFIXES.iter().any(|p| line.starts_with(p))
}

/// Groups non-structural lines into `<p>` blocks split on blank lines.
fn wrap_paragraphs(text: &str) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    let flush = |paragraph: &mut Vec<&str>, blocks: &mut Vec<String>| {
        if !paragraph.is_empty() {
            blocks.push(format!(
                "<p class=\"paragraph\">{}</p>",
                paragraph.join("<br>")
            ));
            paragraph.clear();
        }
    };

    for line in text.split('\n') {
        if line.trim().is_empty() {
            flush(&mut paragraph, &mut blocks);
        } else if is_structural(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(line.to_string());
        } else {
            paragraph.push(line);
        }
    }
    flush(&mut paragraph, &mut blocks);

    blocks.join("\n")
}
