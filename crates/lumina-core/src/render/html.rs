//! Whole-message and transcript HTML rendering.

use std::fmt::Write as _;

use chrono::DateTime;

use super::markdown::{MarkdownOptions, MarkdownRenderer, escape_html};
use super::segment::{Segment, SegmentOptions, segment_with};
use super::table::render_table;
use crate::core::message::{Message, Sender};

/// Code blocks longer than this get line numbers.
const LINE_NUMBER_THRESHOLD: usize = 5;

/// Options for rendering a message to HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub markdown: MarkdownOptions,
    pub segments: SegmentOptions,
}

/// Renders one segment to an HTML fragment.
pub fn render_segment(segment: &Segment, markdown: &MarkdownRenderer) -> String {
    match segment {
        Segment::Text { content } => markdown.render(content),
        Segment::Code { language, code } => render_code_block(language, code),
        Segment::Table { raw_rows } => render_table(&raw_rows.join("\n"), markdown),
        Segment::Tag { content } => {
            format!("<span class=\"tag\">{}</span>", escape_html(content))
        }
    }
}

/// Renders a fenced code block with its language header.
pub fn render_code_block(language: &str, code: &str) -> String {
    let language = escape_html(language);
    let pre_class = if code.lines().count() > LINE_NUMBER_THRESHOLD {
        " class=\"line-numbers\""
    } else {
        ""
    };
    format!(
        "<div class=\"code-block\"><div class=\"code-header\"><span class=\"code-language\">{language}</span></div>\
         <pre{pre_class}><code class=\"language-{language}\">{}</code></pre></div>",
        escape_html(code)
    )
}

/// Segments `content` and renders every segment, in order.
pub fn render_message_html(content: &str, options: RenderOptions) -> String {
    let markdown = MarkdownRenderer::new(options.markdown);
    segment_with(content, options.segments)
        .iter()
        .map(|segment| render_segment(segment, &markdown))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Returns the code of every code segment in `content`, in order.
pub fn code_blocks(content: &str) -> Vec<String> {
    segment_with(content, SegmentOptions::default())
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Code { code, .. } => Some(code),
            _ => None,
        })
        .collect()
}

fn display_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default()
}

/// Renders a conversation as a standalone HTML document.
///
/// User and error messages are shown as escaped plain text; assistant
/// messages go through the full segment pipeline.
pub fn render_transcript(messages: &[Message], title: &str, options: RenderOptions) -> String {
    let mut html = String::new();
    let title = escape_html(title);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<main class=\"chat-messages\">\n"
    );

    for message in messages {
        let (class, body) = match message.sender() {
            Sender::User => (
                "user-message",
                format!("<p class=\"paragraph\">{}</p>", escape_html(message.content()).replace('\n', "<br>")),
            ),
            Sender::Error => (
                "error-message",
                format!("<p class=\"paragraph\">{}</p>", escape_html(message.content())),
            ),
            Sender::Assistant => ("ai-message", render_message_html(message.content(), options)),
        };
        let _ = write!(
            html,
            "<article class=\"message {class}\" data-id=\"{}\">\n<div class=\"message-content\">\n{body}\n</div>\n<div class=\"message-time\">{}</div>\n</article>\n",
            message.id(),
            display_time(message.timestamp()),
        );
    }

    html.push_str("</main>\n</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_content_renders_in_order() {
        let content = "Here:\n```rust\nlet a = 1 < 2;\n```\n| A |\n|---|\n| 1 |\nBye";
        let html = render_message_html(content, RenderOptions::default());

        let prose = html.find("<p class=\"paragraph\">Here:</p>").unwrap();
        let code = html.find("<span class=\"code-language\">rust</span>").unwrap();
        let table = html.find("<table").unwrap();
        let bye = html.find("Bye").unwrap();
        assert!(prose < code && code < table && table < bye);
        assert!(html.contains("let a = 1 &lt; 2;"));
    }

    #[test]
    fn test_code_block_line_numbers() {
        let short = render_code_block("text", "a\nb");
        assert!(short.contains("<pre><code"));
        let long = render_code_block("text", "1\n2\n3\n4\n5\n6");
        assert!(long.contains("<pre class=\"line-numbers\">"));
    }

    #[test]
    fn test_tag_segments_render_as_spans() {
        let options = RenderOptions {
            segments: SegmentOptions { extract_tags: true },
            ..RenderOptions::default()
        };
        let html = render_message_html("#todo", options);
        assert_eq!(html, "<span class=\"tag\">#todo</span>");
    }

    #[test]
    fn test_code_blocks_are_listed() {
        let content = "```sh\nls\n```\ntext\n```\npwd\n```";
        assert_eq!(code_blocks(content), vec!["ls", "pwd"]);
    }

    #[test]
    fn test_empty_message_renders_empty() {
        assert_eq!(render_message_html("", RenderOptions::default()), "");
    }
}
