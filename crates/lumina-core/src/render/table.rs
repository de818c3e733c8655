//! Pipe-table rendering.

use super::markdown::{MarkdownRenderer, escape_html};

/// Splits a pipe row into trimmed cells, dropping the fields created by the
/// bounding pipes. Interior empty cells are kept.
pub fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|c| c.trim().to_string()).collect()
}

/// Renders a table block (header, separator, data rows) to HTML.
///
/// Blocks with fewer than two non-blank lines are returned unchanged. The
/// separator line is skipped without validation.
pub fn render_table(block: &str, markdown: &MarkdownRenderer) -> String {
    let lines: Vec<&str> = block
        .trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();

    if lines.len() < 2 {
        return block.to_string();
    }

    let mut html = String::from("<div class=\"table-container\"><table class=\"markdown-table\">");

    html.push_str("<thead><tr>");
    for cell in split_cells(lines[0]) {
        html.push_str("<th class=\"table-header\">");
        html.push_str(&escape_html(&cell));
        html.push_str("</th>");
    }
    html.push_str("</tr></thead><tbody>");

    for line in &lines[2..] {
        html.push_str("<tr>");
        for cell in split_cells(line) {
            html.push_str("<td class=\"table-cell\">");
            html.push_str(&markdown.render_inline(&cell));
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }

    html.push_str("</tbody></table></div>");
    html
}
