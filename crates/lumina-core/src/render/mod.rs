//! Response rendering pipeline.
//!
//! - `segment`: split raw text into code, table, tag and text segments
//! - `markdown`: prose segments to escaped HTML
//! - `table`: table segments to HTML
//! - `html`: whole messages and transcripts
//! - `speech`: read-aloud text preparation

pub mod html;
pub mod markdown;
pub mod segment;
pub mod speech;
pub mod table;

pub use html::{RenderOptions, code_blocks, render_message_html, render_transcript};
pub use markdown::{ItalicPolicy, MarkdownOptions, MarkdownRenderer, TagPolicy, render_markdown};
pub use segment::{Segment, SegmentOptions, segment, segment_with};
pub use table::render_table;
