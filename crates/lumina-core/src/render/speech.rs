//! Plain-text preparation for read-aloud.

use std::sync::LazyLock;

use regex::Regex;

static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[\s\S]*?```").expect("fence regex is valid"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold regex is valid"));
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("italic regex is valid"));
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+\s+").expect("heading regex is valid"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]\(.*?\)").expect("link regex is valid"));
static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank run regex is valid"));

/// Pause inserted between sentences.
const SENTENCE_PAUSE: &str = " ... ";

fn is_emoji(c: char) -> bool {
    matches!(
        u32::from(c),
        0x1F600..=0x1F64F
            | 0x1F300..=0x1F5FF
            | 0x1F680..=0x1F6FF
            | 0x1F1E0..=0x1F1FF
            | 0x2600..=0x26FF
            | 0x2700..=0x27BF
            | 0x1F900..=0x1F9FF
    )
}

/// Strips emoji and markdown syntax so the text reads naturally.
///
/// Code blocks are dropped entirely; link labels are kept without targets.
pub fn clean_for_speech(text: &str) -> String {
    let mut cleaned: String = text.chars().filter(|c| !is_emoji(*c)).collect();
    cleaned = CODE_FENCE_RE.replace_all(&cleaned, "").into_owned();
    cleaned = BOLD_RE.replace_all(&cleaned, "$1").into_owned();
    cleaned = ITALIC_RE.replace_all(&cleaned, "$1").into_owned();
    cleaned = HEADING_RE.replace_all(&cleaned, "").into_owned();
    cleaned = LINK_RE.replace_all(&cleaned, "$1").into_owned();
    cleaned = BLANK_RUN_RE.replace_all(&cleaned, "\n\n").into_owned();
    cleaned.trim().to_string()
}

/// Joins sentences with a spoken pause. Sentences end at `.`, `!` or `?`
/// followed by whitespace.
pub fn add_sentence_pauses(text: &str) -> String {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(next_i, next)) = chars.peek() else {
            break;
        };
        if !next.is_whitespace() {
            continue;
        }
        sentences.push(&text[start..=i]);
        let mut resume = next_i;
        while let Some(&(j, w)) = chars.peek() {
            if !w.is_whitespace() {
                resume = j;
                break;
            }
            chars.next();
            resume = j + w.len_utf8();
        }
        start = resume;
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences.join(SENTENCE_PAUSE)
}

/// Full read-aloud preparation: cleaning plus sentence pauses.
pub fn prepare_for_speech(text: &str) -> String {
    add_sentence_pauses(&clean_for_speech(text))
}
