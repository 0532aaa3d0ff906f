//! Shared utilities for channel implementations.

/// Longest HTML entity we step back over (`&amp;`, `&#128512;`).
const MAX_ENTITY_LEN: usize = 10;
/// Longest HTML tag we step back over.
const MAX_TAG_LEN: usize = 64;

/// Split a long message into chunks that respect a platform's byte limit.
///
/// Slice boundaries always land on UTF-8 char boundaries, so Cyrillic and
/// emoji never get cut in half. A boundary never falls inside an HTML
/// entity or tag of already-escaped text. Prefers splitting after a newline.
pub fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len || max_len == 0 {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        // A single char wider than max_len still has to go somewhere.
        if end == start {
            end = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }
        let break_at = if end < text.len() {
            let end = markup_boundary(text, start, end);
            text[start..end]
                .rfind('\n')
                .map(|i| start + i + 1)
                .filter(|&b| b > start)
                .unwrap_or(end)
        } else {
            end
        };
        chunks.push(&text[start..break_at]);
        start = break_at;
    }

    chunks
}

/// Pull `end` back to the start of an entity or tag left open by the cut.
fn markup_boundary(text: &str, start: usize, end: usize) -> usize {
    let chunk = &text[start..end];
    let open_at = |open: char, close: char, max_len: usize| {
        let i = chunk.rfind(open)?;
        let tail = &chunk[i..];
        (!tail.contains(close) && tail.len() < max_len).then_some(start + i)
    };
    [open_at('&', ';', MAX_ENTITY_LEN), open_at('<', '>', MAX_TAG_LEN)]
        .into_iter()
        .flatten()
        .filter(|&b| b > start)
        .min()
        .unwrap_or(end)
}

/// Escape user-supplied text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Shorten to at most `max_chars` characters, appending "..." when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
