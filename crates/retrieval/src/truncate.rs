use unicode_segmentation::UnicodeSegmentation;

/// Rough average for source code.
pub const CHARS_PER_TOKEN: usize = 4;

/// Token-equivalent length of `text`.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Longest prefix of `text` within `max_tokens`, cut on a grapheme boundary.
pub fn truncate_text(text: &str, max_tokens: usize) -> &str {
    if estimate_tokens(text) <= max_tokens {
        return text;
    }
    let budget = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    let mut used = 0usize;
    let mut cut = 0usize;
    for (idx, grapheme) in text.grapheme_indices(true) {
        let chars = grapheme.chars().count();
        if used + chars > budget {
            break;
        }
        used += chars;
        cut = idx + grapheme.len();
    }
    &text[..cut]
}

/// Longest suffix of `text` within `max_tokens`, cut on a grapheme boundary.
pub fn truncate_text_start(text: &str, max_tokens: usize) -> &str {
    if estimate_tokens(text) <= max_tokens {
        return text;
    }
    let budget = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    let mut used = 0usize;
    let mut start = text.len();
    for (idx, grapheme) in text.grapheme_indices(true).rev() {
        let chars = grapheme.chars().count();
        if used + chars > budget {
            break;
        }
        used += chars;
        start = idx;
    }
    &text[start..]
}
