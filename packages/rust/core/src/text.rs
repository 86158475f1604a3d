//! Character-indexed string helpers.
//!
//! Chunk windows are measured in characters, not bytes, so every slice taken
//! by the chunker goes through these.

/// Number of characters in `s`.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the `n`th character, or `s.len()` when `n` is past the end.
pub(crate) fn byte_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

/// The first `n` characters of `s`.
pub(crate) fn head_chars(s: &str, n: usize) -> &str {
    &s[..byte_offset(s, n)]
}

/// `s` without its first `n` characters.
pub(crate) fn skip_chars(s: &str, n: usize) -> &str {
    &s[byte_offset(s, n)..]
}

/// The last `n` characters of `s` (all of `s` when it is shorter).
pub(crate) fn tail_chars(s: &str, n: usize) -> &str {
    let len = char_len(s);
    if n >= len { s } else { skip_chars(s, len - n) }
}

/// Collapse every whitespace run to one space and trim the ends.
pub(crate) fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
