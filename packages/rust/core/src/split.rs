//! Text splitting for elements too long to fit a single chunk.

use regex::Regex;

use docchunk_shared::{DocChunkError, Result};

use crate::text::{byte_offset, char_len, head_chars, skip_chars, tail_chars};

/// Splits an oversized string into window-sized fragments.
///
/// Separators are regexes tried in order of preference; the first one with a
/// usable match inside the window wins. When none matches the text is cut at
/// an arbitrary character. A matched separator is removed, so only whitespace
/// separators make sense.
///
/// Call [`split`](Self::split) repeatedly on the remainder until it is empty.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    maxlen: usize,
    overlap: usize,
    patterns: Vec<(Regex, usize)>,
}

impl TextSplitter {
    /// Build a splitter with window `maxlen` and `overlap` characters of
    /// context repeated at the start of each remainder.
    pub fn new(maxlen: usize, overlap: usize, separators: &[String]) -> Result<Self> {
        let patterns = separators
            .iter()
            .map(|sep| {
                Regex::new(sep)
                    .map(|re| (re, char_len(sep)))
                    .map_err(|e| {
                        DocChunkError::validation(format!(
                            "invalid text-splitting separator {sep:?}: {e}"
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            maxlen,
            overlap,
            patterns,
        })
    }

    /// Return `(fragment, remainder)`.
    ///
    /// The fragment is never longer than the window. Text that already fits
    /// comes back whole with an empty remainder.
    pub fn split(&self, s: &str) -> (String, String) {
        let len = char_len(s);
        if len <= self.maxlen {
            return (s.to_string(), String::new());
        }

        for (pattern, sep_len) in &self.patterns {
            let Some((fragment, remainder)) = self.split_from_maxlen(pattern, *sep_len, s) else {
                continue;
            };
            if fragment.is_empty() || char_len(&remainder) >= len {
                continue;
            }
            return (
                fragment.trim_end().to_string(),
                remainder.trim_start().to_string(),
            );
        }

        // no separator is used between fragment and remainder on an arbitrary cut
        (
            head_chars(s, self.maxlen).trim_end().to_string(),
            skip_chars(s, self.maxlen - self.overlap).trim_start().to_string(),
        )
    }

    /// Split on the right-most match of `pattern` that ends within the window.
    ///
    /// The search starts past `overlap` so a split always makes progress, and
    /// extends `sep_len` past the window to catch a separator sitting exactly
    /// at `maxlen`.
    fn split_from_maxlen(
        &self,
        pattern: &Regex,
        sep_len: usize,
        s: &str,
    ) -> Option<(String, String)> {
        let start = byte_offset(s, self.overlap + 1);
        let end = byte_offset(s, self.maxlen + sep_len);
        if start >= end {
            return None;
        }

        let m = pattern.find_iter(&s[start..end]).last()?;
        let (match_start, match_end) = (start + m.start(), start + m.end());

        let fragment = s[..match_start].trim_end();
        let raw_remainder = s[match_end..].trim_start();

        // matched separator is replaced by a single space in the overlap
        if self.overlap <= 1 {
            return Some((fragment.to_string(), raw_remainder.to_string()));
        }

        let tail = tail_chars(fragment, self.overlap - 1).trim_start();
        Some((fragment.to_string(), format!("{tail} {raw_remainder}")))
    }
}
