//! Shared text shaping and truncation policies for compact surfaces.

use core::fmt::{self, Write};

use heapless::String;

/// Returns the longest prefix of `source` holding at most `max_chars` characters.
pub fn truncate_chars(source: &str, max_chars: usize) -> &str {
    match source.char_indices().nth(max_chars) {
        Some((end, _)) => &source[..end],
        None => source,
    }
}

/// Replaces `out` with at most `max_chars` characters of `source`.
///
/// Stops early, on a character boundary, if `out` runs out of capacity.
pub fn copy_truncated<const N: usize>(source: &str, max_chars: usize, out: &mut String<N>) {
    out.clear();
    for ch in truncate_chars(source, max_chars).chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
}

/// Writes `source` with the five HTML-significant characters escaped.
pub fn write_html_escaped<W: Write>(out: &mut W, source: &str) -> fmt::Result {
    for ch in source.chars() {
        match ch {
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '"' => out.write_str("&quot;")?,
            '\'' => out.write_str("&#39;")?,
            c => out.write_char(c)?,
        }
    }
    Ok(())
}
