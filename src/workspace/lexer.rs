//! Comment and string-literal regions of C-family source text.

use crate::location::{TextContext, TextSpan};

/// A free-form text region; `span` covers the content without delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRegion {
    /// Comment or string literal.
    pub context: TextContext,
    /// Content span.
    pub span: TextSpan,
}

/// Find `//` and `/* */` comments and `"..."` string literals.
///
/// Unterminated regions run to the end of the text. Character literals are
/// skipped so `'"'` does not open a string.
pub fn text_regions(text: &str) -> Vec<TextRegion> {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut regions = Vec::new();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let start = i + 2;
                let end = find_byte(bytes, start, b'\n').unwrap_or(len);
                regions.push(region(TextContext::Comment, start, end));
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = i + 2;
                let end = find_block_end(bytes, start).unwrap_or(len);
                regions.push(region(TextContext::Comment, start, end));
                i = (end + 2).min(len);
            }
            b'"' => {
                let start = i + 1;
                let mut j = start;
                while j < len && bytes[j] != b'"' {
                    j += if bytes[j] == b'\\' { 2 } else { 1 };
                }
                let end = j.min(len);
                regions.push(region(TextContext::StringLiteral, start, end));
                i = end + 1;
            }
            b'\'' => i = skip_char_literal(bytes, i),
            _ => i += 1,
        }
    }

    regions
}

/// Whole-word occurrences of `word` inside `span` of `text`.
pub fn word_occurrences(text: &str, span: TextSpan, word: &str) -> Vec<TextSpan> {
    if word.is_empty() || span.end > text.len() || span.start > span.end {
        return Vec::new();
    }

    let haystack = &text[span.start..span.end];
    haystack
        .match_indices(word)
        .map(|(offset, _)| span.start + offset)
        .filter(|&start| is_word_boundary(text, start, start + word.len()))
        .map(|start| TextSpan::new(start, start + word.len()))
        .collect()
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_identifier_char) && !after.is_some_and(is_identifier_char)
}

fn is_identifier_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn region(context: TextContext, start: usize, end: usize) -> TextRegion {
    TextRegion {
        context,
        span: TextSpan::new(start, end),
    }
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|&b| b == needle)
        .map(|offset| from + offset)
}

fn find_block_end(bytes: &[u8], from: usize) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(2)
        .position(|pair| pair == b"*/")
        .map(|offset| from + offset)
}

fn skip_char_literal(bytes: &[u8], quote: usize) -> usize {
    match (bytes.get(quote + 1), bytes.get(quote + 2)) {
        (Some(b'\\'), _) => find_byte(bytes, quote + 3, b'\'').map_or(bytes.len(), |end| end + 1),
        (Some(_), Some(b'\'')) => quote + 3,
        // Lifetimes and stray quotes.
        _ => quote + 1,
    }
}
