//! Hand-rolled `multipart/form-data` decoder.
//!
//! The decoder works directly over the raw byte buffer: payloads are sliced,
//! never re-encoded, so binary uploads survive intact. Only the header text
//! of each section is viewed through a lossy UTF-8 conversion, solely to
//! match the `filename` token. Sections without a filename (plain form
//! fields) and malformed sections are skipped silently; the decoder itself
//! is infallible.

use once_cell::sync::Lazy;
use regex::Regex;

static FILENAME_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"filename="([^"]+)""#).unwrap_or_else(|_| unreachable!()));

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// One uploaded file extracted from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Filename carried verbatim from the part's `Content-Disposition`.
    pub filename: String,
    /// Raw part payload.
    pub data: Vec<u8>,
}

/// Decode a multipart body into its file parts.
///
/// The delimiter is `--{boundary}`; the slice before the first delimiter
/// and the slice after the last one (the `--` closer in a well-formed body)
/// are both discarded. A part left unterminated by a truncated body is
/// dropped rather than decoded short.
#[must_use]
pub fn decode(body: &[u8], boundary: &str) -> Vec<FilePart> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();

    for section in split_sections(body, delimiter.as_bytes()) {
        let Some(header_end) = find(section, HEADER_TERMINATOR) else {
            continue;
        };
        let header_text = String::from_utf8_lossy(&section[..header_end]);
        let Some(filename) = FILENAME_TOKEN
            .captures(&header_text)
            .and_then(|captures| captures.get(1))
            .map(|token| token.as_str().to_string())
        else {
            continue;
        };

        // Content runs from past the blank line to the trailing CRLF that
        // precedes the next delimiter.
        let content_start = header_end + HEADER_TERMINATOR.len();
        let content_end = section.len().saturating_sub(2).max(content_start);
        parts.push(FilePart {
            filename,
            data: section[content_start..content_end].to_vec(),
        });
    }

    parts
}

/// Slices between consecutive delimiter occurrences. The prefix before the
/// first delimiter and the suffix after the last are not sections.
fn split_sections<'a>(body: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut sections = Vec::new();
    let mut cursor = match find(body, delimiter) {
        Some(index) => index + delimiter.len(),
        None => return sections,
    };

    while let Some(offset) = find(&body[cursor..], delimiter) {
        sections.push(&body[cursor..cursor + offset]);
        cursor += offset + delimiter.len();
    }
    sections
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
