//! Source document record.
//!
//! # Invariants
//! - Text is immutable once handed to the core.
//! - Offsets are Unicode scalar (char) positions; slicing never splits a
//!   code point.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one document.
pub type DocumentId = Uuid;

/// Immutable `{id, text}` pair supplied by the document source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub text: String,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), text)
    }

    pub fn with_id(id: DocumentId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    /// Document length in chars.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns the `[start, end)` char slice, or `None` when out of range.
    pub fn slice(&self, start: usize, end: usize) -> Option<&str> {
        if start > end {
            return None;
        }
        let offsets = byte_offsets(&self.text, &[start, end])?;
        Some(&self.text[offsets[0]..offsets[1]])
    }
}

/// Maps ascending char offsets to byte offsets in one pass.
///
/// Returns `None` if any offset lies past the end of `text`.
pub(crate) fn byte_offsets(text: &str, sorted_char_offsets: &[usize]) -> Option<Vec<usize>> {
    let mut result = Vec::with_capacity(sorted_char_offsets.len());
    let mut boundaries = text
        .char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .enumerate();
    let mut current = boundaries.next();
    for &wanted in sorted_char_offsets {
        loop {
            match current {
                Some((char_index, byte)) if char_index == wanted => {
                    result.push(byte);
                    break;
                }
                Some((char_index, _)) if char_index < wanted => current = boundaries.next(),
                _ => return None,
            }
        }
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::{byte_offsets, Document};

    #[test]
    fn slice_uses_char_offsets() {
        let doc = Document::new("naïve café");
        assert_eq!(doc.char_len(), 10);
        assert_eq!(doc.slice(0, 5), Some("naïve"));
        assert_eq!(doc.slice(6, 10), Some("café"));
        assert_eq!(doc.slice(6, 11), None);
        assert_eq!(doc.slice(3, 2), None);
    }

    #[test]
    fn byte_offsets_accepts_repeated_offsets() {
        assert_eq!(byte_offsets("ab", &[0, 0, 2]), Some(vec![0, 0, 2]));
        assert_eq!(byte_offsets("", &[0]), Some(vec![0]));
        assert_eq!(byte_offsets("", &[1]), None);
    }
}
