//! Coding and paraphrase interval records.
//!
//! # Responsibility
//! - Define the two independent annotation namespaces over document text.
//! - Provide half-open span arithmetic shared by the interval engine and
//!   analytics.
//!
//! # Invariants
//! - `0 <= start < end <= length(document)` for every stored interval.
//! - `Coding::text` / `Paraphrase::original_text` are snapshots taken at
//!   creation and are never re-derived.

use crate::model::code::CodeId;
use crate::model::document::DocumentId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier of one coding.
pub type CodingId = uuid::Uuid;
/// Stable identifier of one paraphrase.
pub type ParaphraseId = uuid::Uuid;
/// Opaque paraphrase category reference. Not resolved by the core.
pub type ParaphraseCategoryId = uuid::Uuid;

/// Half-open char range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Range validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanError {
    /// `start >= end`.
    InvalidRange { start: usize, end: usize },
    /// `end` exceeds the document length.
    OutOfBounds { end: usize, length: usize },
}

impl Display for SpanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRange { start, end } => {
                write!(f, "invalid range: start {start} must be before end {end}")
            }
            Self::OutOfBounds { end, length } => {
                write!(f, "range end {end} exceeds document length {length}")
            }
        }
    }
}

impl Error for SpanError {}

impl Span {
    /// Validates a range against a document length.
    pub fn checked(start: usize, end: usize, length: usize) -> Result<Self, SpanError> {
        if start >= end {
            return Err(SpanError::InvalidRange { start, end });
        }
        if end > length {
            return Err(SpanError::OutOfBounds { end, length });
        }
        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Chars between the two spans; `0` when they overlap or touch.
    pub fn gap_to(&self, other: &Span) -> usize {
        if self.overlaps(other) {
            return 0;
        }
        self.start
            .max(other.start)
            .saturating_sub(self.end.min(other.end))
    }
}

/// One code applied to one document span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coding {
    pub id: CodingId,
    pub code_id: CodeId,
    pub document_id: DocumentId,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Coding {
    pub fn span(&self) -> Span {
        Span {
            start: self.start,
            end: self.end,
        }
    }
}

/// Human or AI-authored restatement of one document span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paraphrase {
    pub id: ParaphraseId,
    pub document_id: DocumentId,
    pub start: usize,
    pub end: usize,
    pub original_text: String,
    pub paraphrase_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generalization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<ParaphraseCategoryId>,
}

impl Paraphrase {
    pub fn span(&self) -> Span {
        Span {
            start: self.start,
            end: self.end,
        }
    }
}

/// Every interval anchored to one document, ordered by `(start, end, creation)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentAnnotations {
    pub codings: Vec<Coding>,
    pub paraphrases: Vec<Paraphrase>,
}

impl DocumentAnnotations {
    pub fn is_empty(&self) -> bool {
        self.codings.is_empty() && self.paraphrases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.codings.len() + self.paraphrases.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{Span, SpanError};

    #[test]
    fn checked_rejects_empty_and_overflowing_ranges() {
        assert_eq!(
            Span::checked(3, 3, 10),
            Err(SpanError::InvalidRange { start: 3, end: 3 })
        );
        assert_eq!(
            Span::checked(2, 11, 10),
            Err(SpanError::OutOfBounds { end: 11, length: 10 })
        );
        assert_eq!(Span::checked(0, 10, 10), Ok(Span { start: 0, end: 10 }));
    }

    #[test]
    fn gap_is_zero_for_overlap_and_touching() {
        let a = Span { start: 0, end: 5 };
        assert_eq!(a.gap_to(&Span { start: 3, end: 8 }), 0);
        assert_eq!(a.gap_to(&Span { start: 5, end: 8 }), 0);
        assert_eq!(a.gap_to(&Span { start: 105, end: 110 }), 100);
        assert_eq!(Span { start: 105, end: 110 }.gap_to(&a), 100);
    }
}
