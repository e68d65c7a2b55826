//! Annotation interval use-case service.
//!
//! # Responsibility
//! - Validate and commit codings and paraphrases.
//! - Answer per-document interval queries and produce render segments.
//!
//! # Invariants
//! - Every committed interval satisfies `0 <= start < end <= length`.
//! - Code and document references resolve at commit time.
//! - Snapshot text is captured from the document, never from the caller.
//! - A rejected call performs no mutation.

use crate::model::annotation::{
    Coding, CodingId, DocumentAnnotations, Paraphrase, ParaphraseCategoryId, ParaphraseId, Span,
    SpanError,
};
use crate::model::code::CodeId;
use crate::model::document::{Document, DocumentId};
use crate::repo::annotation_repo::{AnnotationRepoError, AnnotationRepository};
use crate::repo::code_repo::CodeRepository;
use crate::repo::document_repo::DocumentSource;
use crate::segment::{render_segments, Segment, ViewFilter};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Which reference failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanReference {
    Code(CodeId),
    Document(DocumentId),
}

impl Display for OrphanReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code(id) => write!(f, "code {id}"),
            Self::Document(id) => write!(f, "document {id}"),
        }
    }
}

/// Errors from annotation service operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    /// `start >= end`.
    InvalidRange { start: usize, end: usize },
    /// `end` exceeds the document length.
    OutOfBounds { end: usize, length: usize },
    /// Code or document id does not resolve.
    OrphanReference(OrphanReference),
    CodingNotFound(CodingId),
    ParaphraseNotFound(ParaphraseId),
    /// Paraphrase text is blank after trim.
    EmptyParaphrase,
    /// Caller-supplied snapshot text differs from the document slice.
    TextMismatch { start: usize, end: usize },
    /// Repository-level failure.
    Repo(AnnotationRepoError),
}

impl Display for AnnotationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRange { start, end } => {
                write!(f, "invalid range: start {start} must be before end {end}")
            }
            Self::OutOfBounds { end, length } => {
                write!(f, "range end {end} exceeds document length {length}")
            }
            Self::OrphanReference(reference) => write!(f, "unresolved reference: {reference}"),
            Self::CodingNotFound(id) => write!(f, "coding not found: {id}"),
            Self::ParaphraseNotFound(id) => write!(f, "paraphrase not found: {id}"),
            Self::EmptyParaphrase => write!(f, "paraphrase text must not be blank"),
            Self::TextMismatch { start, end } => {
                write!(f, "text does not match document slice [{start}, {end})")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AnnotationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SpanError> for AnnotationError {
    fn from(value: SpanError) -> Self {
        match value {
            SpanError::InvalidRange { start, end } => Self::InvalidRange { start, end },
            SpanError::OutOfBounds { end, length } => Self::OutOfBounds { end, length },
        }
    }
}

impl From<AnnotationRepoError> for AnnotationError {
    fn from(value: AnnotationRepoError) -> Self {
        match value {
            AnnotationRepoError::CodingNotFound(id) => Self::CodingNotFound(id),
            AnnotationRepoError::ParaphraseNotFound(id) => Self::ParaphraseNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Input for creating one paraphrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParaphraseDraft {
    pub document_id: DocumentId,
    pub start: usize,
    pub end: usize,
    pub paraphrase_text: String,
    pub generalization: Option<String>,
    pub category_id: Option<ParaphraseCategoryId>,
}

/// Resolves a range against one document and returns its snapshot text.
///
/// Shared by manual entry, AI-assist and import so no path skips a check.
pub(crate) fn resolve_span<'d>(
    document: &'d Document,
    start: usize,
    end: usize,
    expected_text: Option<&str>,
) -> Result<&'d str, AnnotationError> {
    let span = Span::checked(start, end, document.char_len())?;
    let text = document
        .slice(span.start, span.end)
        .ok_or(AnnotationError::OutOfBounds {
            end,
            length: document.char_len(),
        })?;
    if let Some(expected) = expected_text {
        if expected != text {
            return Err(AnnotationError::TextMismatch { start, end });
        }
    }
    Ok(text)
}

/// Normalizes paraphrase and generalization text.
pub(crate) fn normalize_paraphrase_text(
    paraphrase_text: &str,
    generalization: Option<&str>,
) -> Result<(String, Option<String>), AnnotationError> {
    let trimmed = paraphrase_text.trim();
    if trimmed.is_empty() {
        return Err(AnnotationError::EmptyParaphrase);
    }
    let generalization = generalization
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    Ok((trimmed.to_string(), generalization))
}

/// Interval engine facade over annotation, code and document sources.
pub struct AnnotationService<'a, A, C, D>
where
    A: AnnotationRepository,
    C: CodeRepository,
    D: DocumentSource,
{
    annotations: &'a mut A,
    codes: &'a C,
    documents: &'a D,
}

impl<'a, A, C, D> AnnotationService<'a, A, C, D>
where
    A: AnnotationRepository,
    C: CodeRepository,
    D: DocumentSource,
{
    pub fn new(annotations: &'a mut A, codes: &'a C, documents: &'a D) -> Self {
        Self {
            annotations,
            codes,
            documents,
        }
    }

    /// Creates one coding with a generated id.
    pub fn create_coding(
        &mut self,
        code_id: CodeId,
        document_id: DocumentId,
        start: usize,
        end: usize,
    ) -> Result<Coding, AnnotationError> {
        self.create_coding_with_id(Uuid::new_v4(), code_id, document_id, start, end, None)
    }

    /// Creates one coding with a caller-provided id.
    ///
    /// When `expected_text` is given it must equal the document slice.
    pub fn create_coding_with_id(
        &mut self,
        id: CodingId,
        code_id: CodeId,
        document_id: DocumentId,
        start: usize,
        end: usize,
        expected_text: Option<&str>,
    ) -> Result<Coding, AnnotationError> {
        if self.codes.get_code(code_id).is_none() {
            return Err(AnnotationError::OrphanReference(OrphanReference::Code(code_id)));
        }
        let document = self.document(document_id)?;
        let text = resolve_span(document, start, end, expected_text)?;

        let coding = self.annotations.insert_coding(Coding {
            id,
            code_id,
            document_id,
            start,
            end,
            text: text.to_string(),
        })?;
        debug!(
            "event=coding_create module=intervals status=ok coding_id={} code_id={} document_id={} start={} end={}",
            coding.id, code_id, document_id, start, end
        );
        Ok(coding)
    }

    /// Creates one paraphrase with a generated id.
    pub fn create_paraphrase(&mut self, draft: ParaphraseDraft) -> Result<Paraphrase, AnnotationError> {
        self.create_paraphrase_with_id(Uuid::new_v4(), draft, None)
    }

    /// Creates one paraphrase with a caller-provided id.
    pub fn create_paraphrase_with_id(
        &mut self,
        id: ParaphraseId,
        draft: ParaphraseDraft,
        expected_original: Option<&str>,
    ) -> Result<Paraphrase, AnnotationError> {
        let document = self.document(draft.document_id)?;
        let original = resolve_span(document, draft.start, draft.end, expected_original)?;
        let (paraphrase_text, generalization) =
            normalize_paraphrase_text(&draft.paraphrase_text, draft.generalization.as_deref())?;

        let paraphrase = self.annotations.insert_paraphrase(Paraphrase {
            id,
            document_id: draft.document_id,
            start: draft.start,
            end: draft.end,
            original_text: original.to_string(),
            paraphrase_text,
            generalization,
            category_id: draft.category_id,
        })?;
        debug!(
            "event=paraphrase_create module=intervals status=ok paraphrase_id={} document_id={} start={} end={}",
            paraphrase.id, paraphrase.document_id, paraphrase.start, paraphrase.end
        );
        Ok(paraphrase)
    }

    /// Replaces paraphrase and generalization text; the span is unchanged.
    pub fn update_paraphrase(
        &mut self,
        id: ParaphraseId,
        paraphrase_text: &str,
        generalization: Option<&str>,
    ) -> Result<Paraphrase, AnnotationError> {
        let mut paraphrase = self
            .annotations
            .get_paraphrase(id)
            .ok_or(AnnotationError::ParaphraseNotFound(id))?;
        let (text, generalization) = normalize_paraphrase_text(paraphrase_text, generalization)?;
        paraphrase.paraphrase_text = text;
        paraphrase.generalization = generalization;
        self.annotations.replace_paraphrase(paraphrase.clone())?;
        Ok(paraphrase)
    }

    /// Removes one coding. Absent ids yield `CodingNotFound` and change nothing.
    pub fn remove_coding(&mut self, id: CodingId) -> Result<Coding, AnnotationError> {
        let removed = self.annotations.remove_coding(id)?;
        debug!(
            "event=coding_remove module=intervals status=ok coding_id={}",
            id
        );
        Ok(removed)
    }

    /// Removes one paraphrase. Absent ids yield `ParaphraseNotFound`.
    pub fn remove_paraphrase(&mut self, id: ParaphraseId) -> Result<Paraphrase, AnnotationError> {
        let removed = self.annotations.remove_paraphrase(id)?;
        debug!(
            "event=paraphrase_remove module=intervals status=ok paraphrase_id={}",
            id
        );
        Ok(removed)
    }

    /// Every coding and paraphrase anchored to one document.
    pub fn list_by_document(
        &self,
        document_id: DocumentId,
    ) -> Result<DocumentAnnotations, AnnotationError> {
        self.document(document_id)?;
        Ok(self.annotations.annotations_for_document(document_id))
    }

    pub fn codings_for_code(&self, code_id: CodeId) -> Result<Vec<Coding>, AnnotationError> {
        if self.codes.get_code(code_id).is_none() {
            return Err(AnnotationError::OrphanReference(OrphanReference::Code(code_id)));
        }
        Ok(self.annotations.codings_for_code(code_id))
    }

    /// Intervals of one document covering the char at `offset`.
    pub fn annotations_at(
        &self,
        document_id: DocumentId,
        offset: usize,
    ) -> Result<DocumentAnnotations, AnnotationError> {
        let mut all = self.list_by_document(document_id)?;
        all.codings.retain(|coding| coding.span().contains(offset));
        all.paraphrases
            .retain(|paraphrase| paraphrase.span().contains(offset));
        Ok(all)
    }

    /// Render segments of one document under `filter`.
    pub fn segments(
        &self,
        document_id: DocumentId,
        filter: ViewFilter,
    ) -> Result<Vec<Segment<'a>>, AnnotationError> {
        let document = self.document(document_id)?;
        Ok(render_segments(document, &*self.annotations, filter))
    }

    fn document(&self, document_id: DocumentId) -> Result<&'a Document, AnnotationError> {
        let documents: &'a D = self.documents;
        documents
            .get_document(document_id)
            .ok_or(AnnotationError::OrphanReference(OrphanReference::Document(document_id)))
    }
}
