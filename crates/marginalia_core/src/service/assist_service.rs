//! AI-assist suggestion intake.
//!
//! # Responsibility
//! - Accept already-resolved coding/paraphrase suggestions from an external
//!   assistant.
//! - Commit them through the same validated creation path as manual entry.
//!
//! # Invariants
//! - A suggestion whose quoted text differs from the document is rejected.
//! - Suggestions are independent: one rejection never blocks the others.

use crate::model::annotation::{CodingId, ParaphraseCategoryId, ParaphraseId};
use crate::model::code::CodeId;
use crate::model::document::DocumentId;
use crate::repo::annotation_repo::AnnotationRepository;
use crate::repo::code_repo::CodeRepository;
use crate::repo::document_repo::DocumentSource;
use crate::service::annotation_service::{AnnotationError, AnnotationService, ParaphraseDraft};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Candidate coding proposed by an assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedCoding {
    pub code_id: CodeId,
    pub start: usize,
    pub end: usize,
    /// Quoted span text; must equal the document slice.
    pub text: String,
}

/// Candidate paraphrase proposed by an assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedParaphrase {
    pub start: usize,
    pub end: usize,
    pub paraphrase_text: String,
    #[serde(default)]
    pub generalization: Option<String>,
    #[serde(default)]
    pub category_id: Option<ParaphraseCategoryId>,
}

/// Per-suggestion result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionOutcome<Id> {
    Accepted(Id),
    Rejected(AnnotationError),
}

impl<Id> SuggestionOutcome<Id> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Accepts one coding suggestion for `document_id`.
pub fn accept_coding<A, C, D>(
    service: &mut AnnotationService<'_, A, C, D>,
    document_id: DocumentId,
    suggestion: &SuggestedCoding,
) -> Result<CodingId, AnnotationError>
where
    A: AnnotationRepository,
    C: CodeRepository,
    D: DocumentSource,
{
    service
        .create_coding_with_id(
            Uuid::new_v4(),
            suggestion.code_id,
            document_id,
            suggestion.start,
            suggestion.end,
            Some(suggestion.text.as_str()),
        )
        .map(|coding| coding.id)
}

/// Accepts one paraphrase suggestion for `document_id`.
pub fn accept_paraphrase<A, C, D>(
    service: &mut AnnotationService<'_, A, C, D>,
    document_id: DocumentId,
    suggestion: &SuggestedParaphrase,
) -> Result<ParaphraseId, AnnotationError>
where
    A: AnnotationRepository,
    C: CodeRepository,
    D: DocumentSource,
{
    service
        .create_paraphrase(ParaphraseDraft {
            document_id,
            start: suggestion.start,
            end: suggestion.end,
            paraphrase_text: suggestion.paraphrase_text.clone(),
            generalization: suggestion.generalization.clone(),
            category_id: suggestion.category_id,
        })
        .map(|paraphrase| paraphrase.id)
}

/// Accepts a batch of coding suggestions, reporting each outcome in order.
pub fn accept_codings<A, C, D>(
    service: &mut AnnotationService<'_, A, C, D>,
    document_id: DocumentId,
    suggestions: &[SuggestedCoding],
) -> Vec<SuggestionOutcome<CodingId>>
where
    A: AnnotationRepository,
    C: CodeRepository,
    D: DocumentSource,
{
    let outcomes = suggestions
        .iter()
        .map(|suggestion| match accept_coding(service, document_id, suggestion) {
            Ok(id) => SuggestionOutcome::Accepted(id),
            Err(err) => SuggestionOutcome::Rejected(err),
        })
        .collect::<Vec<_>>();
    log_batch("coding", document_id, &outcomes);
    outcomes
}

/// Accepts a batch of paraphrase suggestions, reporting each outcome in order.
pub fn accept_paraphrases<A, C, D>(
    service: &mut AnnotationService<'_, A, C, D>,
    document_id: DocumentId,
    suggestions: &[SuggestedParaphrase],
) -> Vec<SuggestionOutcome<ParaphraseId>>
where
    A: AnnotationRepository,
    C: CodeRepository,
    D: DocumentSource,
{
    let outcomes = suggestions
        .iter()
        .map(
            |suggestion| match accept_paraphrase(service, document_id, suggestion) {
                Ok(id) => SuggestionOutcome::Accepted(id),
                Err(err) => SuggestionOutcome::Rejected(err),
            },
        )
        .collect::<Vec<_>>();
    log_batch("paraphrase", document_id, &outcomes);
    outcomes
}

fn log_batch<Id>(kind: &str, document_id: DocumentId, outcomes: &[SuggestionOutcome<Id>]) {
    let accepted = outcomes.iter().filter(|outcome| outcome.is_accepted()).count();
    info!(
        "event=assist_accept module=assist status=ok kind={} document_id={} accepted={} rejected={}",
        kind,
        document_id,
        accepted,
        outcomes.len() - accepted
    );
}
