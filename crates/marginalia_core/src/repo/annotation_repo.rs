//! Annotation repository contracts and in-memory implementation.
//!
//! # Responsibility
//! - Store codings and paraphrases in two separate namespaces.
//! - Answer per-document, per-code and per-offset interval queries.
//!
//! # Invariants
//! - Listings follow creation order unless stated otherwise.
//! - Range and reference validation happens in the annotation service; the
//!   repository only guards id uniqueness.

use crate::model::annotation::{Coding, CodingId, DocumentAnnotations, Paraphrase, ParaphraseId};
use crate::model::code::CodeId;
use crate::model::document::DocumentId;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by annotation repository operations.
pub type AnnotationRepoResult<T> = Result<T, AnnotationRepoError>;

/// Errors from annotation repository operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationRepoError {
    CodingNotFound(CodingId),
    ParaphraseNotFound(ParaphraseId),
    DuplicateCodingId(CodingId),
    DuplicateParaphraseId(ParaphraseId),
}

impl Display for AnnotationRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CodingNotFound(id) => write!(f, "coding not found: {id}"),
            Self::ParaphraseNotFound(id) => write!(f, "paraphrase not found: {id}"),
            Self::DuplicateCodingId(id) => write!(f, "coding id already exists: {id}"),
            Self::DuplicateParaphraseId(id) => write!(f, "paraphrase id already exists: {id}"),
        }
    }
}

impl Error for AnnotationRepoError {}

/// Repository interface for coding and paraphrase intervals.
pub trait AnnotationRepository {
    fn insert_coding(&mut self, coding: Coding) -> AnnotationRepoResult<Coding>;
    fn insert_paraphrase(&mut self, paraphrase: Paraphrase) -> AnnotationRepoResult<Paraphrase>;
    fn get_coding(&self, id: CodingId) -> Option<Coding>;
    fn get_paraphrase(&self, id: ParaphraseId) -> Option<Paraphrase>;
    /// Replaces a stored paraphrase with the same id.
    fn replace_paraphrase(&mut self, paraphrase: Paraphrase) -> AnnotationRepoResult<()>;
    fn remove_coding(&mut self, id: CodingId) -> AnnotationRepoResult<Coding>;
    fn remove_paraphrase(&mut self, id: ParaphraseId) -> AnnotationRepoResult<Paraphrase>;
    /// Removes every coding labeled by one of `code_ids`; returns removed ids.
    fn remove_codings_for_codes(&mut self, code_ids: &HashSet<CodeId>) -> Vec<CodingId>;
    /// All codings in creation order.
    fn list_codings(&self) -> Vec<Coding>;
    /// All paraphrases in creation order.
    fn list_paraphrases(&self) -> Vec<Paraphrase>;
    fn codings_for_code(&self, code_id: CodeId) -> Vec<Coding>;
    /// Codings and paraphrases of one document ordered by `(start, end, creation)`.
    fn annotations_for_document(&self, document_id: DocumentId) -> DocumentAnnotations;
    /// Monotonic counter bumped by every successful mutation.
    fn revision(&self) -> u64;
}

/// Creation-ordered id store.
#[derive(Debug, Clone)]
struct SeqStore<T> {
    by_seq: BTreeMap<u64, T>,
    seq_by_id: HashMap<uuid::Uuid, u64>,
    next_seq: u64,
}

impl<T> Default for SeqStore<T> {
    fn default() -> Self {
        Self {
            by_seq: BTreeMap::new(),
            seq_by_id: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<T> SeqStore<T> {
    fn contains(&self, id: uuid::Uuid) -> bool {
        self.seq_by_id.contains_key(&id)
    }

    fn insert(&mut self, id: uuid::Uuid, value: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.seq_by_id.insert(id, seq);
        self.by_seq.insert(seq, value);
    }

    fn get(&self, id: uuid::Uuid) -> Option<&T> {
        self.seq_by_id
            .get(&id)
            .and_then(|seq| self.by_seq.get(seq))
    }

    fn get_mut(&mut self, id: uuid::Uuid) -> Option<&mut T> {
        let seq = self.seq_by_id.get(&id)?;
        self.by_seq.get_mut(seq)
    }

    fn remove(&mut self, id: uuid::Uuid) -> Option<T> {
        let seq = self.seq_by_id.remove(&id)?;
        self.by_seq.remove(&seq)
    }

    fn values(&self) -> impl Iterator<Item = &T> {
        self.by_seq.values()
    }

    fn len(&self) -> usize {
        self.by_seq.len()
    }
}

/// In-memory annotation store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAnnotationRepository {
    codings: SeqStore<Coding>,
    paraphrases: SeqStore<Paraphrase>,
    revision: u64,
}

impl InMemoryAnnotationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coding_count(&self) -> usize {
        self.codings.len()
    }

    pub fn paraphrase_count(&self) -> usize {
        self.paraphrases.len()
    }

    pub fn contains_coding(&self, id: CodingId) -> bool {
        self.codings.contains(id)
    }

    pub fn contains_paraphrase(&self, id: ParaphraseId) -> bool {
        self.paraphrases.contains(id)
    }
}

impl AnnotationRepository for InMemoryAnnotationRepository {
    fn insert_coding(&mut self, coding: Coding) -> AnnotationRepoResult<Coding> {
        if self.codings.contains(coding.id) {
            return Err(AnnotationRepoError::DuplicateCodingId(coding.id));
        }
        self.codings.insert(coding.id, coding.clone());
        self.revision += 1;
        Ok(coding)
    }

    fn insert_paraphrase(&mut self, paraphrase: Paraphrase) -> AnnotationRepoResult<Paraphrase> {
        if self.paraphrases.contains(paraphrase.id) {
            return Err(AnnotationRepoError::DuplicateParaphraseId(paraphrase.id));
        }
        self.paraphrases.insert(paraphrase.id, paraphrase.clone());
        self.revision += 1;
        Ok(paraphrase)
    }

    fn get_coding(&self, id: CodingId) -> Option<Coding> {
        self.codings.get(id).cloned()
    }

    fn get_paraphrase(&self, id: ParaphraseId) -> Option<Paraphrase> {
        self.paraphrases.get(id).cloned()
    }

    fn replace_paraphrase(&mut self, paraphrase: Paraphrase) -> AnnotationRepoResult<()> {
        let slot = self
            .paraphrases
            .get_mut(paraphrase.id)
            .ok_or(AnnotationRepoError::ParaphraseNotFound(paraphrase.id))?;
        *slot = paraphrase;
        self.revision += 1;
        Ok(())
    }

    fn remove_coding(&mut self, id: CodingId) -> AnnotationRepoResult<Coding> {
        let removed = self
            .codings
            .remove(id)
            .ok_or(AnnotationRepoError::CodingNotFound(id))?;
        self.revision += 1;
        Ok(removed)
    }

    fn remove_paraphrase(&mut self, id: ParaphraseId) -> AnnotationRepoResult<Paraphrase> {
        let removed = self
            .paraphrases
            .remove(id)
            .ok_or(AnnotationRepoError::ParaphraseNotFound(id))?;
        self.revision += 1;
        Ok(removed)
    }

    fn remove_codings_for_codes(&mut self, code_ids: &HashSet<CodeId>) -> Vec<CodingId> {
        let doomed = self
            .codings
            .values()
            .filter(|coding| code_ids.contains(&coding.code_id))
            .map(|coding| coding.id)
            .collect::<Vec<_>>();
        for id in &doomed {
            self.codings.remove(*id);
        }
        if !doomed.is_empty() {
            self.revision += 1;
        }
        doomed
    }

    fn list_codings(&self) -> Vec<Coding> {
        self.codings.values().cloned().collect()
    }

    fn list_paraphrases(&self) -> Vec<Paraphrase> {
        self.paraphrases.values().cloned().collect()
    }

    fn codings_for_code(&self, code_id: CodeId) -> Vec<Coding> {
        self.codings
            .values()
            .filter(|coding| coding.code_id == code_id)
            .cloned()
            .collect()
    }

    fn annotations_for_document(&self, document_id: DocumentId) -> DocumentAnnotations {
        let mut codings = self
            .codings
            .values()
            .filter(|coding| coding.document_id == document_id)
            .cloned()
            .collect::<Vec<_>>();
        let mut paraphrases = self
            .paraphrases
            .values()
            .filter(|paraphrase| paraphrase.document_id == document_id)
            .cloned()
            .collect::<Vec<_>>();
        // Stable sort keeps creation order for identical spans.
        codings.sort_by_key(|coding| coding.span());
        paraphrases.sort_by_key(|paraphrase| paraphrase.span());
        DocumentAnnotations {
            codings,
            paraphrases,
        }
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}
