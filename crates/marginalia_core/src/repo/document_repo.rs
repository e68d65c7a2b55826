//! Read-only document source contract.
//!
//! The core never writes document text. `InMemoryDocumentSource` is the
//! default source used by `Workspace`; hosts with their own storage implement
//! `DocumentSource` directly.

use crate::model::document::{Document, DocumentId};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from registering documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSourceError {
    DuplicateId(DocumentId),
}

impl Display for DocumentSourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "document id already exists: {id}"),
        }
    }
}

impl Error for DocumentSourceError {}

/// Supplier of immutable `{id, text}` pairs.
pub trait DocumentSource {
    fn get_document(&self, id: DocumentId) -> Option<&Document>;
    /// Every document in registration order.
    fn list_documents(&self) -> Vec<&Document>;
}

impl<T: DocumentSource + ?Sized> DocumentSource for &T {
    fn get_document(&self, id: DocumentId) -> Option<&Document> {
        (**self).get_document(id)
    }

    fn list_documents(&self) -> Vec<&Document> {
        (**self).list_documents()
    }
}

/// Registration-ordered in-memory document source.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentSource {
    documents: Vec<Document>,
    index: HashMap<DocumentId, usize>,
    revision: u64,
}

impl InMemoryDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one document. Text is never modified afterwards.
    pub fn add_document(&mut self, document: Document) -> Result<DocumentId, DocumentSourceError> {
        if self.index.contains_key(&document.id) {
            return Err(DocumentSourceError::DuplicateId(document.id));
        }
        let id = document.id;
        self.index.insert(id, self.documents.len());
        self.documents.push(document);
        self.revision += 1;
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document_ids(&self) -> Vec<DocumentId> {
        self.documents.iter().map(|document| document.id).collect()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl DocumentSource for InMemoryDocumentSource {
    fn get_document(&self, id: DocumentId) -> Option<&Document> {
        self.index
            .get(&id)
            .and_then(|position| self.documents.get(*position))
    }

    fn list_documents(&self) -> Vec<&Document> {
        self.documents.iter().collect()
    }
}
