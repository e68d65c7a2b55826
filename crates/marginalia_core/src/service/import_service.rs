//! Bulk import of codes, codings and paraphrases.
//!
//! # Responsibility
//! - Decode import batches produced by external format parsers.
//! - Validate a whole batch against current state before touching it.
//! - Commit accepted records through the same creation paths as manual entry.
//!
//! # Invariants
//! - Policy is all-or-nothing: any failing record rejects the whole batch and
//!   every failing record is reported.
//! - Ids are unique across the batch and existing state.
//! - Code parents resolve (inside the batch or already stored) and the
//!   combined forest stays acyclic.
//! - Every range is valid for its named document; supplied snapshot text
//!   must match the document.

use crate::config::CoreConfig;
use crate::model::annotation::{CodingId, ParaphraseCategoryId, ParaphraseId};
use crate::model::code::{normalize_code_name, normalize_color, Code, CodeId};
use crate::model::document::{Document, DocumentId};
use crate::repo::annotation_repo::AnnotationRepository;
use crate::repo::code_repo::CodeRepository;
use crate::repo::document_repo::DocumentSource;
use crate::service::annotation_service::{
    normalize_paraphrase_text, resolve_span, AnnotationService, ParaphraseDraft,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Code record as produced by an import parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRecord {
    pub id: CodeId,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub parent_id: Option<CodeId>,
}

/// Coding record as produced by an import parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodingRecord {
    pub id: CodingId,
    pub code_id: CodeId,
    pub document_id: DocumentId,
    pub start: usize,
    pub end: usize,
    /// Optional snapshot; checked against the document when present.
    #[serde(default)]
    pub text: Option<String>,
}

/// Paraphrase record as produced by an import parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParaphraseRecord {
    pub id: ParaphraseId,
    pub document_id: DocumentId,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub original_text: Option<String>,
    pub paraphrase_text: String,
    #[serde(default)]
    pub generalization: Option<String>,
    #[serde(default)]
    pub category_id: Option<ParaphraseCategoryId>,
}

/// One bulk-ingestion unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportBatch {
    pub codes: Vec<CodeRecord>,
    pub codings: Vec<CodingRecord>,
    pub paraphrases: Vec<ParaphraseRecord>,
}

impl ImportBatch {
    pub fn from_json_str(value: &str) -> Result<Self, ImportError> {
        serde_json::from_str(value).map_err(ImportError::Decode)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        Self::from_json_str(&read_file(path.as_ref())?)
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty() && self.codings.is_empty() && self.paraphrases.is_empty()
    }
}

/// Documents plus an import batch and optional config, loaded as one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectBundle {
    pub documents: Vec<Document>,
    pub batch: ImportBatch,
    pub config: Option<CoreConfig>,
}

impl ProjectBundle {
    pub fn from_json_str(value: &str) -> Result<Self, ImportError> {
        serde_json::from_str(value).map_err(ImportError::Decode)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        Self::from_json_str(&read_file(path.as_ref())?)
    }
}

/// Record namespace inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportRecordKind {
    Code,
    Coding,
    Paraphrase,
}

impl Display for ImportRecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code => write!(f, "code"),
            Self::Coding => write!(f, "coding"),
            Self::Paraphrase => write!(f, "paraphrase"),
        }
    }
}

/// One rejected record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    pub kind: ImportRecordKind,
    /// Position inside its batch list.
    pub index: usize,
    pub id: uuid::Uuid,
    pub reason: String,
}

impl Display for ImportFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} #{} ({}): {}", self.kind, self.index, self.id, self.reason)
    }
}

/// Counts of committed records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub codes: usize,
    pub codings: usize,
    pub paraphrases: usize,
}

/// Errors from import operations.
#[derive(Debug)]
pub enum ImportError {
    /// Input file could not be read.
    Io { path: PathBuf, source: std::io::Error },
    /// Input is not a valid batch document.
    Decode(serde_json::Error),
    /// Batch failed validation; nothing was applied.
    Rejected(Vec<ImportFailure>),
    /// A validated record failed to commit.
    Apply(ImportFailure),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read import file `{}`: {source}", path.display())
            }
            Self::Decode(err) => write!(f, "invalid import batch: {err}"),
            Self::Rejected(failures) => {
                write!(f, "import batch rejected with {} failure(s)", failures.len())?;
                for failure in failures {
                    write!(f, "; {failure}")?;
                }
                Ok(())
            }
            Self::Apply(failure) => write!(f, "import commit failed: {failure}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Decode(err) => Some(err),
            Self::Rejected(_) | Self::Apply(_) => None,
        }
    }
}

impl ImportError {
    /// Failing records, empty for I/O and decode errors.
    pub fn failures(&self) -> &[ImportFailure] {
        match self {
            Self::Rejected(failures) => failures,
            Self::Apply(failure) => std::slice::from_ref(failure),
            _ => &[],
        }
    }
}

/// Validates `batch` and commits it.
///
/// On `Err(Rejected)` no repository has been touched.
pub fn import_batch<C, A, D>(
    codes: &mut C,
    annotations: &mut A,
    documents: &D,
    batch: &ImportBatch,
) -> Result<ImportReport, ImportError>
where
    C: CodeRepository,
    A: AnnotationRepository,
    D: DocumentSource,
{
    let failures = validate_batch(&*codes, &*annotations, documents, batch);
    if !failures.is_empty() {
        warn!(
            "event=import_batch module=import status=rejected failures={} codes={} codings={} paraphrases={}",
            failures.len(),
            batch.codes.len(),
            batch.codings.len(),
            batch.paraphrases.len()
        );
        return Err(ImportError::Rejected(failures));
    }

    insert_codes_parents_first(codes, &batch.codes)?;

    let mut service = AnnotationService::new(annotations, &*codes, documents);
    for (index, record) in batch.codings.iter().enumerate() {
        service
            .create_coding_with_id(
                record.id,
                record.code_id,
                record.document_id,
                record.start,
                record.end,
                record.text.as_deref(),
            )
            .map_err(|err| apply_failure(ImportRecordKind::Coding, index, record.id, err))?;
    }
    for (index, record) in batch.paraphrases.iter().enumerate() {
        let draft = ParaphraseDraft {
            document_id: record.document_id,
            start: record.start,
            end: record.end,
            paraphrase_text: record.paraphrase_text.clone(),
            generalization: record.generalization.clone(),
            category_id: record.category_id,
        };
        service
            .create_paraphrase_with_id(record.id, draft, record.original_text.as_deref())
            .map_err(|err| apply_failure(ImportRecordKind::Paraphrase, index, record.id, err))?;
    }

    let report = ImportReport {
        codes: batch.codes.len(),
        codings: batch.codings.len(),
        paraphrases: batch.paraphrases.len(),
    };
    info!(
        "event=import_batch module=import status=ok codes={} codings={} paraphrases={}",
        report.codes, report.codings, report.paraphrases
    );
    Ok(report)
}

/// Collects every failing record of `batch` without mutating anything.
pub fn validate_batch<C, A, D>(
    codes: &C,
    annotations: &A,
    documents: &D,
    batch: &ImportBatch,
) -> Vec<ImportFailure>
where
    C: CodeRepository,
    A: AnnotationRepository,
    D: DocumentSource,
{
    let mut failures = Vec::new();
    let mut fail = |kind, index, id, reason: String| {
        failures.push(ImportFailure {
            kind,
            index,
            id,
            reason,
        })
    };

    let mut batch_codes: HashMap<CodeId, &CodeRecord> = HashMap::new();
    for (index, record) in batch.codes.iter().enumerate() {
        if codes.get_code(record.id).is_some() || batch_codes.contains_key(&record.id) {
            fail(ImportRecordKind::Code, index, record.id, "duplicate code id".to_string());
            continue;
        }
        batch_codes.insert(record.id, record);
        if let Err(err) = normalize_code_name(&record.name) {
            fail(ImportRecordKind::Code, index, record.id, err.to_string());
        }
        if let Err(err) = normalize_color(&record.color) {
            fail(ImportRecordKind::Code, index, record.id, err.to_string());
        }
    }
    for (index, record) in batch.codes.iter().enumerate() {
        let Some(parent_id) = record.parent_id else {
            continue;
        };
        if !batch_codes.contains_key(&parent_id) && codes.get_code(parent_id).is_none() {
            fail(
                ImportRecordKind::Code,
                index,
                record.id,
                format!("parent code not found: {parent_id}"),
            );
        } else if parent_chain_cycles(record.id, &batch_codes) {
            fail(
                ImportRecordKind::Code,
                index,
                record.id,
                "parent chain forms a cycle".to_string(),
            );
        }
    }

    let mut coding_ids = HashSet::new();
    for (index, record) in batch.codings.iter().enumerate() {
        if annotations.get_coding(record.id).is_some() || !coding_ids.insert(record.id) {
            fail(ImportRecordKind::Coding, index, record.id, "duplicate coding id".to_string());
            continue;
        }
        if !batch_codes.contains_key(&record.code_id) && codes.get_code(record.code_id).is_none() {
            fail(
                ImportRecordKind::Coding,
                index,
                record.id,
                format!("code not found: {}", record.code_id),
            );
        }
        match documents.get_document(record.document_id) {
            None => fail(
                ImportRecordKind::Coding,
                index,
                record.id,
                format!("document not found: {}", record.document_id),
            ),
            Some(document) => {
                if let Err(err) =
                    resolve_span(document, record.start, record.end, record.text.as_deref())
                {
                    fail(ImportRecordKind::Coding, index, record.id, err.to_string());
                }
            }
        }
    }

    let mut paraphrase_ids = HashSet::new();
    for (index, record) in batch.paraphrases.iter().enumerate() {
        if annotations.get_paraphrase(record.id).is_some() || !paraphrase_ids.insert(record.id) {
            fail(
                ImportRecordKind::Paraphrase,
                index,
                record.id,
                "duplicate paraphrase id".to_string(),
            );
            continue;
        }
        if let Err(err) = normalize_paraphrase_text(&record.paraphrase_text, None) {
            fail(ImportRecordKind::Paraphrase, index, record.id, err.to_string());
        }
        match documents.get_document(record.document_id) {
            None => fail(
                ImportRecordKind::Paraphrase,
                index,
                record.id,
                format!("document not found: {}", record.document_id),
            ),
            Some(document) => {
                if let Err(err) = resolve_span(
                    document,
                    record.start,
                    record.end,
                    record.original_text.as_deref(),
                ) {
                    fail(ImportRecordKind::Paraphrase, index, record.id, err.to_string());
                }
            }
        }
    }

    failures
}

/// Walks the parent chain inside the batch. Chains that leave the batch end
/// in stored codes, which are already acyclic.
fn parent_chain_cycles(start: CodeId, batch_codes: &HashMap<CodeId, &CodeRecord>) -> bool {
    let mut visited = HashSet::from([start]);
    let mut cursor = batch_codes.get(&start).and_then(|record| record.parent_id);
    while let Some(current) = cursor {
        if !visited.insert(current) {
            return true;
        }
        cursor = match batch_codes.get(&current) {
            Some(record) => record.parent_id,
            None => return false,
        };
    }
    false
}

fn insert_codes_parents_first<C: CodeRepository>(
    codes: &mut C,
    records: &[CodeRecord],
) -> Result<(), ImportError> {
    let mut pending = records.iter().enumerate().collect::<Vec<_>>();
    while !pending.is_empty() {
        let before = pending.len();
        let mut deferred = Vec::new();
        for (index, record) in pending {
            let parent_ready = record
                .parent_id
                .map_or(true, |parent_id| codes.get_code(parent_id).is_some());
            if !parent_ready {
                deferred.push((index, record));
                continue;
            }
            let code = Code::with_id(record.id, &record.name, &record.color, record.parent_id)
                .map_err(|err| apply_failure(ImportRecordKind::Code, index, record.id, err))?;
            codes
                .insert_code(code)
                .map_err(|err| apply_failure(ImportRecordKind::Code, index, record.id, err))?;
        }
        if deferred.len() == before {
            let (index, record) = deferred[0];
            return Err(apply_failure(
                ImportRecordKind::Code,
                index,
                record.id,
                "unresolvable parent chain",
            ));
        }
        pending = deferred;
    }
    Ok(())
}

fn apply_failure(
    kind: ImportRecordKind,
    index: usize,
    id: uuid::Uuid,
    reason: impl Display,
) -> ImportError {
    ImportError::Apply(ImportFailure {
        kind,
        index,
        id,
        reason: reason.to_string(),
    })
}

fn read_file(path: &Path) -> Result<String, ImportError> {
    std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
