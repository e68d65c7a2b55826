//! Single owner of documents, codes and annotations.
//!
//! # Responsibility
//! - Hand out taxonomy and interval services over the owned repositories.
//! - Track a monotonic version used to memoize analytics.
//! - Stage bulk imports so a failed import leaves state untouched.
//!
//! # Invariants
//! - Every successful mutation bumps `version()`.
//! - `SharedWorkspace` writers hold the write lock for a whole operation.

use crate::analytics::cache::{AnalyticsCache, AnalyticsKey, AnalyticsValue, CacheStats};
use crate::analytics::cooccurrence::{
    document_cooccurrence, segment_cooccurrence, CooccurrenceMatrix, ProximityOptions,
};
use crate::analytics::frequency::{code_frequencies, CodeFrequency};
use crate::analytics::heatmap::{code_document_heatmap, Heatmap};
use crate::config::{ConfigError, CoreConfig};
use crate::model::annotation::{CodingId, ParaphraseId};
use crate::model::code::{Code, CodeId};
use crate::model::document::{Document, DocumentId};
use crate::repo::annotation_repo::{AnnotationRepository, InMemoryAnnotationRepository};
use crate::repo::code_repo::{CodeRepository, InMemoryCodeRepository};
use crate::repo::document_repo::{DocumentSource, DocumentSourceError, InMemoryDocumentSource};
use crate::segment::{render_segments, Segment, ViewFilter};
use crate::service::annotation_service::{AnnotationError, AnnotationService, OrphanReference};
use crate::service::assist_service::{
    accept_codings, accept_paraphrases, SuggestedCoding, SuggestedParaphrase, SuggestionOutcome,
};
use crate::service::import_service::{
    import_batch, ImportBatch, ImportError, ImportReport, ProjectBundle,
};
use crate::service::taxonomy_service::{CodeDeletion, TaxonomyError, TaxonomyService};
use log::debug;
use parking_lot::RwLock;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type Taxonomy<'a> = TaxonomyService<'a, InMemoryCodeRepository, InMemoryAnnotationRepository>;
pub type Intervals<'a> = AnnotationService<
    'a,
    InMemoryAnnotationRepository,
    InMemoryCodeRepository,
    InMemoryDocumentSource,
>;

/// Errors from building a workspace out of a bundle.
#[derive(Debug)]
pub enum WorkspaceError {
    Document(DocumentSourceError),
    Config(ConfigError),
    Import(ImportError),
}

impl Display for WorkspaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Document(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Import(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Document(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Import(err) => Some(err),
        }
    }
}

impl From<DocumentSourceError> for WorkspaceError {
    fn from(value: DocumentSourceError) -> Self {
        Self::Document(value)
    }
}

impl From<ConfigError> for WorkspaceError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<ImportError> for WorkspaceError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

/// In-memory coding project.
#[derive(Debug, Default)]
pub struct Workspace {
    documents: InMemoryDocumentSource,
    codes: InMemoryCodeRepository,
    annotations: InMemoryAnnotationRepository,
    config: CoreConfig,
    config_revision: u64,
    cache: AnalyticsCache,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty workspace after validating `config`.
    pub fn with_config(config: CoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Builds a workspace from a bundle: documents first, then the batch.
    pub fn from_bundle(bundle: ProjectBundle) -> Result<Self, WorkspaceError> {
        let mut workspace = Self::with_config(bundle.config.unwrap_or_default())?;
        for document in bundle.documents {
            workspace.add_document(document)?;
        }
        if !bundle.batch.is_empty() {
            workspace.import(&bundle.batch)?;
        }
        Ok(workspace)
    }

    /// Sum of every owned revision counter.
    pub fn version(&self) -> u64 {
        self.documents.revision()
            + self.codes.revision()
            + self.annotations.revision()
            + self.config_revision
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: CoreConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.config_revision += 1;
        Ok(())
    }

    pub fn add_document(&mut self, document: Document) -> Result<DocumentId, DocumentSourceError> {
        self.documents.add_document(document)
    }

    pub fn documents(&self) -> &InMemoryDocumentSource {
        &self.documents
    }

    pub fn codes(&self) -> &InMemoryCodeRepository {
        &self.codes
    }

    pub fn annotations(&self) -> &InMemoryAnnotationRepository {
        &self.annotations
    }

    pub fn taxonomy(&mut self) -> Taxonomy<'_> {
        TaxonomyService::new(&mut self.codes, &mut self.annotations)
    }

    pub fn intervals(&mut self) -> Intervals<'_> {
        AnnotationService::new(&mut self.annotations, &self.codes, &self.documents)
    }

    /// Deletes a code with the configured policy.
    pub fn delete_code(&mut self, code_id: CodeId) -> Result<CodeDeletion, TaxonomyError> {
        let policy = self.config.taxonomy.delete_policy;
        self.taxonomy().delete_code(code_id, policy)
    }

    /// Render segments of one document.
    pub fn segments(
        &self,
        document_id: DocumentId,
        filter: ViewFilter,
    ) -> Result<Vec<Segment<'_>>, AnnotationError> {
        let document = self
            .documents
            .get_document(document_id)
            .ok_or(AnnotationError::OrphanReference(OrphanReference::Document(document_id)))?;
        Ok(render_segments(document, &self.annotations, filter))
    }

    /// Imports `batch` all-or-nothing.
    ///
    /// The batch is applied to copies of the repositories, which replace the
    /// live ones only when every record committed.
    pub fn import(&mut self, batch: &ImportBatch) -> Result<ImportReport, ImportError> {
        let mut codes = self.codes.clone();
        let mut annotations = self.annotations.clone();
        let report = import_batch(&mut codes, &mut annotations, &self.documents, batch)?;
        self.codes = codes;
        self.annotations = annotations;
        Ok(report)
    }

    pub fn accept_suggested_codings(
        &mut self,
        document_id: DocumentId,
        suggestions: &[SuggestedCoding],
    ) -> Vec<SuggestionOutcome<CodingId>> {
        accept_codings(&mut self.intervals(), document_id, suggestions)
    }

    pub fn accept_suggested_paraphrases(
        &mut self,
        document_id: DocumentId,
        suggestions: &[SuggestedParaphrase],
    ) -> Vec<SuggestionOutcome<ParaphraseId>> {
        accept_paraphrases(&mut self.intervals(), document_id, suggestions)
    }

    /// Codes in insertion order.
    pub fn list_codes(&self) -> Vec<Code> {
        self.codes.list_codes()
    }

    pub fn frequencies(&self) -> Vec<CodeFrequency> {
        let value = self.cached(AnalyticsKey::Frequencies, || {
            AnalyticsValue::Frequencies(code_frequencies(
                &self.codes.list_codes(),
                &self.annotations.list_codings(),
            ))
        });
        match value {
            AnalyticsValue::Frequencies(frequencies) => frequencies,
            _ => code_frequencies(&self.codes.list_codes(), &self.annotations.list_codings()),
        }
    }

    /// Top `n` codes; `None` uses `analytics.topN`.
    pub fn top_codes(&self, n: Option<usize>) -> Vec<CodeFrequency> {
        let mut frequencies = self.frequencies();
        frequencies.truncate(n.unwrap_or(self.config.analytics.top_n));
        frequencies
    }

    pub fn document_cooccurrence(&self, top_n: Option<usize>) -> CooccurrenceMatrix {
        let top_n = top_n.unwrap_or(self.config.analytics.top_n);
        self.matrix(AnalyticsKey::DocumentCooccurrence { top_n }, || {
            document_cooccurrence(&self.codes.list_codes(), &self.annotations.list_codings(), top_n)
        })
    }

    /// Segment-mode matrix with the configured window and counting policy.
    pub fn segment_cooccurrence(&self, top_n: Option<usize>) -> CooccurrenceMatrix {
        let options = ProximityOptions {
            window: self.config.analytics.proximity_window,
            counting: self.config.analytics.proximity_counting,
        };
        self.segment_cooccurrence_with(top_n, options)
    }

    pub fn segment_cooccurrence_with(
        &self,
        top_n: Option<usize>,
        options: ProximityOptions,
    ) -> CooccurrenceMatrix {
        let top_n = top_n.unwrap_or(self.config.analytics.top_n);
        self.matrix(AnalyticsKey::SegmentCooccurrence { top_n, options }, || {
            segment_cooccurrence(
                &self.codes.list_codes(),
                &self.annotations.list_codings(),
                top_n,
                options,
            )
        })
    }

    pub fn heatmap(&self, code_limit: Option<usize>, document_limit: Option<usize>) -> Heatmap {
        let code_limit = code_limit.unwrap_or(self.config.analytics.top_n);
        let document_limit = document_limit.unwrap_or(self.config.analytics.top_n);
        let build = || {
            code_document_heatmap(
                &self.codes.list_codes(),
                &self.annotations.list_codings(),
                &self.documents.document_ids(),
                code_limit,
                document_limit,
            )
        };
        let key = AnalyticsKey::Heatmap {
            code_limit,
            document_limit,
        };
        match self.cached(key, || AnalyticsValue::Heatmap(build())) {
            AnalyticsValue::Heatmap(heatmap) => heatmap,
            _ => build(),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn cached<F>(&self, key: AnalyticsKey, compute: F) -> AnalyticsValue
    where
        F: FnOnce() -> AnalyticsValue,
    {
        self.cache.get_or_compute(self.version(), key, compute)
    }

    fn matrix<F>(&self, key: AnalyticsKey, build: F) -> CooccurrenceMatrix
    where
        F: Fn() -> CooccurrenceMatrix,
    {
        match self.cached(key, || AnalyticsValue::Cooccurrence(build())) {
            AnalyticsValue::Cooccurrence(matrix) => matrix,
            _ => build(),
        }
    }
}

/// Thread-safe handle over one workspace.
#[derive(Debug, Clone, Default)]
pub struct SharedWorkspace {
    inner: Arc<RwLock<Workspace>>,
}

impl SharedWorkspace {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            inner: Arc::new(RwLock::new(workspace)),
        }
    }

    /// Runs `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Workspace) -> R) -> R {
        f(&*self.inner.read())
    }

    /// Runs `f` under the write lock; readers never see a partial mutation.
    pub fn write<R>(&self, f: impl FnOnce(&mut Workspace) -> R) -> R {
        let mut guard = self.inner.write();
        let before = guard.version();
        let result = f(&mut *guard);
        let after = guard.version();
        if after != before {
            debug!(
                "event=workspace_write module=workspace status=ok version_before={} version_after={}",
                before, after
            );
        }
        result
    }

    pub fn version(&self) -> u64 {
        self.inner.read().version()
    }
}
