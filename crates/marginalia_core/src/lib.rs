//! Core domain crate for qualitative text coding.
//!
//! Owns the code taxonomy, the annotation interval engine and the analytics
//! derived from them. Hosts drive everything through [`Workspace`].

pub mod analytics;
pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod segment;
pub mod service;
pub mod workspace;

pub use analytics::cache::{AnalyticsCache, CacheStats};
pub use analytics::cooccurrence::{
    document_cooccurrence, segment_cooccurrence, CooccurrenceMatrix, ProximityCounting,
    ProximityOptions,
};
pub use analytics::frequency::{code_frequencies, top_codes, CodeFrequency};
pub use analytics::heatmap::{code_document_heatmap, DocumentCount, Heatmap};
pub use config::{AnalyticsConfig, ConfigError, CoreConfig, LoggingConfig, TaxonomyConfig};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
    LoggingStatus,
};
pub use model::annotation::{
    Coding, CodingId, DocumentAnnotations, Paraphrase, ParaphraseCategoryId, ParaphraseId, Span,
    SpanError,
};
pub use model::code::{Code, CodeId, CodeValidationError};
pub use model::document::{Document, DocumentId};
pub use repo::annotation_repo::{
    AnnotationRepoError, AnnotationRepoResult, AnnotationRepository, InMemoryAnnotationRepository,
};
pub use repo::code_repo::{CodeRepoError, CodeRepoResult, CodeRepository, InMemoryCodeRepository};
pub use repo::document_repo::{DocumentSource, DocumentSourceError, InMemoryDocumentSource};
pub use segment::{partition, render_segments, CodingActivation, Highlight, Segment, ViewFilter};
pub use service::annotation_service::{
    AnnotationError, AnnotationService, OrphanReference, ParaphraseDraft,
};
pub use service::assist_service::{
    accept_coding, accept_codings, accept_paraphrase, accept_paraphrases, SuggestedCoding,
    SuggestedParaphrase, SuggestionOutcome,
};
pub use service::import_service::{
    import_batch, validate_batch, CodeRecord, CodingRecord, ImportBatch, ImportError,
    ImportFailure, ImportRecordKind, ImportReport, ParaphraseRecord, ProjectBundle,
};
pub use service::taxonomy_service::{
    classify_drop, CodeDeletePolicy, CodeDeletion, DropPosition, TaxonomyError, TaxonomyService,
};
pub use workspace::{SharedWorkspace, Workspace, WorkspaceError};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Crate version, for host diagnostics.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
