//! Domain records for documents, codes and annotations.
//!
//! # Responsibility
//! - Define the record shapes shared by repositories, services and analytics.
//! - Own field-level validation (names, colors, spans).
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - All text offsets are char offsets into `Document::text`.

pub mod annotation;
pub mod code;
pub mod document;
