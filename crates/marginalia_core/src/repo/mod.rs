//! Repository layer abstractions and in-memory implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for codes, annotations
//!   and documents.
//! - Keep storage details (arena layout, indexes, ordering) behind traits.
//!
//! # Invariants
//! - Repository writes enforce record-level validation before mutation.
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateId`).
//! - Every successful mutation bumps the repository revision.

pub mod annotation_repo;
pub mod code_repo;
pub mod document_repo;
