//! Use-case services over repositories.

pub mod annotation_service;
pub mod assist_service;
pub mod import_service;
pub mod taxonomy_service;
