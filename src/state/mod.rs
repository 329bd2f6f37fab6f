//! State Module
//!
//! Persisted project documents.

pub mod project;

pub use project::{ProjectDocument, SourceRef, PROJECT_VERSION};
