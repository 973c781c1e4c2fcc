//! Core library: classification, metadata extraction, naming and decision tracking for PDFs.

pub mod batch;
pub mod classifier;
pub mod config;
pub mod conformance;
pub mod extractor;
pub mod models;
pub mod naming;
pub mod pipeline;
pub mod records;
pub mod rules;
pub mod scanner;
pub mod source;

pub use models::{DocumentType, DocumentTypeResult, ExtractedMetadata, MetadataCandidate};
pub use pipeline::{build_organizer, Analysis, HistoryEntry, Organizer};
