//! Decision memory on top of a [`RecordStore`].
//!
//! Flags only ever go from unset to set. Repeating a decision does not touch the store.

use crate::models::{DocumentType, ExtractedMetadata};
use std::sync::Arc;
use storage::{Decisions, FileRecord, RecordStore, StoreResult};
use tracing::{debug, info};

/// A freshly computed name proposal for one file.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub path: String,
    pub proposed_name: String,
    pub doc_type: DocumentType,
    /// Legacy flag: the Ebook confidence reached the type threshold.
    pub is_ebook: bool,
    pub metadata: ExtractedMetadata,
}

#[derive(Clone)]
pub struct RecordTracker {
    store: Arc<dyn RecordStore>,
}

impl RecordTracker {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub async fn get(&self, path: &str) -> StoreResult<Option<FileRecord>> {
        self.store.get_by_path(path).await
    }

    /// Creates the record or overwrites its proposal fields. Decision flags are kept.
    pub async fn record_proposal(&self, proposal: &Proposal) -> StoreResult<FileRecord> {
        let existing = self.store.get_by_path(&proposal.path).await?;
        let is_new = existing.is_none();
        let mut record = existing.unwrap_or_else(|| FileRecord::minimal(&proposal.path));
        record.proposed_name = proposal.proposed_name.clone();
        record.document_type = proposal.doc_type.to_string();
        record.extracted_title = proposal.metadata.title.clone();
        record.extracted_author = proposal.metadata.author.clone();
        record.is_ebook = proposal.is_ebook;
        record.touch();

        if is_new {
            self.store.add(record.clone()).await?;
        } else {
            self.store.update(&record).await?;
        }
        debug!(path = %proposal.path, name = %proposal.proposed_name, "recorded proposal");
        Ok(record)
    }

    /// Accepts the rename and moves the record to `new_path`. `false` when no record exists.
    pub async fn mark_renamed(&self, path: &str, new_path: &str) -> StoreResult<bool> {
        let Some(mut record) = self.store.get_by_path(path).await? else {
            return Ok(false);
        };
        let raised = record.decisions.accept_rename();
        if !raised && record.file_path == new_path {
            return Ok(true);
        }
        record.file_path = new_path.to_string();
        record.touch();
        self.store.update_at(path, &record).await?;
        info!(from = path, to = new_path, "rename accepted");
        Ok(true)
    }

    pub async fn mark_rejected(&self, path: &str) -> StoreResult<FileRecord> {
        self.decide(path, Decisions::reject_rename).await
    }

    pub async fn mark_metadata_rejected(&self, path: &str) -> StoreResult<FileRecord> {
        self.decide(path, Decisions::reject_metadata).await
    }

    pub async fn mark_metadata_updated(&self, path: &str) -> StoreResult<FileRecord> {
        self.decide(path, Decisions::accept_metadata).await
    }

    async fn decide(
        &self,
        path: &str,
        raise: impl FnOnce(&mut Decisions) -> bool,
    ) -> StoreResult<FileRecord> {
        let existing = self.store.get_by_path(path).await?;
        let is_new = existing.is_none();
        let mut record = existing.unwrap_or_else(|| FileRecord::minimal(path));
        if !raise(&mut record.decisions) && !is_new {
            return Ok(record);
        }
        record.touch();
        if is_new {
            self.store.add(record.clone()).await?;
        } else {
            self.store.update(&record).await?;
        }
        Ok(record)
    }
}
