//! JSON-file record store. Writes the whole record list after every mutation.

use crate::{FileRecord, RecordStore, StoreResult};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct JsonRecordStore {
    path: Option<PathBuf>,
    records: Mutex<Vec<FileRecord>>,
}

impl JsonRecordStore {
    /// Opens the store at `path`. A missing file starts empty. A file that cannot be parsed is
    /// moved aside to `<name>.bak` before starting empty, so it is never overwritten.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let records = load_records(&path)?;
        debug!(path = %path.display(), count = records.len(), "loaded file records");
        Ok(Self {
            path: Some(path),
            records: Mutex::new(records),
        })
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: Mutex::new(Vec::new()),
        }
    }

    fn save(&self, records: &[FileRecord]) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(records)?;
        fs::write(path, content)?;
        Ok(())
    }
}

fn load_records(path: &Path) -> StoreResult<Vec<FileRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    match serde_json::from_str(&content) {
        Ok(records) => Ok(records),
        Err(e) => {
            let backup = backup_path(path);
            fs::rename(path, &backup)?;
            warn!(
                path = %path.display(),
                backup = %backup.display(),
                error = %e,
                "could not parse file records, moved aside and starting empty"
            );
            Ok(Vec::new())
        }
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn get_by_path(&self, path: &str) -> StoreResult<Option<FileRecord>> {
        let records = self.records.lock().await;
        Ok(records.iter().find(|r| r.file_path == path).cloned())
    }

    async fn add(&self, record: FileRecord) -> StoreResult<()> {
        let mut records = self.records.lock().await;
        records.retain(|r| r.file_path != record.file_path);
        records.push(record);
        self.save(&records)
    }

    async fn add_many(&self, batch: Vec<FileRecord>) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut records = self.records.lock().await;
        for record in batch {
            records.retain(|r| r.file_path != record.file_path);
            records.push(record);
        }
        self.save(&records)
    }

    async fn update_at(&self, key: &str, record: &FileRecord) -> StoreResult<bool> {
        let mut records = self.records.lock().await;
        if !records.iter().any(|r| r.file_path == key) {
            return Ok(false);
        }
        if record.file_path != key {
            records.retain(|r| r.file_path != record.file_path);
        }
        if let Some(slot) = records.iter_mut().find(|r| r.file_path == key) {
            *slot = record.clone();
        }
        self.save(&records)?;
        Ok(true)
    }

    async fn all_records(&self) -> StoreResult<Vec<FileRecord>> {
        Ok(self.records.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn persists_and_reloads_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filerecords.json");

        let store = JsonRecordStore::open(&path).unwrap();
        let mut rec = FileRecord::minimal("/books/a.pdf");
        rec.proposed_name = "Livro - Ana - Mar.pdf".into();
        rec.decisions.reject_rename();
        store.add(rec.clone()).await.unwrap();
        assert!(path.exists());

        let reopened = JsonRecordStore::open(&path).unwrap();
        let loaded = reopened.get_by_path("/books/a.pdf").await.unwrap().unwrap();
        assert_eq!(loaded, rec);
    }

    #[tokio::test]
    async fn add_keeps_one_record_per_path() {
        let store = JsonRecordStore::in_memory();
        let mut first = FileRecord::minimal("/x/a.pdf");
        first.proposed_name = "one".into();
        let mut second = FileRecord::minimal("/x/a.pdf");
        second.proposed_name = "two".into();
        store
            .add_many(vec![first, second, FileRecord::minimal("/x/b.pdf")])
            .await
            .unwrap();

        let all = store.all_records().await.unwrap();
        assert_eq!(all.len(), 2);
        let a = store.get_by_path("/x/a.pdf").await.unwrap().unwrap();
        assert_eq!(a.proposed_name, "two");
    }

    #[tokio::test]
    async fn update_at_moves_record_to_new_path() {
        let store = JsonRecordStore::in_memory();
        store.add(FileRecord::minimal("/x/old.pdf")).await.unwrap();
        store.add(FileRecord::minimal("/x/new.pdf")).await.unwrap();

        let mut moved = store.get_by_path("/x/old.pdf").await.unwrap().unwrap();
        moved.file_path = "/x/new.pdf".into();
        moved.decisions.accept_rename();
        assert!(store.update_at("/x/old.pdf", &moved).await.unwrap());

        let all = store.all_records().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].decisions.accepted());
        assert_eq!(all[0].original_name, "old.pdf");
        assert!(store.get_by_path("/x/old.pdf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_of_unknown_path_reports_false() {
        let store = JsonRecordStore::in_memory();
        let rec = FileRecord::minimal("/nowhere.pdf");
        assert!(!store.update(&rec).await.unwrap());
        assert!(store.all_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_moved_aside_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filerecords.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonRecordStore::open(&path).unwrap();
        assert!(store.all_records().await.unwrap().is_empty());
        store.add(FileRecord::minimal("/lib/a.pdf")).await.unwrap();

        let backup = dir.path().join("filerecords.json.bak");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn pascal_case_file_keeps_rejections_across_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filerecords.json");
        std::fs::write(
            &path,
            r#"[
  {
    "FilePath": "/lib/scan.pdf",
    "OriginalName": "scan.pdf",
    "ProposedName": "Documento - Desconhecido - Desconhecido.pdf",
    "Accepted": false,
    "Rejected": true,
    "OperationDate": "2024-03-01T10:15:30.1234567",
    "ExtractedTitle": null,
    "ExtractedAuthor": null,
    "IsEbook": false
  }
]"#,
        )
        .unwrap();

        let store = JsonRecordStore::open(&path).unwrap();
        assert_eq!(store.all_records().await.unwrap().len(), 1);
        store.add(FileRecord::minimal("/lib/other.pdf")).await.unwrap();

        let reopened = JsonRecordStore::open(&path).unwrap();
        let scan = reopened.get_by_path("/lib/scan.pdf").await.unwrap().unwrap();
        assert!(scan.decisions.rejected());
        assert_eq!(reopened.all_records().await.unwrap().len(), 2);
        assert!(!dir.path().join("filerecords.json.bak").exists());
    }
}
