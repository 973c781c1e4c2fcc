//! Review lists and their pagination.

use crate::conformance::is_standardized;
use crate::scanner::FileSystem;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::{Decisions, RecordStore};

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Slice `[index * size, index * size + size)` of `list`, empty when out of range.
pub fn batch<T>(list: &[T], index: usize, size: usize) -> &[T] {
    let Some(start) = index.checked_mul(size) else {
        return &[];
    };
    if size == 0 || start >= list.len() {
        return &[];
    }
    let end = start.saturating_add(size).min(list.len());
    &list[start..end]
}

pub fn total_batches(len: usize, size: usize) -> usize {
    if size == 0 {
        return 0;
    }
    len.div_ceil(size)
}

#[derive(Clone)]
pub struct BatchCoordinator {
    fs: Arc<dyn FileSystem>,
    store: Arc<dyn RecordStore>,
}

impl BatchCoordinator {
    pub fn new(fs: Arc<dyn FileSystem>, store: Arc<dyn RecordStore>) -> Self {
        Self { fs, store }
    }

    /// Files still needing a name, minus those whose rename was rejected.
    pub async fn non_standardized(&self, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        self.select(dir, |name, d| !is_standardized(name) && !d.rejected())
            .await
    }

    /// Files already named, minus those whose metadata refresh was rejected.
    pub async fn standardized(&self, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        self.select(dir, |name, d| {
            is_standardized(name) && !d.metadata_update_rejected()
        })
        .await
    }

    async fn select(
        &self,
        dir: &Path,
        keep: impl Fn(&str, &Decisions) -> bool,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let files = self.fs.list_pdf_files(dir)?;
        let decisions: HashMap<String, Decisions> = self
            .store
            .all_records()
            .await?
            .into_iter()
            .map(|r| (r.file_path, r.decisions))
            .collect();
        Ok(files
            .into_iter()
            .filter(|path| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let d = decisions
                    .get(path.to_string_lossy().as_ref())
                    .copied()
                    .unwrap_or_default();
                keep(&name, &d)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::LocalFileSystem;
    use storage::{FileRecord, JsonRecordStore};

    #[test]
    fn batches_partition_the_list_in_order() {
        let list: Vec<usize> = (0..23).collect();
        let n = total_batches(list.len(), 10);
        assert_eq!(n, 3);
        let joined: Vec<usize> = (0..n).flat_map(|i| batch(&list, i, 10).to_vec()).collect();
        assert_eq!(joined, list);
        assert_eq!(batch(&list, 2, 10), &[20, 21, 22]);
    }

    #[test]
    fn out_of_range_batches_are_empty() {
        let list = [1, 2, 3];
        assert!(batch(&list, 1, 3).is_empty());
        assert!(batch(&list, usize::MAX, 2).is_empty());
        assert!(batch(&list, 0, 0).is_empty());
        assert_eq!(total_batches(0, DEFAULT_BATCH_SIZE), 0);
        assert_eq!(total_batches(10, DEFAULT_BATCH_SIZE), 1);
        assert_eq!(total_batches(11, DEFAULT_BATCH_SIZE), 2);
    }

    #[tokio::test]
    async fn listings_respect_rejections() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["scan1.pdf", "scan2.pdf", "Livro - A - B.pdf", "Paper - C - D.pdf"] {
            std::fs::write(dir.path().join(name), b"%PDF").unwrap();
        }
        let key = |name: &str| dir.path().join(name).to_string_lossy().into_owned();

        let store = Arc::new(JsonRecordStore::in_memory());
        let mut rejected = FileRecord::minimal(&key("scan2.pdf"));
        rejected.decisions.reject_rename();
        let mut meta_rejected = FileRecord::minimal(&key("Paper - C - D.pdf"));
        meta_rejected.decisions.reject_metadata();
        store.add(rejected).await.unwrap();
        store.add(meta_rejected).await.unwrap();

        let fs = Arc::new(LocalFileSystem::new(&[]).unwrap());
        let coordinator = BatchCoordinator::new(fs, store);

        let pending = coordinator.non_standardized(dir.path()).await.unwrap();
        assert_eq!(pending, vec![dir.path().join("scan1.pdf")]);
        let named = coordinator.standardized(dir.path()).await.unwrap();
        assert_eq!(named, vec![dir.path().join("Livro - A - B.pdf")]);
    }
}
