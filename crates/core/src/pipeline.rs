use crate::batch::{self, BatchCoordinator};
use crate::classifier;
use crate::config::{AppConfig, StoreBackend};
use crate::conformance;
use crate::extractor::MetadataExtractor;
use crate::models::{DocumentType, DocumentTypeResult, ExtractedMetadata, MetadataCandidate};
use crate::naming::NameSynthesizer;
use crate::records::{Proposal, RecordTracker};
use crate::scanner::{FileSystem, LocalFileSystem};
use crate::source::{self, DocumentLoader, TextSource};
use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::{FileRecord, JsonRecordStore, RecordStore, RenameStatus, SqliteRecordStore};
use tracing::{debug, error, info, warn};

/// Everything computed for one document, for display.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub path: PathBuf,
    pub readable: bool,
    pub page_count: usize,
    pub scores: Vec<DocumentTypeResult>,
    pub doc_type: DocumentType,
    pub is_ebook: bool,
    pub title_candidates: Vec<MetadataCandidate>,
    pub author_candidates: Vec<MetadataCandidate>,
    pub metadata: ExtractedMetadata,
    pub proposed_name: String,
}

impl Analysis {
    fn proposal(&self) -> Proposal {
        Proposal {
            path: self.path.to_string_lossy().into_owned(),
            proposed_name: self.proposed_name.clone(),
            doc_type: self.doc_type,
            is_ebook: self.is_ebook,
            metadata: self.metadata.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: FileRecord,
    pub status: RenameStatus,
}

pub struct Organizer {
    tracker: RecordTracker,
    coordinator: BatchCoordinator,
    fs: Arc<dyn FileSystem>,
    loader: Arc<dyn DocumentLoader>,
    synthesizer: NameSynthesizer,
    threshold: f32,
    batch_size: usize,
}

impl Organizer {
    pub fn new(
        store: Arc<dyn RecordStore>,
        fs: Arc<dyn FileSystem>,
        loader: Arc<dyn DocumentLoader>,
    ) -> Self {
        Self {
            tracker: RecordTracker::new(store.clone()),
            coordinator: BatchCoordinator::new(fs.clone(), store),
            fs,
            loader,
            synthesizer: NameSynthesizer::default(),
            threshold: crate::rules::TYPE_THRESHOLD,
            batch_size: batch::DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: NameSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn tracker(&self) -> &RecordTracker {
        &self.tracker
    }

    fn open(&self, path: &Path) -> Option<Box<dyn TextSource>> {
        match self.loader.open(path) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "document unreadable, using fallbacks");
                None
            }
        }
    }

    /// Classifies, extracts and names one document. Never fails: unreadable documents
    /// come back as Generic with file-name fallbacks.
    pub fn analyze(&self, path: &Path) -> Analysis {
        let file_name = file_name(path);
        let doc = self.open(path);
        let source = doc.as_deref();

        let classification = classifier::classify_source(source, &file_name);
        let best = classification.best();
        let extractor = MetadataExtractor::new(source, best.doc_type, &file_name);
        let metadata = extractor.extract();
        let proposed_name = self.synthesizer.compose(
            best.doc_type,
            metadata.author.as_deref(),
            metadata.title.as_deref(),
        );

        Analysis {
            path: path.to_path_buf(),
            readable: source.is_some(),
            page_count: source.map(|s| s.page_count()).unwrap_or_default(),
            is_ebook: classification.confidence(DocumentType::Ebook) >= self.threshold,
            scores: classification.results().to_vec(),
            doc_type: best.doc_type,
            title_candidates: extractor.title_candidates(),
            author_candidates: extractor.author_candidates(),
            metadata,
            proposed_name,
        }
    }

    /// The proposed name, classifying first unless `doc_type` is given.
    pub fn propose_name(&self, path: &Path, doc_type: Option<DocumentType>) -> String {
        let file_name = file_name(path);
        let doc = self.open(path);
        let source = doc.as_deref();
        let doc_type = doc_type
            .unwrap_or_else(|| classifier::classify_source(source, &file_name).best().doc_type);
        let metadata = MetadataExtractor::new(source, doc_type, &file_name).extract();
        self.synthesizer.compose(
            doc_type,
            metadata.author.as_deref(),
            metadata.title.as_deref(),
        )
    }

    pub async fn process_file(&self, path: &Path) -> anyhow::Result<(Analysis, FileRecord)> {
        let analysis = self.analyze(path);
        let record = self
            .tracker
            .record_proposal(&analysis.proposal())
            .await
            .with_context(|| format!("record proposal for {}", path.display()))?;
        Ok((analysis, record))
    }

    pub async fn process_files(
        &self,
        paths: &[PathBuf],
    ) -> anyhow::Result<Vec<(Analysis, FileRecord)>> {
        let mut out = Vec::with_capacity(paths.len());
        for path in paths {
            out.push(self.process_file(path).await?);
        }
        Ok(out)
    }

    pub async fn process_in_batches(
        &self,
        paths: &[PathBuf],
        size: usize,
    ) -> anyhow::Result<Vec<(Analysis, FileRecord)>> {
        let total = batch::total_batches(paths.len(), size);
        let mut out = Vec::with_capacity(paths.len());
        for index in 0..total {
            let chunk = batch::batch(paths, index, size);
            info!(batch = index + 1, total, files = chunk.len(), "processing batch");
            out.extend(self.process_files(chunk).await?);
        }
        Ok(out)
    }

    /// Renames on disk, then moves the record. A failed rename leaves the record untouched.
    pub async fn rename_file(&self, path: &Path, new_name: &str) -> anyhow::Result<bool> {
        let target = match self.fs.rename(path, new_name) {
            Ok(target) => target,
            Err(e) => {
                warn!(path = %path.display(), new_name, error = %e, "rename failed");
                return Ok(false);
            }
        };
        let from = path.to_string_lossy();
        let to = target.to_string_lossy();
        match self.tracker.mark_renamed(&from, &to).await {
            Ok(true) => {}
            Ok(false) => debug!(path = %from, "renamed file had no record"),
            Err(e) => {
                error!(
                    from = %from,
                    to = %to,
                    error = %e,
                    "file renamed but its record still has the old path"
                );
                return Err(e).with_context(|| format!("record for {from} not moved to {to}"));
            }
        }
        Ok(true)
    }

    pub async fn reject_file(&self, path: &Path) -> anyhow::Result<FileRecord> {
        let record = self.tracker.mark_rejected(&path.to_string_lossy()).await?;
        info!(path = %path.display(), "rename rejected");
        Ok(record)
    }

    /// Writes the author and title parsed from a standardized name into the `_updated.pdf`
    /// sibling. Returns the written path, or `None` when nothing was written.
    pub async fn update_metadata(&self, path: &Path) -> anyhow::Result<Option<PathBuf>> {
        let Some(parsed) = conformance::parse(&file_name(path)) else {
            warn!(path = %path.display(), "name is not standardized, metadata not written");
            return Ok(None);
        };
        if !self.fs.exists(path) {
            warn!(path = %path.display(), "file missing, metadata not written");
            return Ok(None);
        }
        let written = match self.loader.write_info(path, &parsed.title, &parsed.author) {
            Ok(written) => written,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "metadata update failed");
                return Ok(None);
            }
        };
        self.tracker
            .mark_metadata_updated(&path.to_string_lossy())
            .await?;
        info!(path = %path.display(), output = %written.display(), "metadata written");
        Ok(Some(written))
    }

    pub async fn reject_metadata(&self, path: &Path) -> anyhow::Result<FileRecord> {
        Ok(self
            .tracker
            .mark_metadata_rejected(&path.to_string_lossy())
            .await?)
    }

    pub async fn non_standardized(&self, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        self.coordinator.non_standardized(dir).await
    }

    pub async fn standardized(&self, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        self.coordinator.standardized(dir).await
    }

    /// Batch `index` of the non-standardized files in `dir`.
    pub async fn batch(
        &self,
        dir: &Path,
        index: usize,
        size: usize,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let files = self.non_standardized(dir).await?;
        Ok(batch::batch(&files, index, size).to_vec())
    }

    pub async fn total_batches(&self, dir: &Path, size: usize) -> anyhow::Result<usize> {
        let files = self.non_standardized(dir).await?;
        Ok(batch::total_batches(files.len(), size))
    }

    pub async fn history(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        let records = self.tracker.store().all_records().await?;
        Ok(records
            .into_iter()
            .map(|record| HistoryEntry {
                status: record.decisions.rename_status(),
                record,
            })
            .collect())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    let path = &config.store.path;
    let store: Arc<dyn RecordStore> = match config.store.backend {
        StoreBackend::Json => {
            Arc::new(JsonRecordStore::open(path).context("open json record store")?)
        }
        StoreBackend::Memory => Arc::new(JsonRecordStore::in_memory()),
        StoreBackend::Sqlite => Arc::new(
            SqliteRecordStore::open(path)
                .await
                .context("open sqlite store")?,
        ),
    };
    Ok(store)
}

/// Wires the configured store, the local filesystem and the PDF loader.
pub async fn build_organizer(config: &AppConfig) -> anyhow::Result<Organizer> {
    let store = open_store(config).await?;
    let fs = Arc::new(LocalFileSystem::new(&config.scan.exclude)?);
    let synthesizer = NameSynthesizer::new(&config.naming.placeholder, config.naming.max_length);
    Ok(Organizer::new(store, fs, source::default_loader())
        .with_synthesizer(synthesizer)
        .with_threshold(config.classification.threshold)
        .with_batch_size(config.batch.size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{InMemoryDocument, MemoryLoader};

    struct Fixture {
        dir: tempfile::TempDir,
        loader: Arc<MemoryLoader>,
        organizer: Organizer,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let loader = Arc::new(MemoryLoader::new());
        let organizer = Organizer::new(
            Arc::new(JsonRecordStore::in_memory()),
            Arc::new(LocalFileSystem::new(&["*_updated.pdf".to_string()]).unwrap()),
            loader.clone(),
        );
        Fixture {
            dir,
            loader,
            organizer,
        }
    }

    impl Fixture {
        fn add(&self, name: &str, doc: Option<InMemoryDocument>) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, b"%PDF-1.4").unwrap();
            if let Some(doc) = doc {
                self.loader.insert(path.clone(), doc);
            }
            path
        }
    }

    /// Accepts reads and adds but fails every update.
    struct FailingUpdates(JsonRecordStore);

    #[async_trait::async_trait]
    impl RecordStore for FailingUpdates {
        async fn get_by_path(&self, path: &str) -> storage::StoreResult<Option<FileRecord>> {
            self.0.get_by_path(path).await
        }

        async fn add(&self, record: FileRecord) -> storage::StoreResult<()> {
            self.0.add(record).await
        }

        async fn add_many(&self, records: Vec<FileRecord>) -> storage::StoreResult<()> {
            self.0.add_many(records).await
        }

        async fn update_at(&self, _key: &str, _record: &FileRecord) -> storage::StoreResult<bool> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into())
        }

        async fn all_records(&self) -> storage::StoreResult<Vec<FileRecord>> {
            self.0.all_records().await
        }
    }

    #[tokio::test]
    async fn store_failure_after_rename_names_both_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        let store = FailingUpdates(JsonRecordStore::in_memory());
        store.add(FileRecord::minimal(&path.to_string_lossy())).await.unwrap();
        let organizer = Organizer::new(
            Arc::new(store),
            Arc::new(LocalFileSystem::new(&[]).unwrap()),
            Arc::new(MemoryLoader::new()),
        );

        let err = organizer
            .rename_file(&path, "Documento - X - Y.pdf")
            .await
            .unwrap_err();
        let target = dir.path().join("Documento - X - Y.pdf");
        assert!(target.exists());
        let message = format!("{err:#}");
        assert!(message.contains(&*path.to_string_lossy()));
        assert!(message.contains(&*target.to_string_lossy()));
        assert!(message.contains("disk full"));
    }

    #[test]
    fn unreadable_document_gets_placeholder_name() {
        let f = fixture();
        let path = f.add("scan0001.pdf", None);
        let analysis = f.organizer.analyze(&path);
        assert!(!analysis.readable);
        assert_eq!(analysis.doc_type, DocumentType::Generic);
        assert_eq!(
            analysis.proposed_name,
            "Documento - Desconhecido - Desconhecido.pdf"
        );
    }

    #[test]
    fn propose_name_honours_given_type() {
        let f = fixture();
        let doc = InMemoryDocument::new(["body"])
            .with_info(Some("Dom Casmurro"), Some("Machado de Assis"));
        let path = f.add("dc.pdf", Some(doc));
        assert_eq!(
            f.organizer.propose_name(&path, Some(DocumentType::Ebook)),
            "Livro - Machado de Assis - Dom Casmurro.pdf"
        );
        assert_eq!(
            f.organizer.propose_name(&path, None),
            "Documento - Machado de Assis - Dom Casmurro.pdf"
        );
    }

    #[tokio::test]
    async fn accept_flow_renames_and_rekeys() {
        let f = fixture();
        let doc = InMemoryDocument::new(["body"]).with_info(Some("Title"), Some("Author"));
        let path = f.add("raw.pdf", Some(doc));

        let (analysis, record) = f.organizer.process_file(&path).await.unwrap();
        assert_eq!(record.proposed_name, analysis.proposed_name);
        assert!(f.organizer.rename_file(&path, &record.proposed_name).await.unwrap());

        let new_path = f.dir.path().join(&record.proposed_name);
        assert!(new_path.exists());
        let history = f.organizer.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, RenameStatus::Accepted);
        assert_eq!(history[0].record.file_path, new_path.to_string_lossy());

        assert!(f.organizer.non_standardized(f.dir.path()).await.unwrap().is_empty());
        assert_eq!(f.organizer.standardized(f.dir.path()).await.unwrap(), vec![new_path]);
    }

    #[tokio::test]
    async fn failed_rename_leaves_record_untouched() {
        let f = fixture();
        let path = f.add("raw.pdf", None);
        f.add("Documento - Desconhecido - Desconhecido.pdf", None);
        let (_, before) = f.organizer.process_file(&path).await.unwrap();

        assert!(!f.organizer.rename_file(&path, &before.proposed_name).await.unwrap());
        let after = f.organizer.tracker().get(&before.file_path).await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn rejected_files_leave_the_pending_list() {
        let f = fixture();
        let a = f.add("a.pdf", None);
        let b = f.add("b.pdf", None);
        f.organizer.reject_file(&a).await.unwrap();
        assert_eq!(f.organizer.non_standardized(f.dir.path()).await.unwrap(), vec![b]);
        assert_eq!(f.organizer.total_batches(f.dir.path(), 10).await.unwrap(), 1);
        assert!(f.organizer.batch(f.dir.path(), 1, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn metadata_update_writes_sibling_and_sets_flag() {
        let f = fixture();
        let path = f.add("Livro - Jane Doe - My Title.pdf", Some(InMemoryDocument::new(["x"])));
        let written = f.organizer.update_metadata(&path).await.unwrap().unwrap();
        assert!(written.ends_with("Livro - Jane Doe - My Title_updated.pdf"));
        let copy = f.loader.get(&written).unwrap();
        assert_eq!(copy.title.as_deref(), Some("My Title"));
        assert_eq!(copy.author.as_deref(), Some("Jane Doe"));

        let record = f.organizer.tracker().get(&path.to_string_lossy()).await.unwrap().unwrap();
        assert!(record.decisions.metadata_updated());
    }

    #[tokio::test]
    async fn failed_metadata_update_creates_no_record() {
        let f = fixture();
        let unknown = f.add("Livro - A - B.pdf", None);
        assert!(f.organizer.update_metadata(&unknown).await.unwrap().is_none());
        let loose = f.add("notes.pdf", Some(InMemoryDocument::new(["x"])));
        assert!(f.organizer.update_metadata(&loose).await.unwrap().is_none());
        assert!(f.organizer.history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn metadata_rejection_hides_standardized_file() {
        let f = fixture();
        let path = f.add("Paper - A - B.pdf", None);
        f.organizer.reject_metadata(&path).await.unwrap();
        assert!(f.organizer.standardized(f.dir.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn batches_process_every_file_once() {
        let f = fixture();
        let paths: Vec<PathBuf> = (0..5).map(|i| f.add(&format!("f{i}.pdf"), None)).collect();
        let done = f.organizer.process_in_batches(&paths, 2).await.unwrap();
        let seen: Vec<PathBuf> = done.into_iter().map(|(a, _)| a.path).collect();
        assert_eq!(seen, paths);
        assert_eq!(f.organizer.history().await.unwrap().len(), 5);
    }
}
