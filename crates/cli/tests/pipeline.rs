use organizer_core::scanner::LocalFileSystem;
use organizer_core::source::{InMemoryDocument, MemoryLoader};
use organizer_core::{DocumentType, Organizer};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::{JsonRecordStore, RenameStatus};
use tempfile::tempdir;

fn filler(lines: usize) -> String {
    std::iter::repeat("the quick brown fox jumps over the lazy dog again and again")
        .take(lines)
        .collect::<Vec<_>>()
        .join("\n")
}

fn paper() -> InMemoryDocument {
    let mut pages = vec![
        format!(
            "Sparse Retrieval at Scale\nMaria Oliveira\nmaria@usp.br\nAbstract\n{}",
            filler(20)
        ),
        format!("1 Introduction\n{}", filler(30)),
        format!("{}\nConclusion\n{}", filler(20), filler(5)),
        format!("References\n{}", filler(25)),
        filler(30),
    ];
    pages.extend((0..7).map(|_| filler(30)));
    InMemoryDocument::new(pages)
}

fn organizer(store_path: &Path, loader: Arc<MemoryLoader>) -> Organizer {
    Organizer::new(
        Arc::new(JsonRecordStore::open(store_path).unwrap()),
        Arc::new(LocalFileSystem::new(&["*_updated.pdf".to_string()]).unwrap()),
        loader,
    )
}

fn add(dir: &Path, loader: &MemoryLoader, name: &str, doc: Option<InMemoryDocument>) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"%PDF-1.4").unwrap();
    if let Some(doc) = doc {
        loader.insert(path.clone(), doc);
    }
    path
}

#[tokio::test]
async fn review_session_end_to_end() {
    let temp = tempdir().unwrap();
    let library = temp.path().join("library");
    fs::create_dir_all(&library).unwrap();
    let store_path = temp.path().join("filerecords.json");
    let loader = Arc::new(MemoryLoader::new());

    let paper_path = add(&library, &loader, "2301.00042.pdf", Some(paper()));
    let scan_path = add(&library, &loader, "scan0001.pdf", None);
    let named_path = add(
        &library,
        &loader,
        "Livro - Jane Doe - My Title.pdf",
        Some(InMemoryDocument::new(["cover"])),
    );

    let org = organizer(&store_path, loader.clone());

    // Proposals for everything that is not yet standardized.
    let pending = org.non_standardized(&library).await.unwrap();
    assert_eq!(pending, vec![paper_path.clone(), scan_path.clone()]);
    let processed = org.process_in_batches(&pending, 10).await.unwrap();
    let (analysis, record) = &processed[0];
    assert_eq!(analysis.doc_type, DocumentType::ScientificPaper);
    assert_eq!(
        record.proposed_name,
        "Paper - Maria Oliveira - Sparse Retrieval at Scale.pdf"
    );
    assert_eq!(
        processed[1].1.proposed_name,
        "Documento - Desconhecido - Desconhecido.pdf"
    );

    // Accept one, reject the other.
    assert!(org
        .rename_file(&paper_path, &record.proposed_name)
        .await
        .unwrap());
    org.reject_file(&scan_path).await.unwrap();
    assert!(org.non_standardized(&library).await.unwrap().is_empty());

    // Metadata refresh for the named book; the renamed paper is declined.
    let renamed = library.join(&record.proposed_name);
    let written = org.update_metadata(&named_path).await.unwrap().unwrap();
    assert!(written.exists() || loader.get(&written).is_some());
    org.reject_metadata(&renamed).await.unwrap();
    let named = org.standardized(&library).await.unwrap();
    assert_eq!(named, vec![named_path.clone()]);

    // Decisions survive a restart.
    drop(org);
    let reopened = organizer(&store_path, loader.clone());
    let history = reopened.history().await.unwrap();
    assert_eq!(history.len(), 3);
    let status_of = |p: &Path| {
        history
            .iter()
            .find(|h| h.record.file_path == p.to_string_lossy())
            .map(|h| h.status)
    };
    assert_eq!(status_of(&renamed), Some(RenameStatus::Accepted));
    assert_eq!(status_of(&scan_path), Some(RenameStatus::Rejected));
    assert_eq!(status_of(&named_path), Some(RenameStatus::Pending));
    assert!(reopened.non_standardized(&library).await.unwrap().is_empty());
}

#[tokio::test]
async fn accept_command_proposes_when_no_record_exists() {
    let temp = tempdir().unwrap();
    let loader = Arc::new(MemoryLoader::new());
    let doc = InMemoryDocument::new(["slides"]).with_info(Some("Roadmap"), Some("Ana Lima"));
    let path = add(temp.path(), &loader, "deck.pdf", Some(doc));
    let org = organizer(&temp.path().join("records.json"), loader);

    let view = cli::apply::accept(&org, &path, None).await.unwrap();
    assert_eq!(view.status, "executed");
    assert!(temp.path().join("Documento - Ana Lima - Roadmap.pdf").exists());

    let again = cli::apply::accept(&org, &path, None).await.unwrap();
    assert_eq!(again.status, "error");
}

#[tokio::test]
async fn rename_conflict_is_reported_not_raised() {
    let temp = tempdir().unwrap();
    let loader = Arc::new(MemoryLoader::new());
    let path = add(temp.path(), &loader, "a.pdf", None);
    add(temp.path(), &loader, "Documento - X - Y.pdf", None);
    let org = organizer(&temp.path().join("records.json"), loader);

    let view = cli::apply::accept(&org, &path, Some("Documento - X - Y"))
        .await
        .unwrap();
    assert_eq!(view.status, "error");
    assert!(path.exists());
    let record = org.tracker().get(&path.to_string_lossy()).await.unwrap().unwrap();
    assert_eq!(record.decisions.rename_status(), RenameStatus::Pending);
}
