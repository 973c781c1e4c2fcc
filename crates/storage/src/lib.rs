//! Storage layer: file decision records and application settings.
//!
//! Records live behind the [`RecordStore`] trait, with a JSON-file backend and a SQLite backend.

pub mod json_store;
pub mod models;
pub mod settings;
pub mod sqlite_store;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

pub use json_store::JsonRecordStore;
pub use models::{Decisions, FileRecord, RenameStatus, StickyFlag};
pub use settings::SettingsStore;
pub use sqlite_store::SqliteRecordStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("record serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("invalid stored value in column {column}: {value}")]
    InvalidValue { column: &'static str, value: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam for [`FileRecord`]s. Records are keyed by `file_path`;
/// at most one record per path is live at a time.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_by_path(&self, path: &str) -> StoreResult<Option<FileRecord>>;

    /// Adds a record, replacing whatever was stored under the same path.
    async fn add(&self, record: FileRecord) -> StoreResult<()>;

    async fn add_many(&self, records: Vec<FileRecord>) -> StoreResult<()>;

    /// Replaces the record stored under `key` with `record`. The record may carry a new
    /// `file_path` (after a rename); any stale record already living at that new path is dropped.
    /// Returns `false` when nothing is stored under `key`.
    async fn update_at(&self, key: &str, record: &FileRecord) -> StoreResult<bool>;

    async fn update(&self, record: &FileRecord) -> StoreResult<bool> {
        self.update_at(&record.file_path, record).await
    }

    async fn all_records(&self) -> StoreResult<Vec<FileRecord>>;
}

pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let mut url = database_url.to_string();
    if !database_url.starts_with("sqlite:") {
        let path = std::path::PathBuf::from(database_url);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let norm = path.to_string_lossy().replace('\\', "/");
        if path.is_absolute() {
            url = format!("sqlite:///{}", norm.trim_start_matches('/'));
        } else {
            url = format!("sqlite://{}", norm);
        }
    }
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
    let mut opts = SqlitePoolOptions::new();
    if url.contains("memory") {
        // an in-memory database lives and dies with its single connection
        opts = opts
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    } else {
        opts = opts.max_connections(5);
    }
    let pool = opts.connect_with(options).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> StoreResult<()> {
    // Migrations live in crates/storage/migrations and are safe to re-run.
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
