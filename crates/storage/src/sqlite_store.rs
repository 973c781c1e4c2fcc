//! SQLite record store on top of sqlx.

use crate::{Decisions, FileRecord, RecordStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};

#[derive(Debug, FromRow)]
struct FileRecordRow {
    file_path: String,
    original_name: String,
    proposed_name: String,
    document_type: String,
    extracted_title: Option<String>,
    extracted_author: Option<String>,
    is_ebook: bool,
    accepted: bool,
    rejected: bool,
    metadata_updated: bool,
    metadata_update_rejected: bool,
    operation_date: String,
}

impl TryFrom<FileRecordRow> for FileRecord {
    type Error = StoreError;

    fn try_from(row: FileRecordRow) -> Result<Self, Self::Error> {
        let operation_date = DateTime::parse_from_rfc3339(&row.operation_date)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|_| StoreError::InvalidValue {
                column: "operation_date",
                value: row.operation_date.clone(),
            })?;
        Ok(FileRecord {
            file_path: row.file_path,
            original_name: row.original_name,
            proposed_name: row.proposed_name,
            document_type: row.document_type,
            extracted_title: row.extracted_title,
            extracted_author: row.extracted_author,
            is_ebook: row.is_ebook,
            decisions: Decisions::from_flags(
                row.accepted,
                row.rejected,
                row.metadata_updated,
                row.metadata_update_rejected,
            ),
            operation_date,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT file_path, original_name, proposed_name, document_type, \
     extracted_title, extracted_author, is_ebook, accepted, rejected, metadata_updated, \
     metadata_update_rejected, operation_date FROM file_records";

pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Wraps an already-migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and runs the migrations.
    pub async fn open(database_url: &str) -> anyhow::Result<Self> {
        let pool = crate::connect(database_url).await?;
        crate::migrate(&pool).await?;
        Ok(Self::new(pool))
    }
}

async fn upsert(tx: &mut Transaction<'_, Sqlite>, record: &FileRecord) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO file_records (
            file_path, original_name, proposed_name, document_type, extracted_title,
            extracted_author, is_ebook, accepted, rejected, metadata_updated,
            metadata_update_rejected, operation_date
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(file_path) DO UPDATE SET
            original_name = excluded.original_name,
            proposed_name = excluded.proposed_name,
            document_type = excluded.document_type,
            extracted_title = excluded.extracted_title,
            extracted_author = excluded.extracted_author,
            is_ebook = excluded.is_ebook,
            accepted = excluded.accepted,
            rejected = excluded.rejected,
            metadata_updated = excluded.metadata_updated,
            metadata_update_rejected = excluded.metadata_update_rejected,
            operation_date = excluded.operation_date
        "#,
    )
    .bind(&record.file_path)
    .bind(&record.original_name)
    .bind(&record.proposed_name)
    .bind(&record.document_type)
    .bind(&record.extracted_title)
    .bind(&record.extracted_author)
    .bind(record.is_ebook)
    .bind(record.decisions.accepted())
    .bind(record.decisions.rejected())
    .bind(record.decisions.metadata_updated())
    .bind(record.decisions.metadata_update_rejected())
    .bind(record.operation_date.to_rfc3339())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get_by_path(&self, path: &str) -> StoreResult<Option<FileRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE file_path = ?1");
        let row = sqlx::query_as::<_, FileRecordRow>(&sql)
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        row.map(FileRecord::try_from).transpose()
    }

    async fn add(&self, record: FileRecord) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        upsert(&mut tx, &record).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn add_many(&self, records: Vec<FileRecord>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for record in &records {
            upsert(&mut tx, record).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn update_at(&self, key: &str, record: &FileRecord) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM file_records WHERE file_path = ?1")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(id) = exists else {
            return Ok(false);
        };
        if record.file_path != key {
            sqlx::query("DELETE FROM file_records WHERE file_path = ?1")
                .bind(&record.file_path)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(
            r#"
            UPDATE file_records SET
                file_path = ?1,
                original_name = ?2,
                proposed_name = ?3,
                document_type = ?4,
                extracted_title = ?5,
                extracted_author = ?6,
                is_ebook = ?7,
                accepted = ?8,
                rejected = ?9,
                metadata_updated = ?10,
                metadata_update_rejected = ?11,
                operation_date = ?12
            WHERE id = ?13
            "#,
        )
        .bind(&record.file_path)
        .bind(&record.original_name)
        .bind(&record.proposed_name)
        .bind(&record.document_type)
        .bind(&record.extracted_title)
        .bind(&record.extracted_author)
        .bind(record.is_ebook)
        .bind(record.decisions.accepted())
        .bind(record.decisions.rejected())
        .bind(record.decisions.metadata_updated())
        .bind(record.decisions.metadata_update_rejected())
        .bind(record.operation_date.to_rfc3339())
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn all_records(&self) -> StoreResult<Vec<FileRecord>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY id");
        let rows = sqlx::query_as::<_, FileRecordRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(FileRecord::try_from).collect()
    }
}
