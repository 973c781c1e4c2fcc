use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// A boolean that can be raised but never lowered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StickyFlag(bool);

impl StickyFlag {
    pub fn is_set(self) -> bool {
        self.0
    }

    /// Raises the flag. Returns `true` only if this call changed it.
    pub fn raise(&mut self) -> bool {
        let changed = !self.0;
        self.0 = true;
        changed
    }
}

impl From<bool> for StickyFlag {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

/// Outcome of the rename proposal, as shown in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RenameStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RenameStatus {
    pub fn label(self) -> &'static str {
        match self {
            RenameStatus::Pending => "Pending",
            RenameStatus::Accepted => "Accepted",
            RenameStatus::Rejected => "Rejected",
        }
    }
}

/// The two independent decision tracks of a file.
///
/// Rename: pending -> accepted | rejected.
/// Metadata refresh: pending -> updated | rejected.
/// Every transition only raises flags, so a decision once taken is remembered forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decisions {
    #[serde(default, alias = "Accepted")]
    accepted: StickyFlag,
    #[serde(default, alias = "Rejected")]
    rejected: StickyFlag,
    #[serde(default, alias = "MetadataUpdated")]
    metadata_updated: StickyFlag,
    #[serde(default, alias = "MetadataUpdateRejected")]
    metadata_update_rejected: StickyFlag,
}

impl Decisions {
    pub fn from_flags(
        accepted: bool,
        rejected: bool,
        metadata_updated: bool,
        metadata_update_rejected: bool,
    ) -> Self {
        Self {
            accepted: accepted.into(),
            rejected: rejected.into(),
            metadata_updated: metadata_updated.into(),
            metadata_update_rejected: metadata_update_rejected.into(),
        }
    }

    pub fn accept_rename(&mut self) -> bool {
        self.accepted.raise()
    }

    pub fn reject_rename(&mut self) -> bool {
        self.rejected.raise()
    }

    pub fn accept_metadata(&mut self) -> bool {
        self.metadata_updated.raise()
    }

    pub fn reject_metadata(&mut self) -> bool {
        self.metadata_update_rejected.raise()
    }

    pub fn accepted(&self) -> bool {
        self.accepted.is_set()
    }

    pub fn rejected(&self) -> bool {
        self.rejected.is_set()
    }

    pub fn metadata_updated(&self) -> bool {
        self.metadata_updated.is_set()
    }

    pub fn metadata_update_rejected(&self) -> bool {
        self.metadata_update_rejected.is_set()
    }

    pub fn rename_status(&self) -> RenameStatus {
        if self.accepted() {
            RenameStatus::Accepted
        } else if self.rejected() {
            RenameStatus::Rejected
        } else {
            RenameStatus::Pending
        }
    }
}

/// Durable decision memory for one file, keyed by its current path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    #[serde(alias = "FilePath")]
    pub file_path: String,
    #[serde(alias = "OriginalName")]
    pub original_name: String,
    #[serde(default, alias = "ProposedName")]
    pub proposed_name: String,
    #[serde(default, alias = "DocumentType")]
    pub document_type: String,
    #[serde(default, alias = "ExtractedTitle")]
    pub extracted_title: Option<String>,
    #[serde(default, alias = "ExtractedAuthor")]
    pub extracted_author: Option<String>,
    #[serde(default, alias = "IsEbook")]
    pub is_ebook: bool,
    #[serde(flatten)]
    pub decisions: Decisions,
    #[serde(alias = "OperationDate", deserialize_with = "operation_date")]
    pub operation_date: DateTime<Utc>,
}

/// RFC 3339, or a local timestamp without offset as older record files wrote them.
fn operation_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(serde::de::Error::custom)?;
    Ok(Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc()))
}

impl FileRecord {
    /// A record carrying only the path, used when a decision arrives before any proposal.
    pub fn minimal(file_path: &str) -> Self {
        let original_name = Path::new(file_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.to_string());
        Self {
            file_path: file_path.to_string(),
            original_name,
            proposed_name: String::new(),
            document_type: String::new(),
            extracted_title: None,
            extracted_author: None,
            is_ebook: false,
            decisions: Decisions::default(),
            operation_date: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.operation_date = Utc::now();
    }
}
