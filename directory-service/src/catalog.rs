use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BrowseError, BrowseResult};
use crate::path::DirectoryPath;

pub type FileId = Uuid;
pub type StorageId = Uuid;
pub type DatasetId = Uuid;

/// Storage service + project pair a browsing request is bounded by.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct StorageScope {
    pub storage_service: String,
    pub project: String,
}

impl StorageScope {
    pub fn new(storage_service: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            storage_service: storage_service.into(),
            project: project.into(),
        }
    }
}

/// A storage scope resolved by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageInfo {
    pub id: StorageId,
    pub storage_service: String,
    pub project: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub id: FileId,
    pub storage_id: StorageId,
    pub storage_identifier: Option<String>,
    pub filename: String,
    /// Always starts and ends with `/`.
    pub directory_path: String,
    pub size: i64,
    pub checksum: Option<String>,
    pub modified: DateTime<Utc>,
    /// Set once the file is part of a published dataset version.
    pub published: Option<DateTime<Utc>>,
    pub removed: Option<DateTime<Utc>>,
    pub user: Option<String>,
}

impl FileRecord {
    pub fn pathname(&self) -> String {
        format!("{}{}", self.directory_path, self.filename)
    }

    pub fn is_published(&self) -> bool {
        self.published.is_some()
    }

    pub fn is_removed(&self) -> bool {
        self.removed.is_some()
    }

    /// Normalizes the directory path and rejects unusable filenames before storing.
    pub fn normalized(mut self) -> BrowseResult<Self> {
        self.directory_path = DirectoryPath::parse(&self.directory_path)?
            .as_str()
            .to_string();
        if self.filename.is_empty() || self.filename.contains('/') {
            return Err(BrowseError::validation(
                "filename",
                format!("Invalid filename '{}'", self.filename),
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileMetadata {
    pub file_id: FileId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_type: Option<String>,
    pub use_category: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DirectoryMetadata {
    pub pathname: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub use_category: Option<String>,
}
