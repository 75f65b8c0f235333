use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text, Timestamptz};
use uuid::Uuid;

use crate::aggregate::DirectoryGroup;
use crate::catalog::{DirectoryMetadata, FileMetadata, FileRecord, StorageInfo};
use crate::path::DirectoryPath;
use crate::schema::{directory_metadata, file_metadata, file_set_files, files, storages};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = storages)]
pub struct StorageRow {
    pub id: Uuid,
    pub storage_service: String,
    pub project: String,
}

/// Field order follows the `files` table so the default selection loads it.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = files)]
#[diesel(belongs_to(StorageRow, foreign_key = storage_id))]
pub struct FileRow {
    pub id: Uuid,
    pub storage_id: Uuid,
    pub storage_identifier: Option<String>,
    pub filename: String,
    pub directory_path: String,
    pub size: i64,
    pub checksum: Option<String>,
    pub modified: DateTime<Utc>,
    pub published: Option<DateTime<Utc>>,
    pub removed: Option<DateTime<Utc>>,
    pub user_name: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = storages)]
pub struct NewStorage<'a> {
    pub id: Uuid,
    pub storage_service: &'a str,
    pub project: &'a str,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = files)]
#[diesel(treat_none_as_null = true)]
pub struct NewFile<'a> {
    pub id: Uuid,
    pub storage_id: Uuid,
    pub storage_identifier: Option<&'a str>,
    pub filename: &'a str,
    pub directory_path: &'a str,
    pub size: i64,
    pub checksum: Option<&'a str>,
    pub modified: DateTime<Utc>,
    pub published: Option<DateTime<Utc>>,
    pub removed: Option<DateTime<Utc>>,
    pub user_name: Option<&'a str>,
}

impl<'a> From<&'a FileRecord> for NewFile<'a> {
    fn from(file: &'a FileRecord) -> Self {
        NewFile {
            id: file.id,
            storage_id: file.storage_id,
            storage_identifier: file.storage_identifier.as_deref(),
            filename: &file.filename,
            directory_path: &file.directory_path,
            size: file.size,
            checksum: file.checksum.as_deref(),
            modified: file.modified,
            published: file.published,
            removed: file.removed,
            user_name: file.user.as_deref(),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = file_set_files)]
pub struct NewFileSetFile {
    pub dataset_id: Uuid,
    pub file_id: Uuid,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = file_metadata)]
pub struct FileMetadataRow {
    pub file_id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_type: Option<String>,
    pub use_category: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = file_metadata)]
pub struct NewFileMetadata<'a> {
    pub dataset_id: Uuid,
    pub file_id: Uuid,
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub file_type: Option<&'a str>,
    pub use_category: Option<&'a str>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = directory_metadata)]
pub struct DirectoryMetadataRow {
    pub pathname: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub use_category: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = directory_metadata)]
pub struct NewDirectoryMetadata<'a> {
    pub dataset_id: Uuid,
    pub storage_id: Uuid,
    pub pathname: &'a str,
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub use_category: Option<&'a str>,
}

/// One row of the grouped aggregate over the path segment below the target.
#[derive(QueryableByName, Debug, Clone)]
pub struct DirectoryGroupRow {
    #[diesel(sql_type = Text)]
    pub name: String,
    #[diesel(sql_type = BigInt)]
    pub file_count: i64,
    #[diesel(sql_type = BigInt)]
    pub published_file_count: i64,
    #[diesel(sql_type = BigInt)]
    pub size: i64,
    #[diesel(sql_type = Timestamptz)]
    pub created: DateTime<Utc>,
    #[diesel(sql_type = Timestamptz)]
    pub modified: DateTime<Utc>,
}

impl DirectoryGroupRow {
    pub fn into_group(self, path: &DirectoryPath) -> DirectoryGroup {
        let pathname = if self.name.is_empty() {
            path.as_str().to_string()
        } else {
            path.child(&self.name).as_str().to_string()
        };
        DirectoryGroup {
            name: self.name,
            pathname,
            file_count: self.file_count.max(0) as u64,
            published_file_count: self.published_file_count.max(0) as u64,
            size: self.size,
            created: self.created,
            modified: self.modified,
        }
    }
}

impl From<StorageRow> for StorageInfo {
    fn from(row: StorageRow) -> Self {
        StorageInfo {
            id: row.id,
            storage_service: row.storage_service,
            project: row.project,
        }
    }
}

impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        FileRecord {
            id: row.id,
            storage_id: row.storage_id,
            storage_identifier: row.storage_identifier,
            filename: row.filename,
            directory_path: row.directory_path,
            size: row.size,
            checksum: row.checksum,
            modified: row.modified,
            published: row.published,
            removed: row.removed,
            user: row.user_name,
        }
    }
}

impl From<FileMetadataRow> for FileMetadata {
    fn from(row: FileMetadataRow) -> Self {
        FileMetadata {
            file_id: row.file_id,
            title: row.title,
            description: row.description,
            file_type: row.file_type,
            use_category: row.use_category,
        }
    }
}

impl From<DirectoryMetadataRow> for DirectoryMetadata {
    fn from(row: DirectoryMetadataRow) -> Self {
        DirectoryMetadata {
            pathname: row.pathname,
            title: row.title,
            description: row.description,
            use_category: row.use_category,
        }
    }
}
