use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::aggregate::contains_ignore_case;
use crate::catalog::{FileId, FileMetadata, FileRecord, StorageInfo};
use crate::fields::{Choice, FieldSelection, FileField, FileOrderField, SortKey};
use crate::path::DirectoryPath;
use crate::scope::FileScope;

/// Selects files stored directly in one directory.
#[derive(Debug, Clone, PartialEq)]
pub struct FileFilter {
    pub scope: FileScope,
    pub directory_path: DirectoryPath,
    /// Case-insensitive substring of the filename.
    pub name: Option<String>,
    pub published: Option<bool>,
}

impl FileFilter {
    pub fn matches(&self, file: &FileRecord, is_member: impl Fn(&FileRecord) -> bool) -> bool {
        if file.directory_path != self.directory_path.as_str() {
            return false;
        }
        if let Some(needle) = &self.name {
            if !contains_ignore_case(&file.filename, needle) {
                return false;
            }
        }
        let published_ok = match self.published {
            Some(true) => file.is_published(),
            Some(false) => !file.is_published(),
            None => true,
        };
        published_ok && self.scope.admits(file, is_member)
    }
}

/// Orders files by the requested keys, then by filename ascending.
///
/// Missing timestamps sort before present ones in ascending order.
pub fn compare_files(a: &FileRecord, b: &FileRecord, ordering: &[SortKey<FileOrderField>]) -> Ordering {
    ordering
        .iter()
        .map(|key| {
            let ordering = match key.field {
                FileOrderField::Filename => a.filename.cmp(&b.filename),
                FileOrderField::Pathname => a
                    .directory_path
                    .cmp(&b.directory_path)
                    .then_with(|| a.filename.cmp(&b.filename)),
                FileOrderField::Size => a.size.cmp(&b.size),
                FileOrderField::Published => a.published.cmp(&b.published),
                FileOrderField::Modified => a.modified.cmp(&b.modified),
                FileOrderField::Removed => a.removed.cmp(&b.removed),
            };
            key.direction.apply(ordering)
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| a.filename.cmp(&b.filename))
}

/// Per-request values shared by every projected file.
pub struct FileContext<'a> {
    pub storage: &'a StorageInfo,
    /// `None` when overlays were not loaded for this request.
    pub metadata: Option<&'a HashMap<FileId, FileMetadata>>,
}

impl FileField {
    pub fn value(self, file: &FileRecord, context: &FileContext<'_>) -> Value {
        match self {
            FileField::Id => Value::String(file.id.to_string()),
            FileField::StorageIdentifier => file.storage_identifier.clone().into(),
            FileField::Pathname => Value::String(file.pathname()),
            FileField::Filename => Value::String(file.filename.clone()),
            FileField::Size => Value::from(file.size),
            FileField::Checksum => file.checksum.clone().into(),
            FileField::Modified => timestamp(Some(file.modified)),
            FileField::Published => timestamp(file.published),
            FileField::Removed => timestamp(file.removed),
            FileField::User => file.user.clone().into(),
            FileField::StorageService => Value::String(context.storage.storage_service.clone()),
            FileField::Project => Value::String(context.storage.project.clone()),
            FileField::DatasetMetadata => context
                .metadata
                .and_then(|metadata| metadata.get(&file.id))
                .map(file_metadata_value)
                .unwrap_or(Value::Null),
        }
    }
}

/// Projects a file into the requested fields. A restricted selection always
/// keeps `id` and `storage_service`; `dataset_metadata` only appears when
/// overlays were loaded.
pub fn project_file(
    file: &FileRecord,
    fields: &FieldSelection<FileField>,
    context: &FileContext<'_>,
) -> Map<String, Value> {
    FileField::ALL
        .iter()
        .copied()
        .filter(|field| {
            fields.includes(*field) || matches!(field, FileField::Id | FileField::StorageService)
        })
        .filter(|field| *field != FileField::DatasetMetadata || context.metadata.is_some())
        .map(|field| (field.as_str().to_string(), field.value(file, context)))
        .collect()
}

fn file_metadata_value(metadata: &FileMetadata) -> Value {
    serde_json::json!({
        "title": metadata.title,
        "description": metadata.description,
        "file_type": metadata.file_type,
        "use_category": metadata.use_category,
    })
}

pub(crate) fn timestamp(value: Option<chrono::DateTime<chrono::Utc>>) -> Value {
    value
        .map(|ts| Value::String(ts.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)))
        .unwrap_or(Value::Null)
}
