use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use url::Url;

use crate::aggregate::{DirectoryGroup, ParentAggregate};
use crate::catalog::{DirectoryMetadata, FileRecord, StorageInfo};
use crate::fields::{Choice, DirectoryField, FieldSelection, FileField};
use crate::files::{project_file, timestamp, FileContext};
use crate::links::{remove_query_param, replace_query_param, replace_query_path};
use crate::overlay::MetadataOverlays;
use crate::paginate::{PageInfo, Pagination};
use crate::path::DirectoryPath;

/// `count`, `next` and `previous`; absent entirely when pagination is off.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationEnvelope {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryListing {
    #[serde(flatten)]
    pub pagination: Option<PaginationEnvelope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<Map<String, Value>>,
    pub directories: Vec<Map<String, Value>>,
    pub files: Vec<Map<String, Value>>,
    /// False when no file exists anywhere under the browsed path.
    #[serde(skip)]
    pub directory_exists: bool,
}

impl DirectoryListing {
    pub fn count(&self) -> Option<u64> {
        self.pagination.as_ref().map(|p| p.count)
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub struct ListingParts<'a> {
    pub request_url: &'a Url,
    pub path: &'a DirectoryPath,
    pub storage: &'a StorageInfo,
    pub parent: Option<ParentAggregate>,
    pub directories: Vec<DirectoryGroup>,
    pub files: Vec<FileRecord>,
    pub directory_fields: &'a FieldSelection<DirectoryField>,
    pub file_fields: &'a FieldSelection<FileField>,
    pub overlays: MetadataOverlays,
    /// Pagination with the resulting page info, when enabled.
    pub page: Option<(Pagination, PageInfo)>,
    pub directory_exists: bool,
}

pub fn assemble(parts: ListingParts<'_>) -> DirectoryListing {
    let ListingParts {
        request_url,
        path,
        storage,
        parent,
        directories,
        files,
        directory_fields,
        file_fields,
        overlays,
        page,
        directory_exists,
    } = parts;

    let directory_metadata = overlays.directories.as_ref();
    let file_context = FileContext {
        storage,
        metadata: overlays.files.as_ref(),
    };

    let directories: Vec<Map<String, Value>> = directories
        .iter()
        .map(|group| {
            subdirectory_item(group, request_url, storage, directory_fields, directory_metadata)
        })
        .collect();
    let files: Vec<Map<String, Value>> = files
        .iter()
        .map(|file| project_file(file, file_fields, &file_context))
        .collect();

    // A paginated empty listing for a path with no files at all has no directory entry.
    let directory = parent
        .filter(|_| {
            page.is_none() || directory_exists || !directories.is_empty() || !files.is_empty()
        })
        .map(|parent| parent_item(&parent, path, request_url, storage, directory_metadata));

    DirectoryListing {
        pagination: page.map(|(pagination, info)| envelope(request_url, &pagination, &info)),
        directory,
        directories,
        files,
        directory_exists,
    }
}

fn envelope(url: &Url, pagination: &Pagination, info: &PageInfo) -> PaginationEnvelope {
    let next = (info.has_more && info.last_index > 0)
        .then(|| replace_query_param(url, "offset", &info.last_index.to_string()).to_string());
    let previous = pagination.previous_offset().map(|offset| {
        if offset > 0 {
            replace_query_param(url, "offset", &offset.to_string()).to_string()
        } else {
            remove_query_param(url, "offset").to_string()
        }
    });
    PaginationEnvelope {
        count: info.count,
        next,
        previous,
    }
}

fn subdirectory_item(
    group: &DirectoryGroup,
    url: &Url,
    storage: &StorageInfo,
    fields: &FieldSelection<DirectoryField>,
    metadata: Option<&HashMap<String, DirectoryMetadata>>,
) -> Map<String, Value> {
    fields
        .iter()
        .filter(|field| *field != DirectoryField::DatasetMetadata || metadata.is_some())
        .map(|field| {
            let value = match field {
                DirectoryField::Name => Value::String(group.name.clone()),
                DirectoryField::Pathname => Value::String(group.pathname.clone()),
                DirectoryField::FileCount => Value::from(group.file_count),
                DirectoryField::PublishedFileCount => Value::from(group.published_file_count),
                DirectoryField::Size => Value::from(group.size),
                DirectoryField::Created => timestamp(Some(group.created)),
                DirectoryField::Modified => timestamp(Some(group.modified)),
                DirectoryField::Url => {
                    Value::String(replace_query_path(url, &group.pathname).to_string())
                }
                DirectoryField::StorageService => Value::String(storage.storage_service.clone()),
                DirectoryField::Project => Value::String(storage.project.clone()),
                DirectoryField::DatasetMetadata => {
                    directory_metadata_value(metadata.and_then(|m| m.get(&group.pathname)))
                }
            };
            (field.as_str().to_string(), value)
        })
        .collect()
}

fn parent_item(
    parent: &ParentAggregate,
    path: &DirectoryPath,
    url: &Url,
    storage: &StorageInfo,
    metadata: Option<&HashMap<String, DirectoryMetadata>>,
) -> Map<String, Value> {
    // No ascend reference at the root.
    let parent_url = path
        .parent()
        .map(|parent| Value::String(replace_query_path(url, parent.as_str()).to_string()))
        .unwrap_or(Value::Null);

    let mut item = Map::new();
    item.insert("name".into(), Value::String(parent.name.clone()));
    item.insert("pathname".into(), Value::String(parent.pathname.clone()));
    item.insert("file_count".into(), Value::from(parent.file_count));
    item.insert(
        "published_file_count".into(),
        Value::from(parent.published_file_count),
    );
    item.insert("size".into(), Value::from(parent.size));
    item.insert("created".into(), timestamp(parent.created));
    item.insert("modified".into(), timestamp(parent.modified));
    item.insert("parent_url".into(), parent_url);
    item.insert(
        "storage_service".into(),
        Value::String(storage.storage_service.clone()),
    );
    item.insert("project".into(), Value::String(storage.project.clone()));
    if let Some(metadata) = metadata {
        item.insert(
            "dataset_metadata".into(),
            directory_metadata_value(metadata.get(&parent.pathname)),
        );
    }
    item
}

fn directory_metadata_value(metadata: Option<&DirectoryMetadata>) -> Value {
    match metadata {
        Some(metadata) => serde_json::json!({
            "title": metadata.title,
            "description": metadata.description,
            "use_category": metadata.use_category,
        }),
        None => Value::Null,
    }
}
