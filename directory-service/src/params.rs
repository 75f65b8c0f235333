//! Request parameters for directory browsing.
//!
//! Every parameter is validated before any backend query runs.

use uuid::Uuid;

use crate::catalog::{DatasetId, StorageScope};
use crate::error::{BrowseError, BrowseResult};
use crate::fields::{
    parse_list, Choice, DirectoryField, DirectoryOrderField, FieldSelection, FileField,
    FileOrderField, SortKey,
};
use crate::paginate::{Pagination, DEFAULT_LIMIT};
use crate::path::DirectoryPath;
use crate::scope::{resolve_scope, FileScope};

#[derive(Debug, Clone, PartialEq)]
pub struct BrowseParams {
    pub storage: StorageScope,
    pub path: DirectoryPath,
    pub include_parent: bool,
    pub published: Option<bool>,
    pub name: Option<String>,
    pub directory_fields: FieldSelection<DirectoryField>,
    pub file_fields: FieldSelection<FileField>,
    pub directory_ordering: Vec<SortKey<DirectoryOrderField>>,
    pub file_ordering: Vec<SortKey<FileOrderField>>,
    pub pagination: bool,
    pub offset: u64,
    pub limit: u64,
    pub dataset: Option<DatasetId>,
    pub include_all: bool,
    pub exclude_dataset: bool,
    pub bypass_cache: bool,
}

impl BrowseParams {
    pub fn new(storage: StorageScope) -> Self {
        Self {
            storage,
            path: DirectoryPath::root(),
            include_parent: true,
            published: None,
            name: None,
            directory_fields: FieldSelection::All,
            file_fields: FieldSelection::All,
            directory_ordering: Vec::new(),
            file_ordering: Vec::new(),
            pagination: true,
            offset: 0,
            limit: DEFAULT_LIMIT,
            dataset: None,
            include_all: false,
            exclude_dataset: false,
            bypass_cache: false,
        }
    }

    /// Parses URL query pairs. Unknown parameters are ignored.
    pub fn from_query_pairs<K, V>(
        pairs: impl IntoIterator<Item = (K, V)>,
        default_limit: u64,
    ) -> BrowseResult<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut storage_service = None;
        let mut project = None;
        let mut params = Self::new(StorageScope::new("", ""));
        params.limit = default_limit;

        for (key, value) in pairs {
            let key = key.as_ref();
            let value = value.as_ref();
            match key {
                "storage_service" => storage_service = Some(value.to_string()),
                "project" | "csc_project" => project = Some(value.to_string()),
                "path" => params.path = DirectoryPath::parse(value)?,
                "include_parent" => params.include_parent = parse_bool(key, value)?,
                "published" => params.published = Some(parse_bool(key, value)?),
                "name" => params.name = Some(value.to_string()).filter(|n| !n.is_empty()),
                "directory_fields" => {
                    params.directory_fields =
                        FieldSelection::only(parse_list(key, value, DirectoryField::parse)?)
                }
                "file_fields" => {
                    params.file_fields =
                        FieldSelection::only(parse_list(key, value, FileField::parse)?)
                }
                "directory_ordering" => {
                    params.directory_ordering = parse_list(key, value, SortKey::parse)?
                }
                "file_ordering" => params.file_ordering = parse_list(key, value, SortKey::parse)?,
                "pagination" => params.pagination = parse_bool(key, value)?,
                "offset" => params.offset = parse_non_negative(key, value)?,
                "limit" => params.limit = parse_non_negative(key, value)?,
                "dataset" => {
                    params.dataset = Some(Uuid::parse_str(value).map_err(|_| {
                        BrowseError::validation(key, "Must be a valid UUID.")
                    })?)
                }
                "include_all" => params.include_all = parse_bool(key, value)?,
                "exclude_dataset" => params.exclude_dataset = parse_bool(key, value)?,
                "cache" => params.bypass_cache = !parse_bool(key, value)?,
                _ => {}
            }
        }

        let storage_service = storage_service
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BrowseError::validation("storage_service", "This field is required."))?;
        let project = project
            .filter(|p| !p.is_empty())
            .ok_or_else(|| BrowseError::validation("project", "This field is required."))?;
        params.storage = StorageScope::new(storage_service, project);

        params.validate()?;
        Ok(params)
    }

    pub fn from_query(query: &str, default_limit: u64) -> BrowseResult<Self> {
        Self::from_query_pairs(url::form_urlencoded::parse(query.as_bytes()), default_limit)
    }

    /// Checks parameter combinations.
    pub fn validate(&self) -> BrowseResult<()> {
        if self.storage.storage_service.is_empty() {
            return Err(BrowseError::validation("storage_service", "This field is required."));
        }
        if self.storage.project.is_empty() {
            return Err(BrowseError::validation("project", "This field is required."));
        }
        // Storage id is irrelevant for the combination check.
        resolve_scope(Uuid::nil(), self.dataset, self.include_all, self.exclude_dataset)?;
        Ok(())
    }

    pub fn scope(&self, storage_id: Uuid) -> BrowseResult<FileScope> {
        resolve_scope(storage_id, self.dataset, self.include_all, self.exclude_dataset)
    }

    pub fn page(&self) -> Option<Pagination> {
        self.pagination
            .then(|| Pagination::new(self.offset, self.limit))
    }
}

fn parse_bool(param: &str, value: &str) -> BrowseResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(BrowseError::validation(param, "Must be a valid boolean.")),
    }
}

fn parse_non_negative(param: &str, value: &str) -> BrowseResult<u64> {
    let parsed: i64 = value
        .trim()
        .parse()
        .map_err(|_| BrowseError::validation(param, "A valid integer is required."))?;
    u64::try_from(parsed).map_err(|_| {
        BrowseError::validation(param, "Ensure this value is greater than or equal to 0.")
    })
}
