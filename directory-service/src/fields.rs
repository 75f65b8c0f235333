//! Field and ordering allow-lists for directory and file listings.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{BrowseError, BrowseResult};

/// A closed set of named choices accepted in a request parameter.
pub trait Choice: Sized + Copy + Ord + 'static {
    const ALL: &'static [Self];

    fn as_str(self) -> &'static str;

    fn parse(param: &str, value: &str) -> BrowseResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|choice| choice.as_str() == value)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
                BrowseError::validation(
                    param,
                    format!(
                        "\"{}\" is not a valid choice. Valid choices are: [{}]",
                        value,
                        valid.join(", ")
                    ),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirectoryField {
    Name,
    Pathname,
    FileCount,
    PublishedFileCount,
    Size,
    Created,
    Modified,
    Url,
    StorageService,
    Project,
    DatasetMetadata,
}

impl Choice for DirectoryField {
    const ALL: &'static [Self] = &[
        DirectoryField::Name,
        DirectoryField::Pathname,
        DirectoryField::FileCount,
        DirectoryField::PublishedFileCount,
        DirectoryField::Size,
        DirectoryField::Created,
        DirectoryField::Modified,
        DirectoryField::Url,
        DirectoryField::StorageService,
        DirectoryField::Project,
        DirectoryField::DatasetMetadata,
    ];

    fn as_str(self) -> &'static str {
        match self {
            DirectoryField::Name => "name",
            DirectoryField::Pathname => "pathname",
            DirectoryField::FileCount => "file_count",
            DirectoryField::PublishedFileCount => "published_file_count",
            DirectoryField::Size => "size",
            DirectoryField::Created => "created",
            DirectoryField::Modified => "modified",
            DirectoryField::Url => "url",
            DirectoryField::StorageService => "storage_service",
            DirectoryField::Project => "project",
            DirectoryField::DatasetMetadata => "dataset_metadata",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileField {
    Id,
    StorageIdentifier,
    Pathname,
    Filename,
    Size,
    Checksum,
    Modified,
    Published,
    Removed,
    User,
    StorageService,
    Project,
    DatasetMetadata,
}

impl Choice for FileField {
    const ALL: &'static [Self] = &[
        FileField::Id,
        FileField::StorageIdentifier,
        FileField::Pathname,
        FileField::Filename,
        FileField::Size,
        FileField::Checksum,
        FileField::Modified,
        FileField::Published,
        FileField::Removed,
        FileField::User,
        FileField::StorageService,
        FileField::Project,
        FileField::DatasetMetadata,
    ];

    fn as_str(self) -> &'static str {
        match self {
            FileField::Id => "id",
            FileField::StorageIdentifier => "storage_identifier",
            FileField::Pathname => "pathname",
            FileField::Filename => "filename",
            FileField::Size => "size",
            FileField::Checksum => "checksum",
            FileField::Modified => "modified",
            FileField::Published => "published",
            FileField::Removed => "removed",
            FileField::User => "user",
            FileField::StorageService => "storage_service",
            FileField::Project => "project",
            FileField::DatasetMetadata => "dataset_metadata",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirectoryOrderField {
    Name,
    FileCount,
    PublishedFileCount,
    Size,
    Created,
    Modified,
}

impl Choice for DirectoryOrderField {
    const ALL: &'static [Self] = &[
        DirectoryOrderField::Name,
        DirectoryOrderField::FileCount,
        DirectoryOrderField::PublishedFileCount,
        DirectoryOrderField::Size,
        DirectoryOrderField::Created,
        DirectoryOrderField::Modified,
    ];

    fn as_str(self) -> &'static str {
        match self {
            DirectoryOrderField::Name => "name",
            DirectoryOrderField::FileCount => "file_count",
            DirectoryOrderField::PublishedFileCount => "published_file_count",
            DirectoryOrderField::Size => "size",
            DirectoryOrderField::Created => "created",
            DirectoryOrderField::Modified => "modified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileOrderField {
    Filename,
    Pathname,
    Size,
    Published,
    Modified,
    Removed,
}

impl Choice for FileOrderField {
    const ALL: &'static [Self] = &[
        FileOrderField::Filename,
        FileOrderField::Pathname,
        FileOrderField::Size,
        FileOrderField::Published,
        FileOrderField::Modified,
        FileOrderField::Removed,
    ];

    fn as_str(self) -> &'static str {
        match self {
            FileOrderField::Filename => "filename",
            FileOrderField::Pathname => "pathname",
            FileOrderField::Size => "size",
            FileOrderField::Published => "published",
            FileOrderField::Modified => "modified",
            FileOrderField::Removed => "removed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn apply(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// One `field` or `-field` entry of an ordering parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortKey<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F: Choice> SortKey<F> {
    pub fn asc(field: F) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: F) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }

    pub fn parse(param: &str, value: &str) -> BrowseResult<Self> {
        match value.strip_prefix('-') {
            Some(name) => F::parse(param, name)
                .map(Self::desc)
                .map_err(|_| Self::invalid(param, value)),
            None => F::parse(param, value)
                .map(Self::asc)
                .map_err(|_| Self::invalid(param, value)),
        }
    }

    fn invalid(param: &str, value: &str) -> BrowseError {
        let valid: Vec<String> = F::ALL
            .iter()
            .map(|c| c.as_str().to_string())
            .chain(F::ALL.iter().map(|c| format!("-{}", c.as_str())))
            .collect();
        BrowseError::validation(
            param,
            format!(
                "\"{}\" is not a valid choice. Valid choices are: [{}]",
                value,
                valid.join(", ")
            ),
        )
    }
}

impl<F: Choice> fmt::Display for SortKey<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Ascending => write!(f, "{}", self.field.as_str()),
            SortDirection::Descending => write!(f, "-{}", self.field.as_str()),
        }
    }
}

/// Requested subset of fields; `All` when the parameter was not given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection<F: Ord> {
    All,
    Only(BTreeSet<F>),
}

impl<F: Ord> Default for FieldSelection<F> {
    fn default() -> Self {
        FieldSelection::All
    }
}

impl<F: Choice> FieldSelection<F> {
    pub fn only(fields: impl IntoIterator<Item = F>) -> Self {
        FieldSelection::Only(fields.into_iter().collect())
    }

    pub fn includes(&self, field: F) -> bool {
        match self {
            FieldSelection::All => true,
            FieldSelection::Only(fields) => fields.contains(&field),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, FieldSelection::All)
    }

    /// Fields in allow-list order, restricted to the selection.
    pub fn iter(&self) -> impl Iterator<Item = F> + '_ {
        F::ALL.iter().copied().filter(move |f| self.includes(*f))
    }
}

pub fn parse_list<T>(
    param: &str,
    raw: &str,
    parse: impl Fn(&str, &str) -> BrowseResult<T>,
) -> BrowseResult<Vec<T>> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| parse(param, value))
        .collect()
}
