//! Read-side collaborator interfaces and the per-request snapshot read.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use tracing::debug;

use crate::aggregate::{matching_subdirectories, DirectoryFilter, DirectoryGroup};
use crate::catalog::{
    DatasetId, DirectoryMetadata, FileId, FileMetadata, FileRecord, StorageId, StorageInfo,
};
use crate::error::BrowseResult;
use crate::fields::{DirectoryOrderField, FileOrderField, SortKey};
use crate::files::FileFilter;
use crate::paginate::{FileWindow, Pagination};
use crate::path::DirectoryPath;
use crate::scope::FileScope;

pub trait StorageRegistry: Send + Sync {
    /// `None` when no such storage scope exists.
    fn resolve_storage(
        &self,
        storage_service: &str,
        project: &str,
    ) -> impl Future<Output = BrowseResult<Option<StorageInfo>>> + Send;
}

pub trait FilesetProvider: Send + Sync {
    /// The subset of `file_ids` that belongs to the dataset's file-set.
    fn members_among(
        &self,
        dataset: DatasetId,
        file_ids: &[FileId],
    ) -> impl Future<Output = BrowseResult<HashSet<FileId>>> + Send;

    fn is_member(
        &self,
        dataset: DatasetId,
        file_id: FileId,
    ) -> impl Future<Output = BrowseResult<bool>> + Send {
        async move {
            self.members_among(dataset, &[file_id])
                .await
                .map(|members| members.contains(&file_id))
        }
    }

    fn member_ids(
        &self,
        dataset: DatasetId,
    ) -> impl Future<Output = BrowseResult<HashSet<FileId>>> + Send;
}

pub trait MetadataProvider: Send + Sync {
    /// Most recent metadata per file; files without metadata are absent.
    fn file_metadata(
        &self,
        dataset: DatasetId,
        file_ids: &[FileId],
    ) -> impl Future<Output = BrowseResult<HashMap<FileId, FileMetadata>>> + Send;

    /// Metadata keyed by exact directory pathname.
    fn directory_metadata(
        &self,
        dataset: DatasetId,
        storage: StorageId,
        pathnames: &[String],
    ) -> impl Future<Output = BrowseResult<HashMap<String, DirectoryMetadata>>> + Send;
}

/// Queries that must observe one consistent view of the file collection.
pub trait FileQueries: Send {
    /// Unfiltered groups for every file under `path` admitted by `scope`.
    fn directory_groups(
        &mut self,
        scope: &FileScope,
        path: &DirectoryPath,
    ) -> impl Future<Output = BrowseResult<Vec<DirectoryGroup>>> + Send;

    fn count_files(&mut self, filter: &FileFilter) -> impl Future<Output = BrowseResult<u64>> + Send;

    /// Files matching `filter` in the requested order; `window` limits the slice.
    fn list_files(
        &mut self,
        filter: &FileFilter,
        ordering: &[SortKey<FileOrderField>],
        window: Option<FileWindow>,
    ) -> impl Future<Output = BrowseResult<Vec<FileRecord>>> + Send;
}

pub trait FileStore: Send + Sync {
    /// Runs [`load_snapshot`] against a single snapshot of the backend.
    fn read_directory(
        &self,
        request: &SnapshotRequest,
    ) -> impl Future<Output = BrowseResult<DirectorySnapshot>> + Send;
}

#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    pub scope: FileScope,
    pub path: DirectoryPath,
    pub name: Option<String>,
    pub published: Option<bool>,
    pub directory_ordering: Vec<SortKey<DirectoryOrderField>>,
    pub file_ordering: Vec<SortKey<FileOrderField>>,
    /// `None` reads every matching file.
    pub pagination: Option<Pagination>,
    /// Groups served from the aggregate cache; skips the aggregate query.
    pub cached_groups: Option<Vec<DirectoryGroup>>,
}

impl SnapshotRequest {
    pub fn file_filter(&self) -> FileFilter {
        FileFilter {
            scope: self.scope,
            directory_path: self.path.clone(),
            name: self.name.clone(),
            published: self.published,
        }
    }

    pub fn directory_filter(&self) -> DirectoryFilter<'_> {
        DirectoryFilter {
            name: self.name.as_deref(),
            published: self.published,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectorySnapshot {
    /// Every group under the path, current directory included, before display filters.
    pub groups: Vec<DirectoryGroup>,
    /// Filtered, ordered subdirectories (not paginated).
    pub subdirectories: Vec<DirectoryGroup>,
    /// Total files matching the file filter.
    pub file_count: u64,
    /// The file page, or every matching file when pagination is off.
    pub files: Vec<FileRecord>,
}

/// Aggregate, count and page reads for one request.
pub async fn load_snapshot<Q: FileQueries>(
    queries: &mut Q,
    request: &SnapshotRequest,
) -> BrowseResult<DirectorySnapshot> {
    let groups = match &request.cached_groups {
        Some(groups) => groups.clone(),
        None => queries.directory_groups(&request.scope, &request.path).await?,
    };
    let subdirectories = matching_subdirectories(
        &groups,
        &request.directory_filter(),
        &request.directory_ordering,
    );

    let filter = request.file_filter();
    let (file_count, files) = match request.pagination {
        Some(pagination) => {
            let file_count = queries.count_files(&filter).await?;
            let window = pagination.file_window(subdirectories.len());
            let files = if window.limit == 0 || window.offset >= file_count {
                Vec::new()
            } else {
                queries
                    .list_files(&filter, &request.file_ordering, Some(window))
                    .await?
            };
            (file_count, files)
        }
        None => {
            let files = queries
                .list_files(&filter, &request.file_ordering, None)
                .await?;
            (files.len() as u64, files)
        }
    };

    debug!(
        "Snapshot for {}: {} groups, {} subdirectories, {} files ({} on page)",
        request.path,
        groups.len(),
        subdirectories.len(),
        file_count,
        files.len()
    );

    Ok(DirectorySnapshot {
        groups,
        subdirectories,
        file_count,
        files,
    })
}
