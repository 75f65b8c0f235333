//! In-process file collection used by tests and local tooling.
//!
//! A request holds the read lock for its whole snapshot read, so writers never
//! interleave with the aggregate, count and page queries of one request.

use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::aggregate::{group_files, DirectoryGroup};
use crate::catalog::{
    DatasetId, DirectoryMetadata, FileId, FileMetadata, FileRecord, StorageId, StorageInfo,
};
use crate::error::{BrowseError, BrowseResult};
use crate::fields::{FileOrderField, SortKey};
use crate::files::{compare_files, FileFilter};
use crate::paginate::FileWindow;
use crate::path::DirectoryPath;
use crate::scope::FileScope;
use crate::store::{
    load_snapshot, DirectorySnapshot, FileQueries, FileStore, FilesetProvider, MetadataProvider,
    SnapshotRequest, StorageRegistry,
};

#[derive(Debug, Default)]
struct MemoryState {
    storages: Vec<StorageInfo>,
    files: Vec<FileRecord>,
    filesets: HashMap<DatasetId, HashSet<FileId>>,
    file_metadata: HashMap<(DatasetId, FileId), FileMetadata>,
    directory_metadata: HashMap<(DatasetId, StorageId, String), DirectoryMetadata>,
}

impl MemoryState {
    fn is_member(&self, dataset: Option<DatasetId>, file: &FileRecord) -> bool {
        dataset
            .and_then(|dataset| self.filesets.get(&dataset))
            .is_some_and(|members| members.contains(&file.id))
    }

    fn matching<'f>(&'f self, filter: &'f FileFilter) -> impl Iterator<Item = &'f FileRecord> {
        let dataset = filter.scope.dataset.dataset_id();
        self.files
            .iter()
            .filter(move |file| filter.matches(file, |file| self.is_member(dataset, file)))
    }
}

#[derive(Debug, Default)]
pub struct MemoryFileStore {
    state: RwLock<MemoryState>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a storage scope, returning the existing one for a known pair.
    pub async fn add_storage(&self, storage_service: &str, project: &str) -> StorageInfo {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .storages
            .iter()
            .find(|s| s.storage_service == storage_service && s.project == project)
        {
            return existing.clone();
        }
        let storage = StorageInfo {
            id: Uuid::new_v4(),
            storage_service: storage_service.to_string(),
            project: project.to_string(),
        };
        state.storages.push(storage.clone());
        storage
    }

    /// Adds a file; its directory path is normalized first.
    pub async fn add_file(&self, file: FileRecord) -> BrowseResult<FileRecord> {
        let file = file.normalized()?;
        let mut state = self.state.write().await;
        if !state.storages.iter().any(|s| s.id == file.storage_id) {
            return Err(BrowseError::Internal {
                message: format!("Unknown storage {}", file.storage_id),
            });
        }
        state.files.retain(|existing| existing.id != file.id);
        state.files.push(file.clone());
        Ok(file)
    }

    /// Soft-deletes a file. Returns false when the file is unknown.
    pub async fn remove_file(&self, file_id: FileId) -> bool {
        let mut state = self.state.write().await;
        match state.files.iter_mut().find(|f| f.id == file_id) {
            Some(file) => {
                file.removed.get_or_insert_with(chrono::Utc::now);
                true
            }
            None => false,
        }
    }

    pub async fn add_to_fileset(&self, dataset: DatasetId, file_ids: &[FileId]) {
        let mut state = self.state.write().await;
        state
            .filesets
            .entry(dataset)
            .or_default()
            .extend(file_ids.iter().copied());
    }

    /// Stores file metadata for a dataset, replacing any earlier entry.
    pub async fn put_file_metadata(&self, dataset: DatasetId, metadata: FileMetadata) {
        let mut state = self.state.write().await;
        state
            .file_metadata
            .insert((dataset, metadata.file_id), metadata);
    }

    pub async fn put_directory_metadata(
        &self,
        dataset: DatasetId,
        storage: StorageId,
        metadata: DirectoryMetadata,
    ) {
        let mut state = self.state.write().await;
        state
            .directory_metadata
            .insert((dataset, storage, metadata.pathname.clone()), metadata);
    }
}

/// [`FileQueries`] over a locked state.
struct MemoryQueries<'a> {
    state: &'a MemoryState,
}

impl FileQueries for MemoryQueries<'_> {
    async fn directory_groups(
        &mut self,
        scope: &FileScope,
        path: &DirectoryPath,
    ) -> BrowseResult<Vec<DirectoryGroup>> {
        let dataset = scope.dataset.dataset_id();
        let scoped = self
            .state
            .files
            .iter()
            .filter(|file| scope.admits(file, |file| self.state.is_member(dataset, file)));
        Ok(group_files(path, scoped))
    }

    async fn count_files(&mut self, filter: &FileFilter) -> BrowseResult<u64> {
        Ok(self.state.matching(filter).count() as u64)
    }

    async fn list_files(
        &mut self,
        filter: &FileFilter,
        ordering: &[SortKey<FileOrderField>],
        window: Option<FileWindow>,
    ) -> BrowseResult<Vec<FileRecord>> {
        let mut files: Vec<FileRecord> = self.state.matching(filter).cloned().collect();
        files.sort_by(|a, b| compare_files(a, b, ordering));
        if let Some(window) = window {
            let range = window.range(files.len());
            files = files.drain(range).collect();
        }
        Ok(files)
    }
}

impl FileStore for MemoryFileStore {
    async fn read_directory(&self, request: &SnapshotRequest) -> BrowseResult<DirectorySnapshot> {
        let state = self.state.read().await;
        let mut queries = MemoryQueries { state: &state };
        load_snapshot(&mut queries, request).await
    }
}

impl StorageRegistry for MemoryFileStore {
    async fn resolve_storage(
        &self,
        storage_service: &str,
        project: &str,
    ) -> BrowseResult<Option<StorageInfo>> {
        let state = self.state.read().await;
        Ok(state
            .storages
            .iter()
            .find(|s| s.storage_service == storage_service && s.project == project)
            .cloned())
    }
}

impl FilesetProvider for MemoryFileStore {
    async fn members_among(
        &self,
        dataset: DatasetId,
        file_ids: &[FileId],
    ) -> BrowseResult<HashSet<FileId>> {
        let state = self.state.read().await;
        let Some(members) = state.filesets.get(&dataset) else {
            return Ok(HashSet::new());
        };
        Ok(file_ids
            .iter()
            .filter(|id| members.contains(id))
            .copied()
            .collect())
    }

    async fn member_ids(&self, dataset: DatasetId) -> BrowseResult<HashSet<FileId>> {
        let state = self.state.read().await;
        Ok(state.filesets.get(&dataset).cloned().unwrap_or_default())
    }
}

impl MetadataProvider for MemoryFileStore {
    async fn file_metadata(
        &self,
        dataset: DatasetId,
        file_ids: &[FileId],
    ) -> BrowseResult<HashMap<FileId, FileMetadata>> {
        let state = self.state.read().await;
        let metadata: HashMap<FileId, FileMetadata> = file_ids
            .iter()
            .filter_map(|id| {
                state
                    .file_metadata
                    .get(&(dataset, *id))
                    .map(|m| (*id, m.clone()))
            })
            .collect();
        debug!("Found metadata for {} of {} files", metadata.len(), file_ids.len());
        Ok(metadata)
    }

    async fn directory_metadata(
        &self,
        dataset: DatasetId,
        storage: StorageId,
        pathnames: &[String],
    ) -> BrowseResult<HashMap<String, DirectoryMetadata>> {
        let state = self.state.read().await;
        Ok(pathnames
            .iter()
            .filter_map(|pathname| {
                state
                    .directory_metadata
                    .get(&(dataset, storage, pathname.clone()))
                    .map(|m| (pathname.clone(), m.clone()))
            })
            .collect())
    }
}
