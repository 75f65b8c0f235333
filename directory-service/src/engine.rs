use tracing::{debug, info};
use url::Url;

use crate::aggregate::parent_aggregate;
use crate::cache::AggregateCache;
use crate::error::BrowseResult;
use crate::overlay::{load_overlays, OverlayRequest};
use crate::paginate::{take_range, DEFAULT_LIMIT};
use crate::params::BrowseParams;
use crate::response::{assemble, DirectoryListing, ListingParts, PaginationEnvelope};
use crate::store::{FileStore, FilesetProvider, MetadataProvider, SnapshotRequest, StorageRegistry};

/// Browses virtual directories synthesized from a flat file collection.
pub struct DirectoryEngine<S> {
    store: S,
    cache: Option<AggregateCache>,
    default_limit: u64,
}

impl<S> DirectoryEngine<S>
where
    S: FileStore + StorageRegistry + FilesetProvider + MetadataProvider,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: None,
            default_limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_cache(mut self, cache: AggregateCache) -> Self {
        info!("Aggregate cache enabled with ttl {:?}", cache.ttl());
        self.cache = Some(cache);
        self
    }

    pub fn with_default_limit(mut self, limit: u64) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> Option<&AggregateCache> {
        self.cache.as_ref()
    }

    /// Parses the query of `request_url` and browses it.
    pub async fn browse_url(&self, request_url: &Url) -> BrowseResult<DirectoryListing> {
        let params = BrowseParams::from_query_pairs(request_url.query_pairs(), self.default_limit)?;
        self.browse(&params, request_url).await
    }

    /// Lists one directory page. `request_url` is the base for navigation references.
    pub async fn browse(
        &self,
        params: &BrowseParams,
        request_url: &Url,
    ) -> BrowseResult<DirectoryListing> {
        params.validate()?;
        info!(
            "Browsing {} in {}/{} (dataset: {:?})",
            params.path, params.storage.storage_service, params.storage.project, params.dataset
        );

        let Some(storage) = self
            .store
            .resolve_storage(&params.storage.storage_service, &params.storage.project)
            .await?
        else {
            info!(
                "Storage {}/{} not found, returning empty listing",
                params.storage.storage_service, params.storage.project
            );
            return Ok(empty_listing(params));
        };

        let scope = params.scope(storage.id)?;
        let pagination = params.page();
        // Paginated reads always aggregate fresh.
        let use_cache = pagination.is_none() && !params.bypass_cache;
        let cached_groups = match (&self.cache, use_cache) {
            (Some(cache), true) => cache.get(&scope, &params.path).await,
            _ => None,
        };
        let from_cache = cached_groups.is_some();

        let request = SnapshotRequest {
            scope,
            path: params.path.clone(),
            name: params.name.clone(),
            published: params.published,
            directory_ordering: params.directory_ordering.clone(),
            file_ordering: params.file_ordering.clone(),
            pagination,
            cached_groups,
        };
        let snapshot = self.store.read_directory(&request).await?;

        if let (Some(cache), false) = (&self.cache, from_cache) {
            cache
                .insert(&scope, &params.path, snapshot.groups.clone())
                .await;
        }

        let directory_exists = !snapshot.groups.is_empty();
        let parent = params
            .include_parent
            .then(|| parent_aggregate(&params.path, &snapshot.groups));

        let directory_count = snapshot.subdirectories.len();
        let (directories, page) = match pagination {
            Some(pagination) => {
                let directories = take_range(
                    snapshot.subdirectories,
                    pagination.directory_range(directory_count),
                );
                let info = pagination.page_info(
                    directory_count,
                    snapshot.file_count,
                    directories.len() + snapshot.files.len(),
                );
                (directories, Some((pagination, info)))
            }
            None => (snapshot.subdirectories, None),
        };
        let files = snapshot.files;

        let overlays = load_overlays(
            &self.store,
            &OverlayRequest {
                dataset: params.dataset,
                exclude_dataset: params.exclude_dataset,
                storage_id: storage.id,
                path: &params.path,
                directory_fields: &params.directory_fields,
                file_fields: &params.file_fields,
            },
            &directories,
            &files,
        )
        .await?;

        debug!(
            "Page for {}: {} directories, {} files, exists: {}",
            params.path,
            directories.len(),
            files.len(),
            directory_exists
        );

        Ok(assemble(ListingParts {
            request_url,
            path: &params.path,
            storage: &storage,
            parent,
            directories,
            files,
            directory_fields: &params.directory_fields,
            file_fields: &params.file_fields,
            overlays,
            page,
            directory_exists,
        }))
    }

    pub async fn health_check(&self) -> BrowseResult<()> {
        self.store
            .resolve_storage("health-check", "health-check")
            .await
            .map(|_| ())
    }
}

fn empty_listing(params: &BrowseParams) -> DirectoryListing {
    DirectoryListing {
        pagination: params.pagination.then(|| PaginationEnvelope {
            count: 0,
            next: None,
            previous: None,
        }),
        directory: None,
        directories: Vec::new(),
        files: Vec::new(),
        directory_exists: false,
    }
}
