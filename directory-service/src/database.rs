use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use diesel_async::{
    pooled_connection::{
        deadpool::{Object, Pool},
        AsyncDieselConnectionManager,
    },
    scoped_futures::ScopedFutureExt,
    AsyncPgConnection, RunQueryDsl,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregate::DirectoryGroup;
use crate::catalog::{
    DatasetId, DirectoryMetadata, FileId, FileMetadata, FileRecord, StorageId, StorageInfo,
};
use crate::error::{BrowseError, BrowseResult};
use crate::fields::{FileOrderField, SortDirection, SortKey};
use crate::files::FileFilter;
use crate::models::*;
use crate::paginate::FileWindow;
use crate::path::DirectoryPath;
use crate::schema::*;
use crate::scope::{DatasetFilter, FileScope};
use crate::store::{
    load_snapshot, DirectorySnapshot, FileQueries, FileStore, FilesetProvider, MetadataProvider,
    SnapshotRequest, StorageRegistry,
};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// File collection, storages, file-sets and metadata stored in PostgreSQL.
#[derive(Clone)]
pub struct PgFileStore {
    pool: Pool<AsyncPgConnection>,
}

impl PgFileStore {
    pub async fn new(database_url: &str) -> BrowseResult<Self> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(config)
            .build()
            .map_err(|e| BrowseError::Config {
                message: format!("Failed to create database pool: {}", e),
            })?;

        let store = Self { pool };
        store.run_migrations(database_url).await?;

        Ok(store)
    }

    pub async fn run_migrations(&self, database_url: &str) -> BrowseResult<()> {
        use diesel::Connection;
        use diesel::PgConnection;

        // diesel_migrations only drives synchronous connections.
        let database_url = database_url.to_string();
        tokio::task::spawn_blocking(move || {
            let mut connection =
                PgConnection::establish(&database_url).map_err(|e| BrowseError::Config {
                    message: format!("Failed to establish connection for migrations: {}", e),
                })?;

            let applied = connection
                .run_pending_migrations(MIGRATIONS)
                .map_err(|e| BrowseError::Config {
                    message: format!("Failed to run migrations: {}", e),
                })?;
            info!("Applied {} pending migrations", applied.len());
            Ok::<(), BrowseError>(())
        })
        .await
        .map_err(|e| BrowseError::Internal {
            message: format!("Migration task failed: {}", e),
        })?
    }

    async fn connection(&self) -> BrowseResult<Object<AsyncPgConnection>> {
        self.pool.get().await.map_err(|e| BrowseError::Database {
            message: format!("Failed to get database connection: {}", e),
        })
    }

    /// Registers a storage scope, returning the existing one for a known pair.
    pub async fn add_storage(&self, storage_service: &str, project: &str) -> BrowseResult<StorageInfo> {
        let mut conn = self.connection().await?;
        diesel::insert_into(storages::table)
            .values(&NewStorage {
                id: Uuid::new_v4(),
                storage_service,
                project,
            })
            .on_conflict((storages::storage_service, storages::project))
            .do_nothing()
            .execute(&mut conn)
            .await?;

        let storage = storages::table
            .filter(storages::storage_service.eq(storage_service))
            .filter(storages::project.eq(project))
            .select(StorageRow::as_select())
            .first::<StorageRow>(&mut conn)
            .await?;
        info!("Registered storage {}/{}", storage_service, project);
        Ok(storage.into())
    }

    /// Adds or replaces a file; its directory path is normalized first.
    pub async fn add_file(&self, file: FileRecord) -> BrowseResult<FileRecord> {
        let file = file.normalized()?;
        let mut conn = self.connection().await?;
        let row = NewFile::from(&file);
        diesel::insert_into(files::table)
            .values(&row)
            .on_conflict(files::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)
            .await?;
        Ok(file)
    }

    /// Soft-deletes a file. Returns false when the file is unknown.
    pub async fn remove_file(&self, file_id: FileId) -> BrowseResult<bool> {
        let mut conn = self.connection().await?;
        diesel::update(
            files::table
                .filter(files::id.eq(file_id))
                .filter(files::removed.is_null()),
        )
        .set(files::removed.eq(chrono::Utc::now()))
        .execute(&mut conn)
        .await?;

        let exists = diesel::select(diesel::dsl::exists(files::table.find(file_id)))
            .get_result::<bool>(&mut conn)
            .await?;
        Ok(exists)
    }

    pub async fn add_to_fileset(&self, dataset: DatasetId, file_ids: &[FileId]) -> BrowseResult<()> {
        if file_ids.is_empty() {
            return Ok(());
        }
        let rows: Vec<NewFileSetFile> = file_ids
            .iter()
            .map(|&file_id| NewFileSetFile {
                dataset_id: dataset,
                file_id,
            })
            .collect();
        let mut conn = self.connection().await?;
        let inserted = diesel::insert_into(file_set_files::table)
            .values(&rows)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await?;
        debug!("Added {} files to dataset {}", inserted, dataset);
        Ok(())
    }

    /// Appends file metadata; the latest entry per file is the one read back.
    pub async fn put_file_metadata(&self, dataset: DatasetId, metadata: FileMetadata) -> BrowseResult<()> {
        let mut conn = self.connection().await?;
        diesel::insert_into(file_metadata::table)
            .values(&NewFileMetadata {
                dataset_id: dataset,
                file_id: metadata.file_id,
                title: metadata.title.as_deref(),
                description: metadata.description.as_deref(),
                file_type: metadata.file_type.as_deref(),
                use_category: metadata.use_category.as_deref(),
            })
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn put_directory_metadata(
        &self,
        dataset: DatasetId,
        storage: StorageId,
        metadata: DirectoryMetadata,
    ) -> BrowseResult<()> {
        let mut conn = self.connection().await?;
        diesel::insert_into(directory_metadata::table)
            .values(&NewDirectoryMetadata {
                dataset_id: dataset,
                storage_id: storage,
                pathname: &metadata.pathname,
                title: metadata.title.as_deref(),
                description: metadata.description.as_deref(),
                use_category: metadata.use_category.as_deref(),
            })
            .execute(&mut conn)
            .await?;
        Ok(())
    }
}

/// [`FileQueries`] bound to the connection of one open transaction.
struct PgQueries<'c> {
    conn: &'c mut AsyncPgConnection,
}

impl FileQueries for PgQueries<'_> {
    async fn directory_groups(
        &mut self,
        scope: &FileScope,
        path: &DirectoryPath,
    ) -> BrowseResult<Vec<DirectoryGroup>> {
        let membership = match scope.dataset {
            DatasetFilter::All => "",
            DatasetFilter::Members(_) => {
                " AND EXISTS (SELECT 1 FROM file_set_files m \
                 WHERE m.file_id = f.id AND m.dataset_id = $4)"
            }
            DatasetFilter::NonMembers(_) => {
                " AND NOT EXISTS (SELECT 1 FROM file_set_files m \
                 WHERE m.file_id = f.id AND m.dataset_id = $4)"
            }
        };
        let sql = format!(
            "SELECT split_part(f.directory_path, '/', $1) AS name, \
             COUNT(*) AS file_count, \
             COUNT(f.published) AS published_file_count, \
             COALESCE(SUM(f.size), 0)::BIGINT AS size, \
             MIN(f.modified) AS created, \
             MAX(f.modified) AS modified \
             FROM files f \
             WHERE f.storage_id = $2 AND f.removed IS NULL \
             AND f.directory_path LIKE $3 ESCAPE '\\'{} \
             GROUP BY 1 ORDER BY 1",
            membership
        );

        let mut query = diesel::sql_query(sql)
            .into_boxed::<Pg>()
            .bind::<Integer, _>(path.child_segment_index())
            .bind::<diesel::sql_types::Uuid, _>(scope.storage_id)
            .bind::<Text, _>(format!("{}%", escape_like(path.as_str())));
        if let Some(dataset) = scope.dataset.dataset_id() {
            query = query.bind::<diesel::sql_types::Uuid, _>(dataset);
        }

        let rows = query.load::<DirectoryGroupRow>(self.conn).await?;
        Ok(rows.into_iter().map(|row| row.into_group(path)).collect())
    }

    async fn count_files(&mut self, filter: &FileFilter) -> BrowseResult<u64> {
        let count: i64 = filtered_files(filter).count().get_result(self.conn).await?;
        Ok(count.max(0) as u64)
    }

    async fn list_files(
        &mut self,
        filter: &FileFilter,
        ordering: &[SortKey<FileOrderField>],
        window: Option<FileWindow>,
    ) -> BrowseResult<Vec<FileRecord>> {
        let mut query = filtered_files(filter);
        for key in ordering {
            query = order_files(query, key);
        }
        query = query.then_order_by(files::filename.asc());
        if let Some(window) = window {
            query = query
                .offset(to_sql_int(window.offset))
                .limit(to_sql_int(window.limit));
        }

        let rows = query.load::<FileRow>(self.conn).await?;
        Ok(rows.into_iter().map(FileRecord::from).collect())
    }
}

/// Files stored directly in the filter's directory, scope and display filters applied.
fn filtered_files(filter: &FileFilter) -> files::BoxedQuery<'static, Pg> {
    let mut query = files::table
        .filter(files::storage_id.eq(filter.scope.storage_id))
        .filter(files::removed.is_null())
        .filter(files::directory_path.eq(filter.directory_path.as_str().to_string()))
        .into_boxed();

    match filter.scope.dataset {
        DatasetFilter::All => {}
        DatasetFilter::Members(dataset) => {
            query = query.filter(
                files::id.eq_any(
                    file_set_files::table
                        .filter(file_set_files::dataset_id.eq(dataset))
                        .select(file_set_files::file_id),
                ),
            );
        }
        DatasetFilter::NonMembers(dataset) => {
            query = query.filter(diesel::dsl::not(
                files::id.eq_any(
                    file_set_files::table
                        .filter(file_set_files::dataset_id.eq(dataset))
                        .select(file_set_files::file_id),
                ),
            ));
        }
    }

    if let Some(name) = &filter.name {
        query = query.filter(files::filename.ilike(format!("%{}%", escape_like(name))));
    }

    match filter.published {
        Some(true) => query.filter(files::published.is_not_null()),
        Some(false) => query.filter(files::published.is_null()),
        None => query,
    }
}

// Nulls sort like `None` does in-process: first ascending, last descending.
fn order_files(
    query: files::BoxedQuery<'static, Pg>,
    key: &SortKey<FileOrderField>,
) -> files::BoxedQuery<'static, Pg> {
    use FileOrderField::*;
    use SortDirection::*;

    match (key.field, key.direction) {
        (Filename, Ascending) => query.then_order_by(files::filename.asc()),
        (Filename, Descending) => query.then_order_by(files::filename.desc()),
        (Pathname, Ascending) => query
            .then_order_by(files::directory_path.asc())
            .then_order_by(files::filename.asc()),
        (Pathname, Descending) => query
            .then_order_by(files::directory_path.desc())
            .then_order_by(files::filename.desc()),
        (Size, Ascending) => query.then_order_by(files::size.asc()),
        (Size, Descending) => query.then_order_by(files::size.desc()),
        (Modified, Ascending) => query.then_order_by(files::modified.asc()),
        (Modified, Descending) => query.then_order_by(files::modified.desc()),
        (Published, Ascending) => query.then_order_by(files::published.asc().nulls_first()),
        (Published, Descending) => query.then_order_by(files::published.desc().nulls_last()),
        (Removed, Ascending) => query.then_order_by(files::removed.asc().nulls_first()),
        (Removed, Descending) => query.then_order_by(files::removed.desc().nulls_last()),
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl FileStore for PgFileStore {
    async fn read_directory(&self, request: &SnapshotRequest) -> BrowseResult<DirectorySnapshot> {
        let mut conn = self.connection().await?;
        // Aggregate, count and page reads share one snapshot.
        conn.build_transaction()
            .read_only()
            .repeatable_read()
            .run(|conn| {
                async move {
                    let mut queries = PgQueries { conn };
                    load_snapshot(&mut queries, request).await
                }
                .scope_boxed()
            })
            .await
    }
}

impl StorageRegistry for PgFileStore {
    async fn resolve_storage(
        &self,
        storage_service: &str,
        project: &str,
    ) -> BrowseResult<Option<StorageInfo>> {
        let mut conn = self.connection().await?;
        let storage = storages::table
            .filter(storages::storage_service.eq(storage_service))
            .filter(storages::project.eq(project))
            .select(StorageRow::as_select())
            .first::<StorageRow>(&mut conn)
            .await
            .optional()?;
        Ok(storage.map(StorageInfo::from))
    }
}

impl FilesetProvider for PgFileStore {
    async fn members_among(
        &self,
        dataset: DatasetId,
        file_ids: &[FileId],
    ) -> BrowseResult<HashSet<FileId>> {
        if file_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let mut conn = self.connection().await?;
        let members = file_set_files::table
            .filter(file_set_files::dataset_id.eq(dataset))
            .filter(file_set_files::file_id.eq_any(file_ids.to_vec()))
            .select(file_set_files::file_id)
            .load::<Uuid>(&mut conn)
            .await?;
        Ok(members.into_iter().collect())
    }

    async fn member_ids(&self, dataset: DatasetId) -> BrowseResult<HashSet<FileId>> {
        let mut conn = self.connection().await?;
        let members = file_set_files::table
            .filter(file_set_files::dataset_id.eq(dataset))
            .select(file_set_files::file_id)
            .load::<Uuid>(&mut conn)
            .await?;
        debug!("Dataset {} has {} file-set members", dataset, members.len());
        Ok(members.into_iter().collect())
    }
}

impl MetadataProvider for PgFileStore {
    async fn file_metadata(
        &self,
        dataset: DatasetId,
        file_ids: &[FileId],
    ) -> BrowseResult<HashMap<FileId, FileMetadata>> {
        if file_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.connection().await?;
        // Latest entry per file wins.
        let rows = file_metadata::table
            .filter(file_metadata::dataset_id.eq(dataset))
            .filter(file_metadata::file_id.eq_any(file_ids.to_vec()))
            .distinct_on(file_metadata::file_id)
            .order_by((file_metadata::file_id, file_metadata::id.desc()))
            .select(FileMetadataRow::as_select())
            .load::<FileMetadataRow>(&mut conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.file_id, FileMetadata::from(row)))
            .collect())
    }

    async fn directory_metadata(
        &self,
        dataset: DatasetId,
        storage: StorageId,
        pathnames: &[String],
    ) -> BrowseResult<HashMap<String, DirectoryMetadata>> {
        if pathnames.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.connection().await?;
        let rows = directory_metadata::table
            .filter(directory_metadata::dataset_id.eq(dataset))
            .filter(directory_metadata::storage_id.eq(storage))
            .filter(directory_metadata::pathname.eq_any(pathnames.to_vec()))
            .distinct_on(directory_metadata::pathname)
            .order_by((directory_metadata::pathname, directory_metadata::id.desc()))
            .select(DirectoryMetadataRow::as_select())
            .load::<DirectoryMetadataRow>(&mut conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.pathname.clone(), DirectoryMetadata::from(row)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(escape_like("/data_2024/"), "/data\\_2024/");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn oversized_windows_saturate() {
        assert_eq!(to_sql_int(u64::MAX), i64::MAX);
        assert_eq!(to_sql_int(25), 25);
    }
}
