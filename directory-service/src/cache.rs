use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::aggregate::DirectoryGroup;
use crate::path::DirectoryPath;
use crate::scope::FileScope;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    scope: FileScope,
    path: DirectoryPath,
}

#[derive(Debug)]
struct CacheEntry {
    stored_at: Instant,
    groups: Vec<DirectoryGroup>,
}

/// Time-bounded cache of unfiltered directory groups.
///
/// Entries may be stale by up to `ttl`, so paginated reads never use it.
#[derive(Debug)]
pub struct AggregateCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl AggregateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, scope: &FileScope, path: &DirectoryPath) -> Option<Vec<DirectoryGroup>> {
        let key = CacheKey {
            scope: *scope,
            path: path.clone(),
        };
        let entries = self.entries.read().await;
        let entry = entries.get(&key)?;
        if entry.stored_at.elapsed() > self.ttl {
            return None;
        }
        debug!("Aggregate cache hit for {}", path);
        Some(entry.groups.clone())
    }

    pub async fn insert(&self, scope: &FileScope, path: &DirectoryPath, groups: Vec<DirectoryGroup>) {
        let key = CacheKey {
            scope: *scope,
            path: path.clone(),
        };
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.stored_at.elapsed() <= self.ttl);
        entries.insert(
            key,
            CacheEntry {
                stored_at: Instant::now(),
                groups,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::DatasetFilter;
    use chrono::Utc;
    use uuid::Uuid;

    fn group(name: &str) -> DirectoryGroup {
        DirectoryGroup {
            name: name.to_string(),
            pathname: format!("/{name}/"),
            file_count: 1,
            published_file_count: 0,
            size: 1,
            created: Utc::now(),
            modified: Utc::now(),
        }
    }

    #[tokio::test]
    async fn entries_are_keyed_by_scope_and_path() {
        let cache = AggregateCache::new(Duration::from_secs(60));
        let scope = FileScope::new(Uuid::new_v4());
        let members = FileScope {
            dataset: DatasetFilter::Members(Uuid::new_v4()),
            ..scope
        };
        let root = DirectoryPath::root();

        let groups = vec![group("a")];
        cache.insert(&scope, &root, groups.clone()).await;

        assert_eq!(cache.get(&scope, &root).await, Some(groups));
        assert!(cache.get(&members, &root).await.is_none());
        assert!(cache
            .get(&scope, &DirectoryPath::parse("/a/").unwrap())
            .await
            .is_none());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn expired_entries_are_not_served() {
        let cache = AggregateCache::new(Duration::from_millis(10));
        let scope = FileScope::new(Uuid::new_v4());
        let root = DirectoryPath::root();

        cache.insert(&scope, &root, vec![group("a")]).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(cache.get(&scope, &root).await.is_none());
    }
}
