#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::sync::Once;
use url::Url;
use uuid::Uuid;

use directory_service::catalog::{FileRecord, StorageInfo};
use directory_service::{DirectoryEngine, DirectoryListing, MemoryFileStore};

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

pub const BASE_URL: &str = "http://localhost/v3/directories";

pub fn day(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
}

/// Unpublished file of `size` bytes modified on January `modified_day`.
pub fn file(storage: &StorageInfo, pathname: &str, size: i64, modified_day: u32) -> FileRecord {
    let split = pathname.rfind('/').unwrap() + 1;
    FileRecord {
        id: Uuid::new_v4(),
        storage_id: storage.id,
        storage_identifier: Some(format!("s3://bucket{}", pathname)),
        filename: pathname[split..].to_string(),
        directory_path: pathname[..split].to_string(),
        size,
        checksum: Some(format!("sha256:{}", pathname.len())),
        modified: day(modified_day),
        published: None,
        removed: None,
        user: Some("uploader".to_string()),
    }
}

pub struct Fixture {
    pub engine: DirectoryEngine<MemoryFileStore>,
    pub storage: StorageInfo,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = MemoryFileStore::new();
        let storage = store.add_storage("ida", "project_x").await;
        Self {
            engine: DirectoryEngine::new(store),
            storage,
        }
    }

    pub fn store(&self) -> &MemoryFileStore {
        self.engine.store()
    }

    pub async fn add(&self, pathname: &str, size: i64, modified_day: u32) -> FileRecord {
        self.store()
            .add_file(file(&self.storage, pathname, size, modified_day))
            .await
            .unwrap()
    }

    pub async fn add_published(&self, pathname: &str, size: i64, modified_day: u32) -> FileRecord {
        let mut record = file(&self.storage, pathname, size, modified_day);
        record.published = Some(day(modified_day + 1));
        self.store().add_file(record).await.unwrap()
    }

    /// `/a.txt`, `/dir1/b.txt`, `/dir1/sub/c.txt` and `/dir2/d.txt`, 1024 bytes each.
    pub async fn with_sample_tree() -> (Self, Vec<FileRecord>) {
        let fixture = Self::new().await;
        let files = vec![
            fixture.add("/a.txt", 1024, 1).await,
            fixture.add("/dir1/b.txt", 1024, 2).await,
            fixture.add("/dir1/sub/c.txt", 1024, 3).await,
            fixture.add("/dir2/d.txt", 1024, 4).await,
        ];
        (fixture, files)
    }

    pub fn url(&self, query: &str) -> Url {
        let mut url = Url::parse(BASE_URL).unwrap();
        let scope = "storage_service=ida&project=project_x";
        if query.is_empty() {
            url.set_query(Some(scope));
        } else {
            url.set_query(Some(&format!("{}&{}", scope, query)));
        }
        url
    }

    pub async fn browse(&self, query: &str) -> DirectoryListing {
        self.engine.browse_url(&self.url(query)).await.unwrap()
    }
}

pub fn strings(items: &[Map<String, Value>], key: &str) -> Vec<String> {
    items
        .iter()
        .map(|item| item[key].as_str().unwrap().to_string())
        .collect()
}

pub fn numbers(items: &[Map<String, Value>], key: &str) -> Vec<u64> {
    items.iter().map(|item| item[key].as_u64().unwrap()).collect()
}

/// Subdirectory names followed by file names, in page order.
pub fn page_names(listing: &DirectoryListing) -> Vec<String> {
    let mut names = strings(&listing.directories, "name");
    names.extend(
        listing
            .files
            .iter()
            .map(|file| file["pathname"].as_str().unwrap().rsplit('/').next().unwrap().to_string()),
    );
    names
}
