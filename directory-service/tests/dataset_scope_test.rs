mod common;

use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tokio_test::assert_ok;
use uuid::Uuid;

use common::{init_test_logging, numbers, strings, Fixture};
use directory_service::catalog::{DirectoryMetadata, FileMetadata};
use directory_service::store::FilesetProvider;
use directory_service::{AggregateCache, DirectoryEngine, MemoryFileStore};

struct DatasetFixture {
    fixture: Fixture,
    dataset: Uuid,
    member: Uuid,
    outsider: Uuid,
}

/// Sample tree plus `/z.txt`; the dataset holds `/a.txt` and `/dir1/b.txt`.
async fn dataset_fixture() -> DatasetFixture {
    let (fixture, files) = Fixture::with_sample_tree().await;
    let outsider = fixture.add("/z.txt", 10, 5).await;
    let dataset = Uuid::new_v4();
    let store = fixture.store();
    store.add_to_fileset(dataset, &[files[0].id, files[1].id]).await;

    store
        .put_file_metadata(
            dataset,
            FileMetadata {
                file_id: files[0].id,
                title: Some("Draft title".to_string()),
                ..Default::default()
            },
        )
        .await;
    store
        .put_file_metadata(
            dataset,
            FileMetadata {
                file_id: files[0].id,
                title: Some("Alpha".to_string()),
                use_category: Some("documentation".to_string()),
                ..Default::default()
            },
        )
        .await;
    store
        .put_file_metadata(
            dataset,
            FileMetadata {
                file_id: outsider.id,
                title: Some("Not in the file-set".to_string()),
                ..Default::default()
            },
        )
        .await;
    for pathname in ["/", "/dir1/"] {
        store
            .put_directory_metadata(
                dataset,
                fixture.storage.id,
                DirectoryMetadata {
                    pathname: pathname.to_string(),
                    title: Some(format!("Directory {pathname}")),
                    ..Default::default()
                },
            )
            .await;
    }

    DatasetFixture {
        fixture,
        dataset,
        member: files[0].id,
        outsider: outsider.id,
    }
}

#[tokio::test]
async fn test_dataset_narrows_to_fileset_members() {
    init_test_logging();

    // Given
    let DatasetFixture {
        fixture, dataset, ..
    } = dataset_fixture().await;

    // When
    let listing = fixture.browse(&format!("dataset={dataset}")).await;

    // Then: only members are visible, aggregates included
    assert_eq!(strings(&listing.directories, "name"), vec!["dir1"]);
    assert_eq!(numbers(&listing.directories, "file_count"), vec![1]);
    assert_eq!(strings(&listing.files, "pathname"), vec!["/a.txt"]);
    assert_eq!(listing.directory.as_ref().unwrap()["file_count"], 2);

    // And: overlays are attached, latest file metadata winning
    assert_eq!(listing.files[0]["dataset_metadata"]["title"], "Alpha");
    assert_eq!(
        listing.files[0]["dataset_metadata"]["use_category"],
        "documentation"
    );
    assert_eq!(
        listing.directories[0]["dataset_metadata"]["title"],
        "Directory /dir1/"
    );
    assert_eq!(
        listing.directory.as_ref().unwrap()["dataset_metadata"]["title"],
        "Directory /"
    );
}

#[tokio::test]
async fn test_exclude_dataset_lists_only_non_members() {
    init_test_logging();

    // Given
    let DatasetFixture {
        fixture, dataset, ..
    } = dataset_fixture().await;

    // When
    let listing = fixture
        .browse(&format!("dataset={dataset}&exclude_dataset=true"))
        .await;

    // Then: dir1 keeps only its nested non-member file
    assert_eq!(strings(&listing.directories, "name"), vec!["dir1", "dir2"]);
    assert_eq!(numbers(&listing.directories, "file_count"), vec![1, 1]);
    assert_eq!(strings(&listing.files, "pathname"), vec!["/z.txt"]);

    // And: no overlays are loaded for excluded datasets
    assert!(!listing.files[0].contains_key("dataset_metadata"));
    assert!(!listing.directories[0].contains_key("dataset_metadata"));
}

#[tokio::test]
async fn test_include_all_distinguishes_members_by_overlay() {
    init_test_logging();

    // Given
    let DatasetFixture {
        fixture, dataset, ..
    } = dataset_fixture().await;

    // When
    let listing = fixture
        .browse(&format!("dataset={dataset}&include_all=true"))
        .await;

    // Then: every file is visible
    assert_eq!(numbers(&listing.directories, "file_count"), vec![2, 1]);
    assert_eq!(strings(&listing.files, "pathname"), vec!["/a.txt", "/z.txt"]);

    // And: only the member carries metadata, even though the outsider has some stored
    assert_eq!(listing.files[0]["dataset_metadata"]["title"], "Alpha");
    assert_eq!(listing.files[1]["dataset_metadata"], Value::Null);
    assert_eq!(listing.directories[1]["dataset_metadata"], Value::Null);
}

#[tokio::test]
async fn test_overlays_follow_requested_fields() {
    init_test_logging();

    // Given
    let DatasetFixture {
        fixture, dataset, ..
    } = dataset_fixture().await;

    // When: dataset_metadata is not among the requested fields
    let listing = fixture
        .browse(&format!(
            "dataset={dataset}&file_fields=pathname&directory_fields=name"
        ))
        .await;

    // Then
    assert!(!listing.files[0].contains_key("dataset_metadata"));
    assert!(!listing.directories[0].contains_key("dataset_metadata"));
    assert!(listing
        .directory
        .as_ref()
        .unwrap()
        .get("dataset_metadata")
        .is_none());

    // When: it is requested explicitly
    let listing = fixture
        .browse(&format!(
            "dataset={dataset}&file_fields=pathname,dataset_metadata"
        ))
        .await;

    // Then
    assert_eq!(listing.files[0]["dataset_metadata"]["title"], "Alpha");
}

#[tokio::test]
async fn test_fileset_membership_queries() {
    init_test_logging();

    // Given
    let DatasetFixture {
        fixture,
        dataset,
        member,
        outsider,
    } = dataset_fixture().await;
    let store = fixture.store();

    // When
    let members = assert_ok!(store.member_ids(dataset).await);
    let among = assert_ok!(store.members_among(dataset, &[member, outsider]).await);

    // Then
    assert_eq!(members.len(), 2);
    assert!(members.contains(&member));
    assert_eq!(among, HashSet::from([member]));
    assert!(assert_ok!(store.is_member(dataset, member).await));
    assert!(!assert_ok!(store.is_member(dataset, outsider).await));
    assert!(assert_ok!(store.member_ids(Uuid::new_v4()).await).is_empty());
}

#[tokio::test]
async fn test_conflicting_dataset_flags_are_rejected() {
    init_test_logging();

    // Given
    let DatasetFixture {
        fixture, dataset, ..
    } = dataset_fixture().await;

    for query in [
        format!("dataset={dataset}&include_all=true&exclude_dataset=true"),
        "exclude_dataset=true".to_string(),
        "dataset=not-a-uuid".to_string(),
    ] {
        // When
        let result = fixture.engine.browse_url(&fixture.url(&query)).await;

        // Then
        assert!(result.unwrap_err().is_validation(), "{query}");
    }
}

#[tokio::test]
async fn test_aggregate_cache_serves_only_unpaginated_reads() {
    init_test_logging();

    // Given: an engine with a long-lived aggregate cache
    let store = MemoryFileStore::new();
    let storage = store.add_storage("ida", "project_x").await;
    let fixture = Fixture {
        engine: DirectoryEngine::new(store).with_cache(AggregateCache::new(Duration::from_secs(600))),
        storage,
    };
    fixture.add("/dir1/a.txt", 1, 1).await;

    // When: an unpaginated read fills the cache and a new directory appears afterwards
    let first = fixture.browse("pagination=false").await;
    fixture.add("/dir2/b.txt", 1, 2).await;
    let cached = fixture.browse("pagination=false").await;

    // Then: the cached groups are served
    assert_eq!(strings(&first.directories, "name"), vec!["dir1"]);
    assert_eq!(strings(&cached.directories, "name"), vec!["dir1"]);
    assert_eq!(fixture.engine.cache().unwrap().len().await, 1);

    // When: the caller bypasses the cache
    let bypassed = fixture.browse("pagination=false&cache=false").await;

    // Then: fresh groups are read
    assert_eq!(strings(&bypassed.directories, "name"), vec!["dir1", "dir2"]);

    // And: paginated reads never use the cache
    fixture.add("/dir3/c.txt", 1, 3).await;
    let paginated = fixture.browse("").await;
    assert_eq!(
        strings(&paginated.directories, "name"),
        vec!["dir1", "dir2", "dir3"]
    );
    assert_eq!(paginated.count(), Some(3));
}
