//! Virtual directories computed by grouping file rows on the path segment
//! directly below the browsed path.
//!
//! Nothing here is persisted: groups are a pure function of the scoped file
//! rows and the target path. The group named `""` holds the files stored
//! directly in the target path; it counts towards the parent aggregate but is
//! never listed as a subdirectory.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::catalog::FileRecord;
use crate::fields::{DirectoryOrderField, SortKey};
use crate::path::DirectoryPath;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryGroup {
    pub name: String,
    pub pathname: String,
    pub file_count: u64,
    pub published_file_count: u64,
    pub size: i64,
    /// Earliest file modification, used as a creation proxy.
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl DirectoryGroup {
    pub fn is_current_directory(&self) -> bool {
        self.name.is_empty()
    }

    fn start(path: &DirectoryPath, name: &str, file: &FileRecord) -> Self {
        DirectoryGroup {
            name: name.to_string(),
            pathname: if name.is_empty() {
                path.as_str().to_string()
            } else {
                path.child(name).as_str().to_string()
            },
            file_count: 0,
            published_file_count: 0,
            size: 0,
            created: file.modified,
            modified: file.modified,
        }
    }

    fn add(&mut self, file: &FileRecord) {
        self.file_count += 1;
        if file.is_published() {
            self.published_file_count += 1;
        }
        self.size += file.size;
        self.created = self.created.min(file.modified);
        self.modified = self.modified.max(file.modified);
    }
}

/// Totals for the browsed directory itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParentAggregate {
    pub name: String,
    pub pathname: String,
    pub file_count: u64,
    pub published_file_count: u64,
    pub size: i64,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

/// Groups already-scoped files under `path` by their next path segment.
///
/// Files outside `path` are ignored. Output is ordered by name.
pub fn group_files<'a>(
    path: &DirectoryPath,
    files: impl IntoIterator<Item = &'a FileRecord>,
) -> Vec<DirectoryGroup> {
    let mut groups: BTreeMap<&str, DirectoryGroup> = BTreeMap::new();
    for file in files {
        let Some(name) = path.child_segment(&file.directory_path) else {
            continue;
        };
        groups
            .entry(name)
            .or_insert_with(|| DirectoryGroup::start(path, name, file))
            .add(file);
    }
    groups.into_values().collect()
}

/// Sums the unfiltered groups, including the current-directory group.
pub fn parent_aggregate(path: &DirectoryPath, groups: &[DirectoryGroup]) -> ParentAggregate {
    ParentAggregate {
        name: path.name().to_string(),
        pathname: path.as_str().to_string(),
        file_count: groups.iter().map(|g| g.file_count).sum(),
        published_file_count: groups.iter().map(|g| g.published_file_count).sum(),
        size: groups.iter().map(|g| g.size).sum(),
        created: groups.iter().map(|g| g.created).min(),
        modified: groups.iter().map(|g| g.modified).max(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryFilter<'a> {
    /// Case-insensitive substring of the directory name.
    pub name: Option<&'a str>,
    pub published: Option<bool>,
}

impl DirectoryFilter<'_> {
    pub fn matches(&self, group: &DirectoryGroup) -> bool {
        if let Some(needle) = self.name {
            if !contains_ignore_case(&group.name, needle) {
                return false;
            }
        }
        match self.published {
            Some(true) => group.published_file_count > 0,
            Some(false) => group.file_count > group.published_file_count,
            None => true,
        }
    }
}

/// Listable subdirectories: drops the current-directory group, applies the
/// display filters and sorts with `name` ascending as the final tie-break.
pub fn matching_subdirectories(
    groups: &[DirectoryGroup],
    filter: &DirectoryFilter<'_>,
    ordering: &[SortKey<DirectoryOrderField>],
) -> Vec<DirectoryGroup> {
    let mut subdirectories: Vec<DirectoryGroup> = groups
        .iter()
        .filter(|group| !group.is_current_directory() && filter.matches(group))
        .cloned()
        .collect();
    subdirectories.sort_by(|a, b| compare_groups(a, b, ordering));
    subdirectories
}

pub fn compare_groups(
    a: &DirectoryGroup,
    b: &DirectoryGroup,
    ordering: &[SortKey<DirectoryOrderField>],
) -> Ordering {
    ordering
        .iter()
        .map(|key| {
            let ordering = match key.field {
                DirectoryOrderField::Name => a.name.cmp(&b.name),
                DirectoryOrderField::FileCount => a.file_count.cmp(&b.file_count),
                DirectoryOrderField::PublishedFileCount => {
                    a.published_file_count.cmp(&b.published_file_count)
                }
                DirectoryOrderField::Size => a.size.cmp(&b.size),
                DirectoryOrderField::Created => a.created.cmp(&b.created),
                DirectoryOrderField::Modified => a.modified.cmp(&b.modified),
            };
            key.direction.apply(ordering)
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| a.name.cmp(&b.name))
}

/// ASCII case folding only, the same as `ILIKE` under the `"C"` collation.
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn file(directory_path: &str, size: i64, day: u32, published: bool) -> FileRecord {
        let modified = Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap();
        FileRecord {
            id: Uuid::new_v4(),
            storage_id: Uuid::nil(),
            storage_identifier: None,
            filename: "f".to_string(),
            directory_path: directory_path.to_string(),
            size,
            checksum: None,
            modified,
            published: published.then_some(modified),
            removed: None,
            user: None,
        }
    }

    fn sample() -> Vec<FileRecord> {
        vec![
            file("/data/", 1, 1, false),
            file("/data/a/", 10, 2, true),
            file("/data/a/deep/", 20, 5, false),
            file("/data/b/", 100, 3, true),
            file("/other/", 1000, 4, true),
        ]
    }

    #[test]
    fn groups_by_next_segment() {
        let path = DirectoryPath::parse("/data/").unwrap();
        let groups = group_files(&path, &sample());

        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["", "a", "b"]);

        let a = &groups[1];
        assert_eq!(a.pathname, "/data/a/");
        assert_eq!(a.file_count, 2);
        assert_eq!(a.published_file_count, 1);
        assert_eq!(a.size, 30);
        assert_eq!(a.created, Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap());
        assert_eq!(a.modified, Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap());
        assert_eq!(groups[0].pathname, "/data/");
    }

    #[test]
    fn parent_sums_every_group() {
        let path = DirectoryPath::parse("/data/").unwrap();
        let groups = group_files(&path, &sample());
        let parent = parent_aggregate(&path, &groups);

        assert_eq!(parent.name, "data");
        assert_eq!(parent.file_count, 4);
        assert_eq!(parent.published_file_count, 2);
        assert_eq!(parent.size, 131);
        assert_eq!(parent.created, Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn empty_directory_has_no_dates() {
        let parent = parent_aggregate(&DirectoryPath::root(), &[]);
        assert_eq!(parent.file_count, 0);
        assert_eq!(parent.created, None);
        assert_eq!(parent.modified, None);
    }

    #[test]
    fn subdirectories_drop_current_directory_and_filter() {
        let path = DirectoryPath::parse("/data/").unwrap();
        let groups = group_files(&path, &sample());

        let all = matching_subdirectories(&groups, &DirectoryFilter::default(), &[]);
        assert_eq!(all.len(), 2);

        let unpublished = DirectoryFilter {
            name: None,
            published: Some(false),
        };
        let names: Vec<String> = matching_subdirectories(&groups, &unpublished, &[])
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["a"]);

        let by_name = DirectoryFilter {
            name: Some("B"),
            published: None,
        };
        assert_eq!(matching_subdirectories(&groups, &by_name, &[])[0].name, "b");
    }

    #[test]
    fn ordering_uses_name_as_tie_break() {
        let path = DirectoryPath::parse("/data/").unwrap();
        let mut files = sample();
        files.push(file("/data/c/", 30, 1, false));
        let groups = group_files(&path, &files);

        let ordered = matching_subdirectories(
            &groups,
            &DirectoryFilter::default(),
            &[SortKey::desc(DirectoryOrderField::Size)],
        );
        let names: Vec<&str> = ordered.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn name_matching_folds_ascii_case_only() {
        assert!(contains_ignore_case("Data_2024", "data"));
        assert!(contains_ignore_case("äpfel.txt", "PFEL.TXT"));
        assert!(!contains_ignore_case("Äpfel", "äpf"));
    }
}
