use crate::catalog::{DatasetId, FileRecord, StorageId};
use crate::error::{BrowseError, BrowseResult};

/// How dataset file-set membership narrows the visible files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetFilter {
    /// No narrowing.
    All,
    /// Only files in the dataset's file-set.
    Members(DatasetId),
    /// Only files missing from the dataset's file-set.
    NonMembers(DatasetId),
}

impl DatasetFilter {
    pub fn dataset_id(&self) -> Option<DatasetId> {
        match self {
            DatasetFilter::All => None,
            DatasetFilter::Members(id) | DatasetFilter::NonMembers(id) => Some(*id),
        }
    }
}

/// Base predicate over the file collection: files of one storage scope that
/// are not soft-deleted, optionally narrowed by dataset membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileScope {
    pub storage_id: StorageId,
    pub dataset: DatasetFilter,
}

impl FileScope {
    pub fn new(storage_id: StorageId) -> Self {
        Self {
            storage_id,
            dataset: DatasetFilter::All,
        }
    }

    /// `is_member` answers file-set membership for the filtered dataset.
    pub fn admits(&self, file: &FileRecord, is_member: impl Fn(&FileRecord) -> bool) -> bool {
        if file.storage_id != self.storage_id || file.is_removed() {
            return false;
        }
        match self.dataset {
            DatasetFilter::All => true,
            DatasetFilter::Members(_) => is_member(file),
            DatasetFilter::NonMembers(_) => !is_member(file),
        }
    }
}

pub fn resolve_scope(
    storage_id: StorageId,
    dataset: Option<DatasetId>,
    include_all: bool,
    exclude_dataset: bool,
) -> BrowseResult<FileScope> {
    if include_all && exclude_dataset {
        return Err(BrowseError::validation(
            "exclude_dataset",
            "Fields include_all and exclude_dataset cannot be used together.",
        ));
    }

    let dataset = match dataset {
        Some(id) if exclude_dataset => DatasetFilter::NonMembers(id),
        Some(_) if include_all => DatasetFilter::All,
        Some(id) => DatasetFilter::Members(id),
        None if exclude_dataset => {
            return Err(BrowseError::validation(
                "exclude_dataset",
                "The dataset field is required when exclude_dataset is enabled.",
            ));
        }
        None => DatasetFilter::All,
    };

    Ok(FileScope {
        storage_id,
        dataset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn flags_select_the_dataset_filter() {
        let storage = Uuid::new_v4();
        let dataset = Uuid::new_v4();

        let scope = resolve_scope(storage, Some(dataset), false, false).unwrap();
        assert_eq!(scope.dataset, DatasetFilter::Members(dataset));

        let scope = resolve_scope(storage, Some(dataset), false, true).unwrap();
        assert_eq!(scope.dataset, DatasetFilter::NonMembers(dataset));

        let scope = resolve_scope(storage, Some(dataset), true, false).unwrap();
        assert_eq!(scope.dataset, DatasetFilter::All);

        let scope = resolve_scope(storage, None, false, false).unwrap();
        assert_eq!(scope, FileScope::new(storage));
    }

    #[test]
    fn conflicting_flags_fail() {
        let storage = Uuid::new_v4();
        let dataset = Uuid::new_v4();
        assert!(resolve_scope(storage, Some(dataset), true, true)
            .unwrap_err()
            .is_validation());
        assert!(resolve_scope(storage, None, false, true)
            .unwrap_err()
            .is_validation());
    }
}
