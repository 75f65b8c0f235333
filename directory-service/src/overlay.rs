//! Dataset-scoped metadata for the items of the current page only.

use std::collections::HashMap;
use tracing::debug;

use crate::aggregate::DirectoryGroup;
use crate::catalog::{DatasetId, DirectoryMetadata, FileId, FileMetadata, FileRecord, StorageId};
use crate::error::{BrowseError, BrowseResult};
use crate::fields::{DirectoryField, FieldSelection, FileField};
use crate::path::DirectoryPath;
use crate::store::{FilesetProvider, MetadataProvider};

/// Lookup maps for the page. A map is `None` when overlays were not requested;
/// a missing key means "no override".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataOverlays {
    pub files: Option<HashMap<FileId, FileMetadata>>,
    pub directories: Option<HashMap<String, DirectoryMetadata>>,
}

#[derive(Debug, Clone)]
pub struct OverlayRequest<'a> {
    pub dataset: Option<DatasetId>,
    pub exclude_dataset: bool,
    pub storage_id: StorageId,
    pub path: &'a DirectoryPath,
    pub directory_fields: &'a FieldSelection<DirectoryField>,
    pub file_fields: &'a FieldSelection<FileField>,
}

impl OverlayRequest<'_> {
    fn overlay_dataset(&self) -> Option<DatasetId> {
        self.dataset.filter(|_| !self.exclude_dataset)
    }

    pub fn wants_file_metadata(&self) -> bool {
        self.overlay_dataset().is_some() && self.file_fields.includes(FileField::DatasetMetadata)
    }

    pub fn wants_directory_metadata(&self) -> bool {
        self.overlay_dataset().is_some()
            && self.directory_fields.includes(DirectoryField::DatasetMetadata)
    }
}

pub async fn load_overlays<P>(
    provider: &P,
    request: &OverlayRequest<'_>,
    directories: &[DirectoryGroup],
    files: &[FileRecord],
) -> BrowseResult<MetadataOverlays>
where
    P: MetadataProvider + FilesetProvider,
{
    let Some(dataset) = request.overlay_dataset() else {
        return Ok(MetadataOverlays::default());
    };

    let file_overlays = async {
        if !request.wants_file_metadata() {
            return Ok::<_, BrowseError>(None);
        }
        let page_ids: Vec<FileId> = files.iter().map(|f| f.id).collect();
        if page_ids.is_empty() {
            return Ok(Some(HashMap::new()));
        }
        let members = provider.members_among(dataset, &page_ids).await?;
        let member_ids: Vec<FileId> = page_ids
            .into_iter()
            .filter(|id| members.contains(id))
            .collect();
        if member_ids.is_empty() {
            return Ok(Some(HashMap::new()));
        }
        provider
            .file_metadata(dataset, &member_ids)
            .await
            .map(Some)
    };

    let directory_overlays = async {
        if !request.wants_directory_metadata() {
            return Ok::<_, BrowseError>(None);
        }
        let pathnames: Vec<String> = std::iter::once(request.path.as_str().to_string())
            .chain(directories.iter().map(|d| d.pathname.clone()))
            .collect();
        provider
            .directory_metadata(dataset, request.storage_id, &pathnames)
            .await
            .map(Some)
    };

    let (files, directories) = futures::try_join!(file_overlays, directory_overlays)?;
    debug!(
        "Loaded overlays for dataset {}: {} file entries, {} directory entries",
        dataset,
        files.as_ref().map_or(0, HashMap::len),
        directories.as_ref().map_or(0, HashMap::len)
    );

    Ok(MetadataOverlays { files, directories })
}
