//! Destination folder provisioning.

use bridge_traits::storage::RemoteStore;
use core_runtime::FolderNames;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use crate::classifier::Category;
use crate::error::Result;

/// Category to remote folder id, built once per pass and read-only after.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationFolderSet {
    folders: HashMap<Category, String>,
}

impl DestinationFolderSet {
    /// Resolve or create one folder per uploadable category under `root_id`.
    ///
    /// # Errors
    ///
    /// Any lookup or creation failure aborts provisioning.
    #[instrument(skip(store, names), fields(root = %root_id))]
    pub async fn provision(
        store: &dyn RemoteStore,
        root_id: &str,
        names: &FolderNames,
    ) -> Result<Self> {
        let mut folders = HashMap::with_capacity(Category::UPLOADABLE.len());

        for category in Category::UPLOADABLE {
            let name = folder_name(names, category);
            let id = store.resolve_or_create_folder(root_id, name).await?;
            debug!(%category, folder = %name, folder_id = %id, "Destination folder ready");
            folders.insert(category, id);
        }

        info!(count = folders.len(), "Destination folders provisioned");
        Ok(Self { folders })
    }

    pub fn get(&self, category: Category) -> Option<&str> {
        self.folders.get(&category).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

/// Configured folder name for a category. `Unclassified` maps to the image
/// folder name but is never provisioned or uploaded.
fn folder_name(names: &FolderNames, category: Category) -> &str {
    match category {
        Category::Image | Category::Unclassified => &names.images,
        Category::Video => &names.videos,
        Category::DslrImage => &names.dslr_images,
        Category::GroupPhoto => &names.group_photos,
        Category::GeotaggedImage => &names.geotagged_images,
    }
}
