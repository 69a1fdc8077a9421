//! Inventory readers: page through both remote listings and normalize them
//! into the shared data model.
//!
//! Every page request goes through the run's [`RetryPolicy`]. Malformed
//! records are skipped and kept aside as [`InvalidItem`]s for the report.

use super::{
    cdn::{CdnApi, CdnResource},
    cms::{CmsApi, StrapiFile, StrapiFolder},
    retry::RetryPolicy,
};
use crate::{
    config::AppConfig,
    errors::SyncResult,
    models::{
        asset::{AssetRecord, Variant},
        folder::{Folder, FolderTree},
        media::{MediaEntry, MediaFormat, Provider},
        normalize_path, relative_to,
    },
};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info, warn};

/// A record skipped during normalization.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct InvalidItem {
    pub id: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default)]
pub struct CdnInventory {
    pub assets: Vec<AssetRecord>,
    /// Folder paths relative to the root, excluding the root itself.
    pub folders: BTreeSet<String>,
    pub invalid: Vec<InvalidItem>,
}

#[derive(Clone, Debug, Default)]
pub struct CmsInventory {
    pub media: Vec<MediaEntry>,
    pub folders: FolderTree,
}

pub struct InventoryReader<'a> {
    cdn: &'a dyn CdnApi,
    cms: &'a dyn CmsApi,
    cdn_provider: &'a str,
    page_size: u32,
    retry: &'a RetryPolicy,
}

impl<'a> InventoryReader<'a> {
    pub fn new(cfg: &'a AppConfig, cdn: &'a dyn CdnApi, cms: &'a dyn CmsApi) -> Self {
        Self {
            cdn,
            cms,
            cdn_provider: &cfg.cms.cdn_provider,
            page_size: cfg.page_size,
            retry: &cfg.retry,
        }
    }

    /// Every image and folder under `root_folder` on the CDN.
    pub async fn list_cdn_assets(&self, root_folder: &str) -> SyncResult<CdnInventory> {
        let root = normalize_path(root_folder);
        let prefix = if root.is_empty() {
            String::new()
        } else {
            format!("{}/", root)
        };

        let mut inventory = CdnInventory::default();
        let mut cursor: Option<String> = None;
        let mut page_no = 0;
        loop {
            page_no += 1;
            let label = format!("CDN resources page {}", page_no);
            let page = self
                .retry
                .run(&label, || {
                    self.cdn
                        .list_resources(&prefix, cursor.as_deref(), self.page_size)
                })
                .await?;
            debug!("{}: {} resources", label, page.resources.len());

            for resource in page.resources {
                match normalize_resource(&root, resource) {
                    Ok(Some(asset)) => {
                        if !asset.folder.is_empty() {
                            add_with_ancestors(&mut inventory.folders, &asset.folder);
                        }
                        inventory.assets.push(asset);
                    }
                    Ok(None) => {}
                    Err(invalid) => {
                        warn!("skipping CDN asset `{}`: {}", invalid.id, invalid.reason);
                        inventory.invalid.push(invalid);
                    }
                }
            }

            match page.next_cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        for folder in self.list_cdn_folders(&root).await? {
            add_with_ancestors(&mut inventory.folders, &folder);
        }

        info!(
            "CDN inventory: {} assets in {} folders under `{}` ({} invalid)",
            inventory.assets.len(),
            inventory.folders.len(),
            root,
            inventory.invalid.len()
        );
        Ok(inventory)
    }

    /// Breadth-first walk of the CDN folder tree below `root`, as relative paths.
    async fn list_cdn_folders(&self, root: &str) -> SyncResult<Vec<String>> {
        let mut found = Vec::new();
        let mut queue = VecDeque::from([root.to_string()]);
        while let Some(path) = queue.pop_front() {
            let mut cursor: Option<String> = None;
            loop {
                let label = format!("CDN subfolders of `{}`", path);
                let page = self
                    .retry
                    .run(&label, || {
                        self.cdn
                            .list_subfolders(&path, cursor.as_deref(), self.page_size)
                    })
                    .await?;
                for folder in page.folders {
                    let full = normalize_path(&folder.path);
                    match relative_to(root, &full) {
                        Some(relative) if !relative.is_empty() => {
                            found.push(relative);
                            queue.push_back(full);
                        }
                        _ => debug!("ignoring CDN folder `{}` outside `{}`", full, root),
                    }
                }
                match page.next_cursor.filter(|c| !c.is_empty()) {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
        }
        Ok(found)
    }

    /// CMS media entries, optionally only those directly inside `folder_id`.
    pub async fn list_cms_media(&self, folder_id: Option<i64>) -> SyncResult<Vec<MediaEntry>> {
        let limit = self.page_size as usize;
        let mut start = 0;
        let mut media = Vec::new();
        loop {
            let label = format!("CMS files {}..{}", start, start + limit);
            let page = self
                .retry
                .run(&label, || self.cms.list_files(start, limit))
                .await?;
            let fetched = page.len();
            debug!("{}: {} entries", label, fetched);
            media.extend(
                page.into_iter()
                    .map(|file| normalize_file(file, self.cdn_provider)),
            );
            if fetched < limit {
                break;
            }
            start += fetched;
        }

        if let Some(id) = folder_id {
            media.retain(|entry| entry.folder_id == Some(id));
        }
        info!("CMS inventory: {} media entries", media.len());
        Ok(media)
    }

    /// The CMS folder tree. Fails on a parent cycle.
    pub async fn list_cms_folders(&self) -> SyncResult<FolderTree> {
        let folders = self
            .retry
            .run("CMS folders", || self.cms.list_folders())
            .await?;
        let tree = FolderTree::build(folders.into_iter().map(normalize_folder).collect())?;
        info!("CMS inventory: {} folders", tree.len());
        Ok(tree)
    }

    pub async fn list_cms(&self) -> SyncResult<CmsInventory> {
        let folders = self.list_cms_folders().await?;
        let media = self.list_cms_media(None).await?;
        Ok(CmsInventory { media, folders })
    }
}

fn add_with_ancestors(folders: &mut BTreeSet<String>, path: &str) {
    let mut current = path;
    while !current.is_empty() && folders.insert(current.to_string()) {
        current = crate::models::parent_path(current);
    }
}

/// Normalize one CDN listing record. `Ok(None)` means "outside the root".
pub fn normalize_resource(
    root: &str,
    resource: CdnResource,
) -> Result<Option<AssetRecord>, InvalidItem> {
    let public_id = normalize_path(&resource.public_id);
    let invalid = |reason: &str| InvalidItem {
        id: resource.public_id.clone(),
        reason: reason.to_string(),
    };

    let (id_folder, file) = match public_id.rsplit_once('/') {
        Some((folder, file)) => (folder.to_string(), file.to_string()),
        None => (String::new(), public_id.clone()),
    };
    if file.is_empty() {
        return Err(invalid("public id has no basename"));
    }

    let folder_raw = resource
        .asset_folder
        .as_deref()
        .or(resource.folder.as_deref())
        .filter(|f| !f.trim().is_empty())
        .map(normalize_path)
        .unwrap_or(id_folder);
    let Some(folder) = relative_to(root, &folder_raw) else {
        debug!("ignoring CDN asset `{}` outside `{}`", public_id, root);
        return Ok(None);
    };

    let (variant, basename) = Variant::split_basename(&file);
    if basename.is_empty() {
        return Err(invalid("variant prefix with no basename"));
    }
    if resource.secure_url.is_empty() {
        return Err(invalid("listing carries no delivery URL"));
    }

    Ok(Some(AssetRecord {
        public_id,
        folder,
        basename: basename.to_string(),
        variant,
        format: resource.format.to_ascii_lowercase(),
        url: resource.secure_url,
        width: resource.width,
        height: resource.height,
        size_bytes: resource.bytes,
        version: if resource.version == 0 {
            String::new()
        } else {
            resource.version.to_string()
        },
    }))
}

pub fn normalize_file(file: StrapiFile, cdn_provider: &str) -> MediaEntry {
    let provider = if file.provider == cdn_provider {
        Provider::CdnReference
    } else {
        Provider::Native
    };
    let formats = file
        .formats
        .unwrap_or_default()
        .into_iter()
        .map(|(key, format)| {
            (
                key,
                MediaFormat {
                    url: format.url,
                    width: format.width.unwrap_or_default(),
                    height: format.height.unwrap_or_default(),
                    size_bytes: format
                        .size
                        .map(|kb| (kb * 1024.0).round().max(0.0) as u64)
                        .unwrap_or_default(),
                },
            )
        })
        .collect::<BTreeMap<_, _>>();

    MediaEntry {
        id: file.id,
        name: file.name,
        folder_id: file.folder.map(|f| f.id()),
        url: file.url,
        formats,
        provider,
        provider_metadata: file.provider_metadata.unwrap_or(Value::Null),
    }
}

pub fn normalize_folder(folder: StrapiFolder) -> Folder {
    Folder {
        id: folder.id,
        name: folder.name.trim().to_string(),
        parent_id: folder.parent.map(|p| p.id()),
    }
}
