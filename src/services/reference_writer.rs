//! Reference writer: point CMS media entries at CDN-hosted renditions.
//!
//! No image bytes ever travel. The CMS needs a binary payload to create an
//! entry at all, so creation uploads a fixed 1x1 placeholder and patches the
//! reference fields over it straight away.

use super::{
    cms::{CmsApi, StrapiFile},
    folder_sync::ResolvedFolders,
    inventory::normalize_file,
};
use crate::{
    config::{AppConfig, CdnConfig},
    errors::{SyncError, SyncResult},
    models::{
        action::{ActionOutcome, FolderTarget, ReconciliationAction, ReferencePatch},
        asset::LogicalImage,
        media::{MediaFormat, Provider},
    },
};
use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use serde_json::json;
use std::{collections::BTreeMap, io};
use tracing::{error, info, warn};

/// Transparent 1x1 PNG.
const PLACEHOLDER_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

pub fn placeholder_image() -> SyncResult<Bytes> {
    STANDARD
        .decode(PLACEHOLDER_PNG)
        .map(Bytes::from)
        .map_err(|err| SyncError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))
}

/// Reference fields a CMS entry for `image` must carry. `None` for orphan
/// variant groups.
pub fn expected_reference(image: &LogicalImage, cdn: &CdnConfig) -> Option<ReferencePatch> {
    let original = image.original.as_ref()?;
    let formats: BTreeMap<String, MediaFormat> = image
        .variants
        .iter()
        .filter_map(|(variant, rendition)| {
            let bounds = variant.bounds()?;
            let (width, height) = fit_within(original.width, original.height, bounds);
            Some((
                variant.as_str().to_string(),
                MediaFormat {
                    url: cdn.transformation_url(original, *variant),
                    width,
                    height,
                    size_bytes: rendition.size_bytes,
                },
            ))
        })
        .collect();

    Some(ReferencePatch {
        url: original.url.clone(),
        formats,
        provider_metadata: json!({
            "public_id": original.public_id,
            "resource_type": "image",
            "version": original.version,
        }),
        width: original.width,
        height: original.height,
        size_bytes: original.size_bytes,
        ext: original.format.clone(),
        mime: mime_for(&original.format),
    })
}

/// Dimensions a `c_limit` transformation yields: scaled down to fit, never up.
fn fit_within(width: u32, height: u32, (max_w, max_h): (u32, u32)) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (max_w, max_h);
    }
    let scale = (max_w as f64 / width as f64)
        .min(max_h as f64 / height as f64)
        .min(1.0);
    (
        ((width as f64 * scale).round() as u32).max(1),
        ((height as f64 * scale).round() as u32).max(1),
    )
}

fn mime_for(format: &str) -> String {
    match format {
        "jpg" | "jpeg" => "image/jpeg".into(),
        "svg" => "image/svg+xml".into(),
        "" => "application/octet-stream".into(),
        other => format!("image/{}", other),
    }
}

pub struct ReferenceWriter<'a> {
    cms: &'a dyn CmsApi,
    cdn: &'a CdnConfig,
    cdn_provider: &'a str,
}

impl<'a> ReferenceWriter<'a> {
    pub fn new(cfg: &'a AppConfig, cms: &'a dyn CmsApi) -> Self {
        Self {
            cms,
            cdn: &cfg.cdn,
            cdn_provider: &cfg.cms.cdn_provider,
        }
    }

    /// Apply every reference action in order. Failures are per item, except
    /// fatal ones, which stop the batch and are returned.
    pub async fn apply(
        &self,
        actions: &[ReconciliationAction],
        folders: &ResolvedFolders,
    ) -> SyncResult<Vec<ActionOutcome>> {
        let mut outcomes = Vec::new();
        for action in actions {
            let result = match action {
                ReconciliationAction::CreateReference {
                    name,
                    folder,
                    reference,
                    ..
                } => self.create(name, folder, reference, folders).await,
                ReconciliationAction::UpdateReference {
                    entry_id, reference, ..
                } => self.update(*entry_id, reference).await,
                _ => continue,
            };
            let outcome = match result {
                Ok(Written::Patched) => {
                    info!("wrote reference for {}", action.target());
                    ActionOutcome::succeeded(action)
                }
                Ok(Written::AlreadyCurrent) => {
                    info!("{} already references the CDN, skipping", action.target());
                    ActionOutcome::skipped(action, "entry already references the CDN")
                }
                Err(err) if err.is_fatal() => {
                    error!("stopping reference writes at {}: {}", action.target(), err);
                    return Err(err);
                }
                Err(err) => {
                    error!("failed to write reference for {}: {}", action.target(), err);
                    ActionOutcome::failed(action, err.to_string())
                }
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn create(
        &self,
        name: &str,
        folder: &FolderTarget,
        reference: &ReferencePatch,
        folders: &ResolvedFolders,
    ) -> SyncResult<Written> {
        self.check_urls(name, reference)?;
        let folder_id = folders.resolve(folder)?;

        // A previous partial run may have left an entry behind.
        let existing = self
            .cms
            .find_files_by_name(name)
            .await?
            .into_iter()
            .filter(|f| f.folder.map(|r| r.id()) == folder_id)
            .min_by_key(|f| f.id);
        if let Some(file) = existing {
            if self.is_current(&file, reference) {
                return Ok(Written::AlreadyCurrent);
            }
            warn!(
                "entry {} `{}` already exists in the target folder, patching it instead",
                file.id, name
            );
            return self.patch(file.id, name, reference).await;
        }

        info!(
            "creating entry `{}` in folder {:?} from placeholder",
            name, folder_id
        );
        let created = self
            .cms
            .upload_placeholder(name, folder_id, placeholder_image()?)
            .await?;
        if let Err(err) = self.patch(created.id, name, reference).await {
            warn!(
                "patch of new entry {} `{}` failed, removing the placeholder",
                created.id, name
            );
            if let Err(cleanup) = self.cms.delete_file(created.id).await {
                error!(
                    "could not remove placeholder entry {} `{}`: {}; the next run will update it",
                    created.id, name, cleanup
                );
            }
            return Err(err);
        }
        Ok(Written::Patched)
    }

    async fn update(&self, entry_id: i64, reference: &ReferencePatch) -> SyncResult<Written> {
        let label = format!("entry {}", entry_id);
        self.check_urls(&label, reference)?;
        self.patch(entry_id, &label, reference).await
    }

    async fn patch(&self, id: i64, name: &str, reference: &ReferencePatch) -> SyncResult<Written> {
        let patched = match self.cms.patch_reference(id, reference).await {
            Ok(file) => file,
            Err(SyncError::NotFound(_)) => {
                return Err(SyncError::conflict(
                    format!("entry {} `{}`", id, name),
                    "entry no longer exists",
                ));
            }
            Err(err) => return Err(err),
        };
        if patched.url != reference.url {
            return Err(SyncError::conflict(
                format!("entry {} `{}`", id, name),
                format!("CMS kept url `{}` after the patch", patched.url),
            ));
        }
        Ok(Written::Patched)
    }

    fn is_current(&self, file: &StrapiFile, reference: &ReferencePatch) -> bool {
        let entry = normalize_file(file.clone(), self.cdn_provider);
        entry.provider == Provider::CdnReference
            && entry.url == reference.url
            && entry.formats.len() == reference.formats.len()
            && entry
                .formats
                .iter()
                .all(|(key, f)| reference.formats.get(key).is_some_and(|r| r.url == f.url))
    }

    /// Only CDN delivery URLs may ever be written onto an entry.
    fn check_urls(&self, name: &str, reference: &ReferencePatch) -> SyncResult<()> {
        match reference.urls().find(|url| !self.cdn.is_delivery_url(url)) {
            Some(url) => Err(SyncError::validation(
                name,
                format!("refusing to write non-CDN URL `{}`", url),
            )),
            None => Ok(()),
        }
    }
}

enum Written {
    Patched,
    AlreadyCurrent,
}
