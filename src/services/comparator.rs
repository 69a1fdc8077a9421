//! Inventory comparator: diff the normalized CDN and CMS inventories into a
//! classified list of [`ReconciliationAction`]s.
//!
//! The comparator is pure. It never calls a remote API, so the plan shown by
//! a preview is exactly the plan an execute pass consumes.

use super::{
    classify::{Classification, ClassifyContext, LeftoverClassifier},
    inventory::{CdnInventory, CmsInventory, InvalidItem},
    reference_writer::expected_reference,
};
use crate::{
    config::CdnConfig,
    errors::{SyncError, SyncResult},
    models::{
        action::{ActionKind, FolderTarget, ReconciliationAction, ReferencePatch},
        asset::{LogicalImage, Variant, group_images},
        depth,
        media::{MediaEntry, Provider, strip_extension},
        normalize_path, parent_path, relative_to, within,
    },
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Portion of the inventories a run may touch.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Scope {
    All,
    Folder { path: String },
    Asset { folder: String, basename: String },
}

impl Scope {
    /// Resolve a user-supplied target against the live CDN inventory:
    /// first as a folder, then as an asset id or basename.
    pub fn resolve(target: Option<&str>, root: &str, cdn: &CdnInventory) -> SyncResult<Self> {
        let Some(raw) = target.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(Scope::All);
        };
        let normalized = normalize_path(raw);
        let relative = relative_to(root, &normalized).unwrap_or_else(|| normalized.clone());

        if relative.is_empty() {
            return Ok(Scope::All);
        }
        if cdn.folders.contains(&relative) {
            return Ok(Scope::Folder { path: relative });
        }

        let (folder_part, file_part) = match relative.rsplit_once('/') {
            Some((folder, file)) => (Some(folder), file),
            None => (None, relative.as_str()),
        };
        let (_, basename) = Variant::split_basename(strip_extension(file_part));
        let candidates: BTreeSet<(&str, &str)> = cdn
            .assets
            .iter()
            .filter(|a| a.basename == basename)
            .filter(|a| folder_part.is_none_or(|f| a.folder == f))
            .map(|a| (a.folder.as_str(), a.basename.as_str()))
            .collect();

        match candidates.len() {
            0 => Err(SyncError::UnknownScope(raw.to_string())),
            1 => {
                let (folder, basename) = candidates.into_iter().next().unwrap_or_default();
                Ok(Scope::Asset {
                    folder: folder.to_string(),
                    basename: basename.to_string(),
                })
            }
            n => Err(SyncError::validation(
                raw,
                format!("matches {} images in different folders; give the folder too", n),
            )),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Scope::All => "all folders".into(),
            Scope::Folder { path } => format!("folder `{}`", path),
            Scope::Asset { folder, basename } if folder.is_empty() => {
                format!("asset `{}`", basename)
            }
            Scope::Asset { folder, basename } => format!("asset `{}/{}`", folder, basename),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Scope::All)
    }

    /// Folders whose contents belong to the scope.
    pub fn covers_folder(&self, path: &str) -> bool {
        match self {
            Scope::All => true,
            Scope::Folder { path: scope } => within(scope, path),
            Scope::Asset { folder, .. } => folder == path,
        }
    }

    /// Folders that may be created: the covered ones plus the ancestors
    /// needed to reach them.
    fn may_create_folder(&self, path: &str) -> bool {
        match self {
            Scope::All => true,
            Scope::Folder { path: scope } => within(scope, path) || within(path, scope),
            Scope::Asset { folder, .. } => within(path, folder),
        }
    }

    fn covers_image(&self, image: &LogicalImage) -> bool {
        match self {
            Scope::Asset { folder, basename } => {
                &image.folder == folder && &image.basename == basename
            }
            other => other.covers_folder(&image.folder),
        }
    }

    /// Deletions only ever happen in folder-level scopes.
    fn covers_cleanup(&self, entry_path: Option<&str>) -> bool {
        match (self, entry_path) {
            (Scope::All, _) => true,
            (Scope::Folder { path: scope }, Some(path)) => within(scope, path),
            _ => false,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct OrphanVariant {
    pub folder: String,
    pub basename: String,
    pub variants: Vec<Variant>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct AmbiguousEntry {
    pub entry_id: i64,
    pub name: String,
    pub folder_path: String,
    pub reason: String,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FolderStatus {
    InSync,
    NeedsCreation,
    Mismatch,
    CmsOnly,
}

impl FolderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FolderStatus::InSync => "IN_SYNC",
            FolderStatus::NeedsCreation => "NEEDS_CREATION",
            FolderStatus::Mismatch => "MISMATCH",
            FolderStatus::CmsOnly => "CMS_ONLY",
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FolderBreakdown {
    pub path: String,
    pub cdn_count: usize,
    pub cms_count: usize,
    pub status: FolderStatus,
}

/// Comparator output for one run.
#[derive(Serialize, Clone, Debug)]
pub struct Plan {
    pub scope: Scope,
    /// `CreateFolder` actions first, parents before children.
    pub actions: Vec<ReconciliationAction>,
    pub orphans: Vec<OrphanVariant>,
    /// Images whose CMS entry already matches the CDN.
    pub noops: Vec<String>,
    pub ambiguous: Vec<AmbiguousEntry>,
    pub invalid: Vec<InvalidItem>,
    pub folders: Vec<FolderBreakdown>,
}

impl Plan {
    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind() == kind).count()
    }

    /// Actions of the given kinds, in plan order.
    pub fn select(&self, kinds: &[ActionKind]) -> Vec<ReconciliationAction> {
        self.actions
            .iter()
            .filter(|a| kinds.contains(&a.kind()))
            .cloned()
            .collect()
    }
}

pub struct Comparator<'a> {
    cdn: &'a CdnConfig,
    classifier: &'a dyn LeftoverClassifier,
}

impl<'a> Comparator<'a> {
    pub fn new(cdn: &'a CdnConfig, classifier: &'a dyn LeftoverClassifier) -> Self {
        Self { cdn, classifier }
    }

    pub fn compare(&self, cdn: &CdnInventory, cms: &CmsInventory, scope: &Scope) -> Plan {
        let images = group_images(&cdn.assets);
        let tree = &cms.folders;

        let mut plan = Plan {
            scope: scope.clone(),
            actions: Vec::new(),
            orphans: Vec::new(),
            noops: Vec::new(),
            ambiguous: Vec::new(),
            invalid: cdn.invalid.clone(),
            folders: Vec::new(),
        };

        // Folders, shallowest first so parents exist before children.
        let mut missing: Vec<&String> = cdn
            .folders
            .iter()
            .filter(|path| scope.may_create_folder(path) && tree.find(path).is_none())
            .collect();
        missing.sort_by(|a, b| depth(a).cmp(&depth(b)).then_with(|| a.cmp(b)));
        for path in missing {
            let parent = parent_path(path);
            let name = path.rsplit('/').next().unwrap_or(path).to_string();
            plan.actions.push(ReconciliationAction::CreateFolder {
                path: path.clone(),
                name,
                parent: folder_target(tree.find(parent), parent),
            });
        }

        // Index CMS entries by (folder, basename).
        let mut by_location: BTreeMap<(Option<i64>, &str), Vec<&MediaEntry>> = BTreeMap::new();
        for entry in &cms.media {
            by_location
                .entry((entry.folder_id, entry.basename()))
                .or_default()
                .push(entry);
        }

        let mut references = Vec::new();
        for image in images.values().filter(|image| scope.covers_image(image)) {
            if !image.is_complete() {
                debug!("orphan variant group `{}`", image.label());
                plan.orphans.push(OrphanVariant {
                    folder: image.folder.clone(),
                    basename: image.basename.clone(),
                    variants: image.variants.keys().copied().collect(),
                });
                continue;
            }
            let Some((original, expected)) = image
                .original
                .as_ref()
                .zip(expected_reference(image, self.cdn))
            else {
                continue;
            };

            let target = folder_target(tree.find(&image.folder), &image.folder);
            // A pending folder cannot hold any entry yet.
            let folder_id = match &target {
                FolderTarget::Root => Some(None),
                FolderTarget::Existing { id, .. } => Some(Some(*id)),
                FolderTarget::Pending { .. } => None,
            };
            let matched = folder_id.and_then(|id| {
                by_location
                    .get(&(id, image.basename.as_str()))
                    .and_then(|entries| preferred_entry(entries))
            });
            match matched {
                None => references.push(ReconciliationAction::CreateReference {
                    asset: original.clone(),
                    name: original.file_name(),
                    folder: target,
                    reference: expected,
                }),
                Some(entry) if self.needs_update(entry, &expected) => {
                    references.push(ReconciliationAction::UpdateReference {
                        entry_id: entry.id,
                        name: entry.name.clone(),
                        folder_path: image.folder.clone(),
                        reference: expected,
                    })
                }
                Some(_) => plan.noops.push(image.label()),
            }
        }

        // Leftovers. Any CDN group counts as a corresponding asset.
        let cdn_basenames: BTreeSet<String> = images.keys().map(|(_, b)| b.clone()).collect();
        let ctx = ClassifyContext {
            cdn_basenames: &cdn_basenames,
        };
        let mut deletions = Vec::new();
        for entry in &cms.media {
            let entry_path = tree.path_of_entry(entry.folder_id);
            if !scope.covers_cleanup(entry_path) {
                continue;
            }
            let folder_path = entry_path.unwrap_or("?").to_string();
            match self.classifier.classify(entry, &ctx) {
                Classification::Keep => {}
                Classification::Leftover => deletions.push(ReconciliationAction::DeleteEntry {
                    entry_id: entry.id,
                    name: entry.name.clone(),
                    folder_path,
                }),
                Classification::Ambiguous(reason) => plan.ambiguous.push(AmbiguousEntry {
                    entry_id: entry.id,
                    name: entry.name.clone(),
                    folder_path,
                    reason,
                }),
            }
        }

        references.sort_by_key(|a| (a.kind(), a.target()));
        deletions.sort_by_key(|a| a.target());
        plan.actions.extend(references);
        plan.actions.extend(deletions);
        plan.folders = folder_breakdown(&images, cdn, cms, scope);

        info!(
            "compared {}: {} createFolder, {} createReference, {} updateReference, {} deleteEntry, {} orphan, {} noop",
            scope.label(),
            plan.count(ActionKind::CreateFolder),
            plan.count(ActionKind::CreateReference),
            plan.count(ActionKind::UpdateReference),
            plan.count(ActionKind::DeleteEntry),
            plan.orphans.len(),
            plan.noops.len()
        );
        plan
    }

    /// An entry is current only when it is a CDN reference whose URLs are the
    /// ones the CDN serves today.
    pub fn needs_update(&self, entry: &MediaEntry, expected: &ReferencePatch) -> bool {
        entry.provider != Provider::CdnReference
            || entry.urls().any(|url| !self.cdn.is_delivery_url(url))
            || entry.url != expected.url
            || !entry.formats.keys().eq(expected.formats.keys())
            || entry
                .formats
                .iter()
                .zip(expected.formats.values())
                .any(|((_, have), want)| have.url != want.url)
    }
}

fn folder_target(id: Option<i64>, path: &str) -> FolderTarget {
    match (id, path.is_empty()) {
        (_, true) => FolderTarget::Root,
        (Some(id), false) => FolderTarget::Existing {
            id,
            path: path.to_string(),
        },
        (None, false) => FolderTarget::Pending {
            path: path.to_string(),
        },
    }
}

/// Prefer an existing CDN reference, then the oldest entry.
fn preferred_entry<'e>(entries: &[&'e MediaEntry]) -> Option<&'e MediaEntry> {
    entries
        .iter()
        .copied()
        .min_by_key(|e| (e.provider != Provider::CdnReference, e.id))
}

fn folder_breakdown(
    images: &BTreeMap<(String, String), LogicalImage>,
    cdn: &CdnInventory,
    cms: &CmsInventory,
    scope: &Scope,
) -> Vec<FolderBreakdown> {
    let mut cdn_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for image in images.values().filter(|i| i.is_complete()) {
        *cdn_counts.entry(image.folder.as_str()).or_default() += 1;
    }
    let mut cms_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in &cms.media {
        if let Some(path) = cms.folders.path_of_entry(entry.folder_id) {
            *cms_counts.entry(path).or_default() += 1;
        }
    }

    let mut paths: BTreeSet<&str> = cdn.folders.iter().map(String::as_str).collect();
    paths.extend(cdn_counts.keys().copied());
    paths.extend(cms.folders.paths().map(|(path, _)| path));
    if cms_counts.contains_key("") {
        paths.insert("");
    }

    paths
        .into_iter()
        .filter(|path| scope.covers_folder(path))
        .map(|path| {
            let on_cdn = path.is_empty() || cdn.folders.contains(path) || cdn_counts.contains_key(path);
            let in_cms = path.is_empty() || cms.folders.find(path).is_some();
            let cdn_count = cdn_counts.get(path).copied().unwrap_or_default();
            let cms_count = cms_counts.get(path).copied().unwrap_or_default();
            let status = match (on_cdn, in_cms) {
                (true, false) => FolderStatus::NeedsCreation,
                (false, true) => FolderStatus::CmsOnly,
                _ if cdn_count != cms_count => FolderStatus::Mismatch,
                _ => FolderStatus::InSync,
            };
            FolderBreakdown {
                path: path.to_string(),
                cdn_count,
                cms_count,
                status,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::test_config,
        models::{
            asset::{AssetRecord, sample_asset},
            folder::{Folder, FolderTree},
            media::MediaFormat,
        },
        services::classify::StructuralClassifier,
    };
    use serde_json::Value;

    fn cdn_inventory(assets: Vec<AssetRecord>) -> CdnInventory {
        let folders = assets
            .iter()
            .filter(|a| !a.folder.is_empty())
            .map(|a| a.folder.clone())
            .collect();
        CdnInventory {
            assets,
            folders,
            invalid: Vec::new(),
        }
    }

    fn agricola_assets() -> Vec<AssetRecord> {
        vec![
            sample_asset("agricola", "agricola_001", Variant::Original),
            sample_asset("agricola", "thumbnail_agricola_001", Variant::Thumbnail),
            sample_asset("agricola", "small_agricola_001", Variant::Small),
            sample_asset("agricola", "medium_agricola_001", Variant::Medium),
            sample_asset("agricola", "large_agricola_001", Variant::Large),
        ]
    }

    fn entry(id: i64, name: &str, folder_id: Option<i64>, provider: Provider) -> MediaEntry {
        MediaEntry {
            id,
            name: name.into(),
            folder_id,
            url: format!("/uploads/{}", name),
            formats: BTreeMap::new(),
            provider,
            provider_metadata: Value::Null,
        }
    }

    fn reference_entry(id: i64, folder_id: Option<i64>, patch: &ReferencePatch) -> MediaEntry {
        MediaEntry {
            id,
            name: "agricola_001.jpg".into(),
            folder_id,
            url: patch.url.clone(),
            formats: patch.formats.clone(),
            provider: Provider::CdnReference,
            provider_metadata: patch.provider_metadata.clone(),
        }
    }

    fn tree(folders: Vec<Folder>) -> FolderTree {
        FolderTree::build(folders).unwrap()
    }

    fn agricola_folder() -> Folder {
        Folder {
            id: 10,
            name: "agricola".into(),
            parent_id: None,
        }
    }

    #[test]
    fn missing_folder_and_reference_are_planned() {
        let cfg = test_config();
        let comparator = Comparator::new(&cfg.cdn, &StructuralClassifier);
        let plan = comparator.compare(
            &cdn_inventory(agricola_assets()),
            &CmsInventory::default(),
            &Scope::All,
        );

        assert_eq!(plan.actions.len(), 2);
        assert_eq!(plan.actions[0].kind(), ActionKind::CreateFolder);
        let ReconciliationAction::CreateReference {
            name,
            folder,
            reference,
            ..
        } = &plan.actions[1]
        else {
            panic!("expected createReference, got {:?}", plan.actions[1]);
        };
        assert_eq!(name, "agricola_001.jpg");
        assert_eq!(
            folder,
            &FolderTarget::Pending {
                path: "agricola".into()
            }
        );
        assert_eq!(reference.formats.len(), 4);
        assert!(reference.urls().all(|u| cfg.cdn.is_delivery_url(u)));

        assert_eq!(plan.folders.len(), 1);
        assert_eq!(plan.folders[0].status, FolderStatus::NeedsCreation);
        assert_eq!(plan.folders[0].cdn_count, 1);
    }

    #[test]
    fn matching_reference_is_a_noop() {
        let cfg = test_config();
        let comparator = Comparator::new(&cfg.cdn, &StructuralClassifier);
        let cdn = cdn_inventory(agricola_assets());
        let images = group_images(&cdn.assets);
        let expected = expected_reference(images.values().next().unwrap(), &cfg.cdn).unwrap();
        let cms = CmsInventory {
            media: vec![reference_entry(1, Some(10), &expected)],
            folders: tree(vec![agricola_folder()]),
        };

        let plan = comparator.compare(&cdn, &cms, &Scope::All);
        assert!(plan.actions.is_empty(), "{:?}", plan.actions);
        assert_eq!(plan.noops, vec!["agricola/agricola_001".to_string()]);
        assert_eq!(plan.folders[0].status, FolderStatus::InSync);
    }

    #[test]
    fn stale_or_local_urls_need_update() {
        let cfg = test_config();
        let comparator = Comparator::new(&cfg.cdn, &StructuralClassifier);
        let cdn = cdn_inventory(agricola_assets());
        let images = group_images(&cdn.assets);
        let expected = expected_reference(images.values().next().unwrap(), &cfg.cdn).unwrap();

        let mut stale = reference_entry(1, Some(10), &expected);
        stale.formats.insert(
            "thumbnail".into(),
            MediaFormat {
                url: "https://cms.example.test/uploads/thumbnail_agricola_001.jpg".into(),
                width: 1,
                height: 1,
                size_bytes: 1,
            },
        );
        assert!(comparator.needs_update(&stale, &expected));

        let mut missing_format = reference_entry(1, Some(10), &expected);
        missing_format.formats.remove("large");
        assert!(comparator.needs_update(&missing_format, &expected));

        let native = entry(2, "agricola_001.jpg", Some(10), Provider::Native);
        let cms = CmsInventory {
            media: vec![native],
            folders: tree(vec![agricola_folder()]),
        };
        let plan = comparator.compare(&cdn, &cms, &Scope::All);
        assert_eq!(plan.actions.len(), 1);
        assert!(matches!(
            plan.actions[0],
            ReconciliationAction::UpdateReference { entry_id: 2, .. }
        ));
    }

    #[test]
    fn orphan_variants_produce_no_reference() {
        let cfg = test_config();
        let comparator = Comparator::new(&cfg.cdn, &StructuralClassifier);
        let cdn = cdn_inventory(vec![sample_asset("x", "thumbnail_x", Variant::Thumbnail)]);
        let cms = CmsInventory {
            media: Vec::new(),
            folders: tree(vec![Folder {
                id: 1,
                name: "x".into(),
                parent_id: None,
            }]),
        };

        let plan = comparator.compare(&cdn, &cms, &Scope::All);
        assert_eq!(plan.count(ActionKind::CreateReference), 0);
        assert_eq!(
            plan.orphans,
            vec![OrphanVariant {
                folder: "x".into(),
                basename: "x".into(),
                variants: vec![Variant::Thumbnail],
            }]
        );
    }

    #[test]
    fn native_entry_beside_orphan_variant_is_kept() {
        let cfg = test_config();
        let comparator = Comparator::new(&cfg.cdn, &StructuralClassifier);
        let cdn = cdn_inventory(vec![sample_asset("x", "thumbnail_x", Variant::Thumbnail)]);
        let cms = CmsInventory {
            media: vec![
                entry(3, "x.jpg", Some(1), Provider::Native),
                entry(4, "y.jpg", Some(1), Provider::Native),
            ],
            folders: tree(vec![Folder {
                id: 1,
                name: "x".into(),
                parent_id: None,
            }]),
        };

        let plan = comparator.compare(&cdn, &cms, &Scope::All);
        assert_eq!(plan.orphans.len(), 1);
        let deletes = plan.select(&[ActionKind::DeleteEntry]);
        assert_eq!(deletes.len(), 1);
        assert!(matches!(
            deletes[0],
            ReconciliationAction::DeleteEntry { entry_id: 4, .. }
        ));
    }

    #[test]
    fn leftover_native_uploads_are_deleted_and_scoped() {
        let cfg = test_config();
        let comparator = Comparator::new(&cfg.cdn, &StructuralClassifier);
        let cdn = cdn_inventory(agricola_assets());
        let cms = CmsInventory {
            media: vec![
                entry(7, "haythorne_0109.jpg", None, Provider::Native),
                entry(8, "stray.jpg", Some(10), Provider::Native),
            ],
            folders: tree(vec![agricola_folder()]),
        };

        let all = comparator.compare(&cdn, &cms, &Scope::All);
        assert_eq!(all.count(ActionKind::DeleteEntry), 2);

        let scoped = comparator.compare(
            &cdn,
            &cms,
            &Scope::Folder {
                path: "agricola".into(),
            },
        );
        let deletes = scoped.select(&[ActionKind::DeleteEntry]);
        assert_eq!(deletes.len(), 1);
        assert!(matches!(
            deletes[0],
            ReconciliationAction::DeleteEntry { entry_id: 8, .. }
        ));
    }

    #[test]
    fn nested_folders_are_created_parent_first() {
        let cfg = test_config();
        let comparator = Comparator::new(&cfg.cdn, &StructuralClassifier);
        let mut cdn = cdn_inventory(vec![sample_asset("a/b/c", "img", Variant::Original)]);
        cdn.folders = ["a", "a/b", "a/b/c"].iter().map(|s| s.to_string()).collect();
        let cms = CmsInventory {
            media: Vec::new(),
            folders: tree(vec![Folder {
                id: 1,
                name: "a".into(),
                parent_id: None,
            }]),
        };

        let plan = comparator.compare(&cdn, &cms, &Scope::All);
        let folders = plan.select(&[ActionKind::CreateFolder]);
        assert_eq!(folders.len(), 2);
        assert_eq!(
            folders[0],
            ReconciliationAction::CreateFolder {
                path: "a/b".into(),
                name: "b".into(),
                parent: FolderTarget::Existing {
                    id: 1,
                    path: "a".into()
                },
            }
        );
        assert_eq!(
            folders[1],
            ReconciliationAction::CreateFolder {
                path: "a/b/c".into(),
                name: "c".into(),
                parent: FolderTarget::Pending { path: "a/b".into() },
            }
        );
    }

    #[test]
    fn scope_resolution() {
        let mut assets = agricola_assets();
        assets.push(sample_asset("haythorne", "haythorne_0001", Variant::Original));
        let cdn = cdn_inventory(assets);

        assert_eq!(Scope::resolve(None, "beckwithbarrow", &cdn).unwrap(), Scope::All);
        assert_eq!(
            Scope::resolve(Some("agricola"), "beckwithbarrow", &cdn).unwrap(),
            Scope::Folder {
                path: "agricola".into()
            }
        );
        assert_eq!(
            Scope::resolve(Some("beckwithbarrow/agricola/"), "beckwithbarrow", &cdn).unwrap(),
            Scope::Folder {
                path: "agricola".into()
            }
        );
        assert_eq!(
            Scope::resolve(Some("haythorne_0001.jpg"), "beckwithbarrow", &cdn).unwrap(),
            Scope::Asset {
                folder: "haythorne".into(),
                basename: "haythorne_0001".into()
            }
        );
        assert_eq!(
            Scope::resolve(
                Some("beckwithbarrow/agricola/thumbnail_agricola_001"),
                "beckwithbarrow",
                &cdn
            )
            .unwrap(),
            Scope::Asset {
                folder: "agricola".into(),
                basename: "agricola_001".into()
            }
        );
        assert!(matches!(
            Scope::resolve(Some("nowhere"), "beckwithbarrow", &cdn),
            Err(SyncError::UnknownScope(_))
        ));
    }

    #[test]
    fn asset_scope_only_touches_that_image() {
        let cfg = test_config();
        let comparator = Comparator::new(&cfg.cdn, &StructuralClassifier);
        let mut assets = agricola_assets();
        assets.push(sample_asset("agricola", "agricola_002", Variant::Original));
        let cdn = cdn_inventory(assets);
        let cms = CmsInventory {
            media: vec![entry(7, "haythorne_0109.jpg", None, Provider::Native)],
            folders: tree(vec![agricola_folder()]),
        };

        let plan = comparator.compare(
            &cdn,
            &cms,
            &Scope::Asset {
                folder: "agricola".into(),
                basename: "agricola_002".into(),
            },
        );
        assert_eq!(plan.actions.len(), 1);
        assert!(matches!(
            &plan.actions[0],
            ReconciliationAction::CreateReference { name, .. } if name == "agricola_002.jpg"
        ));
    }
}
