//! Folder synchronizer: mirror the CDN folder structure in the CMS.

use super::cms::{CmsApi, Relation, StrapiFolder};
use crate::{
    errors::{SyncError, SyncResult},
    models::{
        action::{ActionOutcome, FolderTarget, ReconciliationAction},
        folder::FolderTree,
    },
};
use std::collections::BTreeMap;
use tracing::{error, info};

/// Folder ids known after synchronization, keyed by relative path.
#[derive(Clone, Debug, Default)]
pub struct ResolvedFolders {
    by_path: BTreeMap<String, i64>,
}

impl ResolvedFolders {
    pub fn from_tree(tree: &FolderTree) -> Self {
        Self {
            by_path: tree
                .paths()
                .map(|(path, id)| (path.to_string(), id))
                .collect(),
        }
    }

    pub fn insert(&mut self, path: &str, id: i64) {
        self.by_path.insert(path.to_string(), id);
    }

    /// CMS folder id for `target`; `None` is the library root.
    pub fn resolve(&self, target: &FolderTarget) -> SyncResult<Option<i64>> {
        match target {
            FolderTarget::Root => Ok(None),
            FolderTarget::Existing { id, .. } => Ok(Some(*id)),
            FolderTarget::Pending { path } => self.by_path.get(path).copied().map(Some).ok_or_else(|| {
                SyncError::conflict(
                    format!("folder `{}`", path),
                    "folder does not exist and was not created in this run",
                )
            }),
        }
    }
}

pub struct FolderSynchronizer<'a> {
    cms: &'a dyn CmsApi,
}

impl<'a> FolderSynchronizer<'a> {
    pub fn new(cms: &'a dyn CmsApi) -> Self {
        Self { cms }
    }

    /// Execute `CreateFolder` actions in plan order (parents first).
    /// A fatal error stops the batch and is returned.
    pub async fn apply(
        &self,
        actions: &[ReconciliationAction],
        tree: &FolderTree,
    ) -> SyncResult<(Vec<ActionOutcome>, ResolvedFolders)> {
        let mut resolved = ResolvedFolders::from_tree(tree);
        let mut outcomes = Vec::new();

        for action in actions {
            let ReconciliationAction::CreateFolder { path, name, parent } = action else {
                continue;
            };
            let outcome = match self.create(name, parent, &resolved).await {
                Ok(Created::New(id)) => {
                    info!("created folder `{}` (id {})", path, id);
                    resolved.insert(path, id);
                    ActionOutcome::succeeded(action)
                }
                Ok(Created::Existing(id)) => {
                    info!("folder `{}` already exists (id {}), skipping", path, id);
                    resolved.insert(path, id);
                    ActionOutcome::skipped(action, format!("folder already exists (id {})", id))
                }
                Err(err) if err.is_fatal() => {
                    error!("stopping folder sync at `{}`: {}", path, err);
                    return Err(err);
                }
                Err(err) => {
                    error!("failed to create folder `{}`: {}", path, err);
                    ActionOutcome::failed(action, err.to_string())
                }
            };
            outcomes.push(outcome);
        }
        Ok((outcomes, resolved))
    }

    async fn create(
        &self,
        name: &str,
        parent: &FolderTarget,
        resolved: &ResolvedFolders,
    ) -> SyncResult<Created> {
        let parent_id = resolved.resolve(parent)?;

        // Re-check right before writing; another run may have got here first.
        if let Some(id) = self.find(name, parent_id).await? {
            return Ok(Created::Existing(id));
        }

        info!("creating folder `{}` under {:?}", name, parent_id);
        match self.cms.create_folder(name, parent_id).await {
            Ok(folder) => Ok(Created::New(folder.id)),
            Err(err @ SyncError::Conflict { .. }) => match self.find(name, parent_id).await? {
                Some(id) => Ok(Created::Existing(id)),
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    async fn find(&self, name: &str, parent: Option<i64>) -> SyncResult<Option<i64>> {
        let folders = self.cms.list_folders().await?;
        Ok(folders
            .iter()
            .filter(|f| is_child(f, name, parent))
            .map(|f| f.id)
            .min())
    }
}

fn is_child(folder: &StrapiFolder, name: &str, parent: Option<i64>) -> bool {
    folder.name.trim() == name && folder.parent.map(Relation::id) == parent
}

enum Created {
    New(i64),
    Existing(i64),
}
