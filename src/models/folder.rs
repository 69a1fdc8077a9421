//! CMS folder records and the path index built over them.

use crate::errors::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// A folder in the CMS media library.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Folder {
    pub id: i64,
    pub name: String,
    /// `None` for folders at the library root.
    pub parent_id: Option<i64>,
}

/// Folder tree indexed by `/`-delimited path from the library root.
///
/// Built once per run; construction fails on a parent cycle.
#[derive(Clone, Debug, Default)]
pub struct FolderTree {
    folders: BTreeMap<i64, Folder>,
    paths: BTreeMap<i64, String>,
    by_path: BTreeMap<String, i64>,
}

impl FolderTree {
    pub fn build(folders: Vec<Folder>) -> SyncResult<Self> {
        let folders: BTreeMap<i64, Folder> = folders.into_iter().map(|f| (f.id, f)).collect();
        let mut paths = BTreeMap::new();

        for id in folders.keys() {
            let mut segments = Vec::new();
            let mut seen = BTreeSet::new();
            let mut cursor = Some(*id);
            while let Some(current) = cursor {
                if !seen.insert(current) {
                    return Err(SyncError::FolderCycle(current));
                }
                match folders.get(&current) {
                    Some(folder) => {
                        segments.push(folder.name.clone());
                        cursor = folder.parent_id;
                    }
                    None => {
                        warn!(
                            "folder {} references missing parent {}, treating it as a root folder",
                            id, current
                        );
                        break;
                    }
                }
            }
            segments.reverse();
            paths.insert(*id, segments.join("/"));
        }

        let mut by_path = BTreeMap::new();
        for (id, path) in &paths {
            if let Some(previous) = by_path.insert(path.clone(), *id) {
                warn!(
                    "folders {} and {} share the path `{}`; using the lower id",
                    previous, id, path
                );
                by_path.insert(path.clone(), previous.min(*id));
            }
        }

        Ok(Self {
            folders,
            paths,
            by_path,
        })
    }

    /// Folder id for a relative path. The root (`""`) has no folder record.
    pub fn find(&self, path: &str) -> Option<i64> {
        self.by_path.get(path).copied()
    }

    pub fn path_of(&self, id: i64) -> Option<&str> {
        self.paths.get(&id).map(String::as_str)
    }

    /// Path of an entry's folder, with `None` meaning the library root.
    pub fn path_of_entry(&self, folder_id: Option<i64>) -> Option<&str> {
        match folder_id {
            None => Some(""),
            Some(id) => self.path_of(id),
        }
    }

    pub fn get(&self, id: i64) -> Option<&Folder> {
        self.folders.get(&id)
    }

    pub fn paths(&self) -> impl Iterator<Item = (&str, i64)> {
        self.by_path.iter().map(|(path, id)| (path.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}
