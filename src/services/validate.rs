//! Read-only invariant checks over the CMS inventory.
//!
//! Folder cycles never reach this point: building the [`FolderTree`] already
//! aborts the run on one.
//!
//! [`FolderTree`]: crate::models::folder::FolderTree

use super::{comparator::Scope, inventory::CmsInventory};
use crate::{
    config::CdnConfig,
    models::{
        action::display_folder,
        media::{MediaEntry, Provider},
    },
};
use serde::Serialize;
use std::{collections::BTreeMap, fmt};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Rule {
    /// A cdn-reference entry exposes a URL outside the CDN.
    NonCdnUrl,
    /// Two entries in one folder share a basename.
    DuplicateBasename,
    /// An entry points at a folder id the CMS does not list.
    UnknownFolder,
    /// A folder's parent id does not exist.
    MissingParent,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub rule: Rule,
    pub entry_id: Option<i64>,
    pub name: String,
    pub folder_path: String,
    pub detail: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = match self.rule {
            Rule::NonCdnUrl => "non-CDN URL",
            Rule::DuplicateBasename => "duplicate basename",
            Rule::UnknownFolder => "unknown folder",
            Rule::MissingParent => "missing parent",
        };
        match self.entry_id {
            Some(id) => write!(
                f,
                "{}: entry {} `{}` in folder `{}`: {}",
                rule,
                id,
                self.name,
                display_folder(&self.folder_path),
                self.detail
            ),
            None => write!(
                f,
                "{}: folder `{}`: {}",
                rule,
                display_folder(&self.folder_path),
                self.detail
            ),
        }
    }
}

pub fn check_invariants(cms: &CmsInventory, cdn: &CdnConfig, scope: &Scope) -> Vec<Violation> {
    let tree = &cms.folders;
    let mut violations = Vec::new();
    let mut by_location: BTreeMap<(Option<i64>, &str), Vec<&MediaEntry>> = BTreeMap::new();

    for entry in &cms.media {
        let Some(path) = tree.path_of_entry(entry.folder_id) else {
            if scope.is_all() {
                violations.push(Violation {
                    rule: Rule::UnknownFolder,
                    entry_id: Some(entry.id),
                    name: entry.name.clone(),
                    folder_path: "?".into(),
                    detail: format!("folder id {:?} is not in the folder tree", entry.folder_id),
                });
            }
            continue;
        };
        if !scope.covers_folder(path) {
            continue;
        }
        let foreign = (entry.provider == Provider::CdnReference)
            .then(|| entry.urls().find(|url| !cdn.is_delivery_url(url)))
            .flatten();
        if let Some(url) = foreign {
            violations.push(Violation {
                rule: Rule::NonCdnUrl,
                entry_id: Some(entry.id),
                name: entry.name.clone(),
                folder_path: path.to_string(),
                detail: format!("`{}` is not served by the CDN", url),
            });
        }
        by_location
            .entry((entry.folder_id, entry.basename()))
            .or_default()
            .push(entry);
    }

    for entries in by_location.values().filter(|e| e.len() > 1) {
        let first = entries[0];
        let ids: Vec<String> = entries.iter().map(|e| e.id.to_string()).collect();
        violations.push(Violation {
            rule: Rule::DuplicateBasename,
            entry_id: Some(first.id),
            name: first.name.clone(),
            folder_path: tree
                .path_of_entry(first.folder_id)
                .unwrap_or_default()
                .to_string(),
            detail: format!("entries {} share basename `{}`", ids.join(", "), first.basename()),
        });
    }

    for (path, id) in tree.paths().filter(|(path, _)| scope.covers_folder(path)) {
        let orphaned = tree
            .get(id)
            .and_then(|f| f.parent_id)
            .filter(|parent| tree.get(*parent).is_none());
        if let Some(parent) = orphaned {
            violations.push(Violation {
                rule: Rule::MissingParent,
                entry_id: None,
                name: path.to_string(),
                folder_path: path.to_string(),
                detail: format!("parent folder {} does not exist", parent),
            });
        }
    }

    violations
}
