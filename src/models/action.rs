//! Reconciliation actions produced by the comparator and consumed by the
//! executors, plus the per-action outcomes the executors report.

use super::{asset::AssetRecord, media::MediaFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fmt};

/// Folder an action places something into.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FolderTarget {
    /// The media library root.
    Root,
    /// A folder that already exists in the CMS.
    Existing { id: i64, path: String },
    /// A folder a `CreateFolder` action earlier in the plan will create.
    Pending { path: String },
}

impl FolderTarget {
    pub fn path(&self) -> &str {
        match self {
            FolderTarget::Root => "",
            FolderTarget::Existing { path, .. } | FolderTarget::Pending { path } => path,
        }
    }
}

/// Reference fields written onto a CMS entry. Never carries file bytes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReferencePatch {
    /// CDN URL of the original rendition.
    pub url: String,
    /// One on-the-fly transformation URL per non-original variant.
    pub formats: BTreeMap<String, MediaFormat>,
    pub provider_metadata: Value,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
    pub ext: String,
    pub mime: String,
}

impl ReferencePatch {
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.url.as_str()).chain(self.formats.values().map(|f| f.url.as_str()))
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    CreateFolder,
    CreateReference,
    UpdateReference,
    DeleteEntry,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::CreateFolder,
        ActionKind::CreateReference,
        ActionKind::UpdateReference,
        ActionKind::DeleteEntry,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::CreateFolder => "createFolder",
            ActionKind::CreateReference => "createReference",
            ActionKind::UpdateReference => "updateReference",
            ActionKind::DeleteEntry => "deleteEntry",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single CMS mutation, computed fresh on every run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ReconciliationAction {
    CreateFolder {
        /// Full relative path of the folder to create.
        path: String,
        name: String,
        parent: FolderTarget,
    },
    CreateReference {
        /// Original rendition the new entry points at.
        asset: AssetRecord,
        name: String,
        folder: FolderTarget,
        reference: ReferencePatch,
    },
    UpdateReference {
        entry_id: i64,
        name: String,
        folder_path: String,
        reference: ReferencePatch,
    },
    DeleteEntry {
        entry_id: i64,
        name: String,
        folder_path: String,
    },
}

impl ReconciliationAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            ReconciliationAction::CreateFolder { .. } => ActionKind::CreateFolder,
            ReconciliationAction::CreateReference { .. } => ActionKind::CreateReference,
            ReconciliationAction::UpdateReference { .. } => ActionKind::UpdateReference,
            ReconciliationAction::DeleteEntry { .. } => ActionKind::DeleteEntry,
        }
    }

    /// Enough context to find and retry the item by hand.
    pub fn target(&self) -> String {
        match self {
            ReconciliationAction::CreateFolder { path, .. } => format!("folder `{}`", path),
            ReconciliationAction::CreateReference { name, folder, .. } => {
                format!("`{}` in folder `{}`", name, display_folder(folder.path()))
            }
            ReconciliationAction::UpdateReference {
                entry_id,
                name,
                folder_path,
                ..
            }
            | ReconciliationAction::DeleteEntry {
                entry_id,
                name,
                folder_path,
            } => format!(
                "entry {} `{}` in folder `{}`",
                entry_id,
                name,
                display_folder(folder_path)
            ),
        }
    }
}

impl fmt::Display for ReconciliationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<16} {}", self.kind().as_str(), self.target())?;
        match self {
            ReconciliationAction::CreateReference { reference, .. }
            | ReconciliationAction::UpdateReference { reference, .. } => {
                write!(f, " -> {} (+{} formats)", reference.url, reference.formats.len())
            }
            _ => Ok(()),
        }
    }
}

pub fn display_folder(path: &str) -> &str {
    if path.is_empty() { "/" } else { path }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "status", content = "detail", rename_all = "camelCase")]
pub enum OutcomeStatus {
    Succeeded,
    /// Nothing to do at mutation time (already in the desired state).
    Skipped(String),
    Failed(String),
}

/// What an executor did with one action.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ActionOutcome {
    pub kind: ActionKind,
    pub target: String,
    pub status: OutcomeStatus,
}

impl ActionOutcome {
    pub fn succeeded(action: &ReconciliationAction) -> Self {
        Self::new(action, OutcomeStatus::Succeeded)
    }

    pub fn skipped(action: &ReconciliationAction, reason: impl Into<String>) -> Self {
        Self::new(action, OutcomeStatus::Skipped(reason.into()))
    }

    pub fn failed(action: &ReconciliationAction, reason: impl Into<String>) -> Self {
        Self::new(action, OutcomeStatus::Failed(reason.into()))
    }

    fn new(action: &ReconciliationAction, status: OutcomeStatus) -> Self {
        Self {
            kind: action.kind(),
            target: action.target(),
            status,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed(_))
    }
}
