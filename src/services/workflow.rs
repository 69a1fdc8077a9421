//! One reconciliation run as an explicit state machine:
//!
//! `READ_INVENTORIES -> COMPARE -> PREVIEW [-> EXECUTE] -> REPORT`
//!
//! Any error before `EXECUTE` ends the run in `ABORTED` with no mutation
//! attempted. Inside `EXECUTE` failures are per item and end up in the report,
//! except fatal ones (`Auth`), which stop the batch and abort the run.

use super::{
    cdn::CdnApi,
    classify::classifier_for,
    cleanup::CleanupExecutor,
    cms::CmsApi,
    comparator::{Comparator, Scope},
    folder_sync::FolderSynchronizer,
    inventory::InventoryReader,
    reference_writer::ReferenceWriter,
    report::{RunReport, fingerprint},
    validate::check_invariants,
};
use crate::{
    config::AppConfig,
    errors::{SyncError, SyncResult},
    models::action::ActionKind,
};
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    ReadInventories,
    Compare,
    Preview,
    Execute,
    Report,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunState::ReadInventories => "READ_INVENTORIES",
            RunState::Compare => "COMPARE",
            RunState::Preview => "PREVIEW",
            RunState::Execute => "EXECUTE",
            RunState::Report => "REPORT",
            RunState::Aborted => "ABORTED",
        })
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunMode {
    Preview,
    Execute,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Audit,
    Validate,
    Report,
    Preview,
    Migrate,
    Cleanup,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Audit => "audit",
            Operation::Validate => "validate",
            Operation::Report => "report",
            Operation::Preview => "preview",
            Operation::Migrate => "migrate",
            Operation::Cleanup => "cleanup",
        }
    }

    /// Action kinds this operation acts on (or shows).
    pub fn kinds(self) -> &'static [ActionKind] {
        match self {
            Operation::Migrate => &[
                ActionKind::CreateFolder,
                ActionKind::CreateReference,
                ActionKind::UpdateReference,
            ],
            Operation::Cleanup => &[ActionKind::DeleteEntry],
            _ => &ActionKind::ALL,
        }
    }

    pub fn mutates(self) -> bool {
        matches!(self, Operation::Migrate | Operation::Cleanup)
    }
}

#[derive(Clone, Debug)]
pub struct RunRequest {
    pub operation: Operation,
    pub target: Option<String>,
    pub all: bool,
    pub mode: RunMode,
    pub leftover_prefixes: Vec<String>,
}

impl RunRequest {
    pub fn new(operation: Operation, mode: RunMode) -> Self {
        Self {
            operation,
            target: None,
            all: false,
            mode,
            leftover_prefixes: Vec::new(),
        }
    }
}

pub struct Workflow<'a> {
    cfg: &'a AppConfig,
    cdn: &'a dyn CdnApi,
    cms: &'a dyn CmsApi,
}

impl<'a> Workflow<'a> {
    pub fn new(cfg: &'a AppConfig, cdn: &'a dyn CdnApi, cms: &'a dyn CmsApi) -> Self {
        Self { cfg, cdn, cms }
    }

    pub async fn run(&self, request: &RunRequest) -> SyncResult<RunReport> {
        let mut state = RunState::ReadInventories;
        info!(
            "{} run started ({:?}, root `{}`)",
            request.operation.name(),
            request.mode,
            self.cfg.root_folder
        );
        match self.drive(request, &mut state).await {
            Ok(report) => Ok(report),
            Err(err) => {
                error!("{} -> {}: {}", state, RunState::Aborted, err);
                Err(err)
            }
        }
    }

    async fn drive(&self, request: &RunRequest, state: &mut RunState) -> SyncResult<RunReport> {
        let operation = request.operation;
        let mode = if operation.mutates() {
            request.mode
        } else {
            RunMode::Preview
        };
        if mode == RunMode::Execute && request.target.is_none() && !request.all {
            return Err(SyncError::validation(
                "scope",
                format!("{} needs a folder, an asset or --all to execute", operation.name()),
            ));
        }

        let reader = InventoryReader::new(self.cfg, self.cdn, self.cms);
        let cdn_inventory = reader.list_cdn_assets(&self.cfg.root_folder).await?;
        let cms_inventory = reader.list_cms().await?;
        let scope = Scope::resolve(
            request.target.as_deref(),
            &self.cfg.root_folder,
            &cdn_inventory,
        )?;

        advance(state, RunState::Compare);
        let classifier = classifier_for(&request.leftover_prefixes);
        debug!("leftover classifier: {}", classifier.name());
        let plan = Comparator::new(&self.cfg.cdn, classifier.as_ref()).compare(
            &cdn_inventory,
            &cms_inventory,
            &scope,
        );
        let violations = if operation == Operation::Validate {
            check_invariants(&cms_inventory, &self.cfg.cdn, &scope)
        } else {
            Vec::new()
        };
        let actions = plan.select(operation.kinds());

        // The execute pass below consumes exactly this list.
        advance(state, RunState::Preview);
        let digest = fingerprint(&actions)?;
        info!(
            "plan {} for {}: {} actions",
            digest,
            scope.label(),
            actions.len()
        );
        for action in &actions {
            info!("[preview] {}", action);
        }

        let mut outcomes = Vec::new();
        if mode == RunMode::Execute {
            advance(state, RunState::Execute);
            let (folder_outcomes, folders) = FolderSynchronizer::new(self.cms)
                .apply(&actions, &cms_inventory.folders)
                .await?;
            outcomes.extend(folder_outcomes);
            outcomes.extend(
                ReferenceWriter::new(self.cfg, self.cms)
                    .apply(&actions, &folders)
                    .await?,
            );
            outcomes.extend(CleanupExecutor::new(self.cms).apply(&actions).await?);
            info!("executed plan {} ({} outcomes)", digest, outcomes.len());
        }

        advance(state, RunState::Report);
        RunReport::new(operation.name(), mode, plan, actions, outcomes, violations)
    }
}

fn advance(state: &mut RunState, next: RunState) {
    debug!("{} -> {}", state, next);
    *state = next;
}
