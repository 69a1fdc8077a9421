//! Run report: counts, per-folder breakdown, the selected actions and what
//! happened to them. Rendered for humans on stdout and optionally written as
//! a JSON snapshot. Never read back.

use super::{
    comparator::{AmbiguousEntry, FolderBreakdown, OrphanVariant, Plan, Scope},
    inventory::InvalidItem,
    validate::Violation,
    workflow::{RunMode, RunState},
};
use crate::{
    errors::SyncResult,
    models::action::{ActionKind, ActionOutcome, OutcomeStatus, ReconciliationAction, display_folder},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fmt::Write as _, fs, path::Path};
use tracing::info;
use uuid::Uuid;

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    pub create_folder: usize,
    pub create_reference: usize,
    pub update_reference: usize,
    pub delete_entry: usize,
    pub orphan_variant: usize,
    pub noop: usize,
    pub invalid: usize,
    pub ambiguous: usize,
}

impl Counts {
    pub fn from_plan(plan: &Plan) -> Self {
        Self {
            create_folder: plan.count(ActionKind::CreateFolder),
            create_reference: plan.count(ActionKind::CreateReference),
            update_reference: plan.count(ActionKind::UpdateReference),
            delete_entry: plan.count(ActionKind::DeleteEntry),
            orphan_variant: plan.orphans.len(),
            noop: plan.noops.len(),
            invalid: plan.invalid.len(),
            ambiguous: plan.ambiguous.len(),
        }
    }

    fn rows(&self) -> [(&'static str, usize); 8] {
        [
            ("createFolder", self.create_folder),
            ("createReference", self.create_reference),
            ("updateReference", self.update_reference),
            ("deleteEntry", self.delete_entry),
            ("orphanVariant", self.orphan_variant),
            ("noop", self.noop),
            ("invalid", self.invalid),
            ("ambiguous", self.ambiguous),
        ]
    }
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub command: String,
    pub scope: Scope,
    pub generated_at: DateTime<Utc>,
    pub mode: RunMode,
    pub state: RunState,
    /// MD5 of the serialized `actions`; equal for a preview and the execute
    /// pass over the same snapshot.
    pub plan_fingerprint: String,
    pub counts: Counts,
    pub folders: Vec<FolderBreakdown>,
    /// Actions selected for this command, in execution order.
    pub actions: Vec<ReconciliationAction>,
    pub outcomes: Vec<ActionOutcome>,
    pub orphans: Vec<OrphanVariant>,
    pub invalid: Vec<InvalidItem>,
    pub ambiguous: Vec<AmbiguousEntry>,
    pub violations: Vec<Violation>,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Digest identifying an action list.
pub fn fingerprint(actions: &[ReconciliationAction]) -> SyncResult<String> {
    let serialized = serde_json::to_vec(actions)?;
    Ok(format!("{:x}", md5::compute(serialized)))
}

impl RunReport {
    pub fn new(
        command: &str,
        mode: RunMode,
        plan: Plan,
        actions: Vec<ReconciliationAction>,
        outcomes: Vec<ActionOutcome>,
        violations: Vec<Violation>,
    ) -> SyncResult<Self> {
        let tally = |pred: fn(&OutcomeStatus) -> bool| {
            outcomes.iter().filter(|o| pred(&o.status)).count()
        };
        let succeeded = tally(|s| matches!(s, OutcomeStatus::Succeeded));
        let skipped = tally(|s| matches!(s, OutcomeStatus::Skipped(_)));
        let failed = tally(|s| matches!(s, OutcomeStatus::Failed(_)));

        Ok(Self {
            run_id: Uuid::new_v4(),
            command: command.to_string(),
            generated_at: Utc::now(),
            mode,
            state: RunState::Report,
            plan_fingerprint: fingerprint(&actions)?,
            counts: Counts::from_plan(&plan),
            scope: plan.scope,
            folders: plan.folders,
            actions,
            outcomes,
            orphans: plan.orphans,
            invalid: plan.invalid,
            ambiguous: plan.ambiguous,
            violations,
            succeeded,
            skipped,
            failed,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// `media-sync-<command>-<UTC timestamp>.json`
    pub fn file_name(&self) -> String {
        format!(
            "media-sync-{}-{}.json",
            self.command,
            self.generated_at.format("%Y%m%dT%H%M%SZ")
        )
    }

    pub fn write_json(&self, path: &Path) -> SyncResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("wrote report {}", path.display());
        Ok(())
    }

    /// Human-readable report. Per-folder rows are only shown when asked for.
    pub fn render(&self, with_folders: bool) -> String {
        let mut out = String::new();
        let mode = match self.mode {
            RunMode::Preview => "preview",
            RunMode::Execute => "execute",
        };
        let _ = writeln!(out, "media-sync {} ({}) for {}", self.command, mode, self.scope.label());
        let _ = writeln!(
            out,
            "run {} at {}",
            self.run_id,
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(
            out,
            "plan {} ({} actions)",
            self.plan_fingerprint,
            self.actions.len()
        );

        let _ = writeln!(out, "\nCounts");
        for (label, count) in self.counts.rows() {
            let _ = writeln!(out, "  {:<16} {:>6}", label, count);
        }

        if with_folders && !self.folders.is_empty() {
            let _ = writeln!(out, "\nFolders");
            let _ = writeln!(out, "  {:<40} {:>6} {:>6}  STATUS", "PATH", "CDN", "CMS");
            for row in &self.folders {
                let _ = writeln!(
                    out,
                    "  {:<40} {:>6} {:>6}  {}",
                    display_folder(&row.path),
                    row.cdn_count,
                    row.cms_count,
                    row.status.as_str()
                );
            }
        }

        if !self.actions.is_empty() {
            let _ = writeln!(out, "\nActions");
            for action in &self.actions {
                let _ = writeln!(out, "  {}", action);
            }
        }

        if !self.orphans.is_empty() {
            let _ = writeln!(out, "\nOrphan variants (no original, nothing created)");
            for orphan in &self.orphans {
                let variants: Vec<&str> = orphan.variants.iter().map(|v| v.as_str()).collect();
                let _ = writeln!(
                    out,
                    "  {}/{} [{}]",
                    display_folder(&orphan.folder),
                    orphan.basename,
                    variants.join(", ")
                );
            }
        }

        if !self.ambiguous.is_empty() {
            let _ = writeln!(out, "\nAmbiguous entries (never deleted, check by hand)");
            for entry in &self.ambiguous {
                let _ = writeln!(
                    out,
                    "  entry {} `{}` in folder `{}`: {}",
                    entry.entry_id,
                    entry.name,
                    display_folder(&entry.folder_path),
                    entry.reason
                );
            }
        }

        if !self.invalid.is_empty() {
            let _ = writeln!(out, "\nInvalid CDN items (skipped)");
            for item in &self.invalid {
                let _ = writeln!(out, "  {}: {}", item.id, item.reason);
            }
        }

        if !self.violations.is_empty() {
            let _ = writeln!(out, "\nViolations");
            for violation in &self.violations {
                let _ = writeln!(out, "  {}", violation);
            }
        }

        if self.mode == RunMode::Execute {
            let failures: Vec<&ActionOutcome> =
                self.outcomes.iter().filter(|o| o.is_failure()).collect();
            if !failures.is_empty() {
                let _ = writeln!(out, "\nFailures");
                for outcome in failures {
                    if let OutcomeStatus::Failed(reason) = &outcome.status {
                        let _ = writeln!(out, "  {} {}: {}", outcome.kind, outcome.target, reason);
                    }
                }
            }
            let _ = writeln!(
                out,
                "\n{} succeeded, {} skipped, {} failed",
                self.succeeded, self.skipped, self.failed
            );
        }

        out
    }
}
