//! Read-only commands: `audit`, `validate`, `report`, `preview`.
//! None of them ever reaches the execute state, whatever flags are passed.

use super::{Context, request_for, run_and_print};
use crate::{
    config::ScopeArgs,
    errors::SyncResult,
    services::{
        report::RunReport,
        workflow::{Operation, RunMode},
    },
};
use tracing::warn;

/// `audit [target]`: per-folder status and action counts.
pub async fn audit(ctx: &Context<'_>, args: &ScopeArgs) -> SyncResult<RunReport> {
    read_only(ctx, Operation::Audit, args, true).await
}

/// `validate [target]`: invariant violations over the CMS inventory.
pub async fn validate(ctx: &Context<'_>, args: &ScopeArgs) -> SyncResult<RunReport> {
    read_only(ctx, Operation::Validate, args, false).await
}

/// `report [target]`: full breakdown, always written to disk.
pub async fn report(ctx: &Context<'_>, args: &ScopeArgs) -> SyncResult<RunReport> {
    warn_if_mutating(Operation::Report, args);
    let request = request_for(Operation::Report, RunMode::Preview, args);
    run_and_print(ctx, request, args, true, Some(&ctx.cfg.report_dir)).await
}

/// `preview [target]`: every action migrate and cleanup would take.
pub async fn preview(ctx: &Context<'_>, args: &ScopeArgs) -> SyncResult<RunReport> {
    read_only(ctx, Operation::Preview, args, false).await
}

async fn read_only(
    ctx: &Context<'_>,
    operation: Operation,
    args: &ScopeArgs,
    with_folders: bool,
) -> SyncResult<RunReport> {
    warn_if_mutating(operation, args);
    let request = request_for(operation, RunMode::Preview, args);
    run_and_print(ctx, request, args, with_folders, None).await
}

fn warn_if_mutating(operation: Operation, args: &ScopeArgs) {
    if args.execute || args.confirm {
        warn!(
            "{} is read-only; ignoring --execute/--confirm",
            operation.name()
        );
    }
}
