//! Mutating commands: `migrate` (alias `execute`) and `cleanup`.
//!
//! `migrate` executes unless `--dry-run` is given. `cleanup` previews unless
//! both `--execute` and `--confirm` are given.

use super::{Context, request_for, run_and_print};
use crate::{
    config::ScopeArgs,
    errors::SyncResult,
    services::{
        report::RunReport,
        workflow::{Operation, RunMode},
    },
};
use tracing::{info, warn};

pub async fn migrate(ctx: &Context<'_>, args: &ScopeArgs) -> SyncResult<RunReport> {
    let mode = migrate_mode(args);
    if mode == RunMode::Preview {
        info!("dry run: nothing will be written");
    }
    let request = request_for(Operation::Migrate, mode, args);
    run_and_print(ctx, request, args, false, None).await
}

pub async fn cleanup(ctx: &Context<'_>, args: &ScopeArgs) -> SyncResult<RunReport> {
    let mode = cleanup_mode(args);
    if args.execute && !args.confirm {
        warn!("--execute without --confirm: showing the deletion list only");
    }
    let request = request_for(Operation::Cleanup, mode, args);
    run_and_print(ctx, request, args, false, None).await
}

pub fn migrate_mode(args: &ScopeArgs) -> RunMode {
    if args.dry_run {
        RunMode::Preview
    } else {
        RunMode::Execute
    }
}

pub fn cleanup_mode(args: &ScopeArgs) -> RunMode {
    if args.execute && args.confirm && !args.dry_run {
        RunMode::Execute
    } else {
        RunMode::Preview
    }
}
