//! CLI command handlers.
//!
//! Each handler turns parsed flags into a [`RunRequest`], runs the workflow,
//! prints the report and optionally writes its JSON snapshot. Exit status:
//! 0 success, 1 completed with per-item failures, 2 aborted.

pub mod inspect_commands;
pub mod mutate_commands;

use crate::{
    config::{AppConfig, Command, ScopeArgs},
    errors::SyncResult,
    services::{
        cdn::CdnApi,
        cms::CmsApi,
        report::RunReport,
        workflow::{Operation, RunMode, RunRequest, Workflow},
    },
};
use std::path::PathBuf;
use tracing::error;

pub const EXIT_OK: u8 = 0;
pub const EXIT_ITEM_FAILURES: u8 = 1;
pub const EXIT_ABORTED: u8 = 2;

/// Everything a handler needs, built once in `main`.
pub struct Context<'a> {
    pub cfg: &'a AppConfig,
    pub cdn: &'a dyn CdnApi,
    pub cms: &'a dyn CmsApi,
}

pub async fn dispatch(ctx: &Context<'_>, command: &Command) -> u8 {
    let result = match command {
        Command::Audit(args) => inspect_commands::audit(ctx, args).await,
        Command::Validate(args) => inspect_commands::validate(ctx, args).await,
        Command::Report(args) => inspect_commands::report(ctx, args).await,
        Command::Preview(args) => inspect_commands::preview(ctx, args).await,
        Command::Migrate(args) => mutate_commands::migrate(ctx, args).await,
        Command::Cleanup(args) => mutate_commands::cleanup(ctx, args).await,
    };
    exit_status(command.name(), &result)
}

pub fn exit_status(command: &str, result: &SyncResult<RunReport>) -> u8 {
    match result {
        Ok(report) if report.has_failures() => {
            error!("{} finished with {} failed items", command, report.failed);
            EXIT_ITEM_FAILURES
        }
        Ok(_) => EXIT_OK,
        Err(err) if err.is_fatal() => {
            eprintln!("{} aborted: {}", command, err);
            EXIT_ABORTED
        }
        Err(err) => {
            eprintln!("{} aborted before any change was made: {}", command, err);
            EXIT_ABORTED
        }
    }
}

fn request_for(operation: Operation, mode: RunMode, args: &ScopeArgs) -> RunRequest {
    RunRequest {
        target: args.target.clone(),
        all: args.all,
        leftover_prefixes: args.leftover_prefixes.clone(),
        ..RunRequest::new(operation, mode)
    }
}

/// Run the workflow, print the human report and write the JSON snapshot to
/// `--output`, or to `default_dir` when given.
async fn run_and_print(
    ctx: &Context<'_>,
    request: RunRequest,
    args: &ScopeArgs,
    with_folders: bool,
    default_dir: Option<&PathBuf>,
) -> SyncResult<RunReport> {
    let report = Workflow::new(ctx.cfg, ctx.cdn, ctx.cms)
        .run(&request)
        .await?;
    println!("{}", report.render(with_folders));

    let path = match (&args.output, default_dir) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(dir)) => Some(dir.join(report.file_name())),
        (None, None) => None,
    };
    if let Some(path) = path {
        if let Err(err) = report.write_json(&path) {
            error!("could not write report to {}: {}", path.display(), err);
        }
    }
    Ok(report)
}
