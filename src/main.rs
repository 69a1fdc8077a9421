use anyhow::{Context as _, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod errors;
mod models;
mod services;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("media-sync: {:#}", err);
            ExitCode::from(commands::EXIT_ABORTED)
        }
    }
}

async fn run() -> Result<u8> {
    // --- Local .env, if any ---
    if let Ok(path) = dotenvy::dotenv() {
        eprintln!("loaded environment from {}", path.display());
    }

    // --- Logging setup (stderr; the report goes to stdout) ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // --- Parse CLI + environment ---
    let args = config::Args::parse();
    let cfg = config::AppConfig::from_env(|key| std::env::var(key).ok())
        .context("reading configuration from the environment")?;
    tracing::debug!("Running {} with config: {:?}", args.command.name(), cfg);

    // --- Remote clients ---
    let cdn = services::cdn::CloudinaryClient::new(&cfg).context("building the CDN client")?;
    let cms = services::cms::StrapiClient::new(&cfg).context("building the CMS client")?;

    let ctx = commands::Context {
        cfg: &cfg,
        cdn: &cdn,
        cms: &cms,
    };
    Ok(commands::dispatch(&ctx, &args.command).await)
}
