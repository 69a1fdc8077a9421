use crate::{
    errors::{SyncError, SyncResult},
    models::{asset::AssetRecord, asset::Variant, normalize_path},
    services::retry::RetryPolicy,
};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Centralized run configuration.
/// Built once from environment variables and handed to every component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cdn: CdnConfig,
    pub cms: CmsConfig,
    /// CDN folder the CMS library mirrors (`beckwithbarrow`).
    pub root_folder: String,
    pub page_size: u32,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub report_dir: PathBuf,
}

#[derive(Clone)]
pub struct CdnConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Admin API base, e.g. `https://api.cloudinary.com/v1_1`.
    pub api_base: String,
    /// Host serving delivery and transformation URLs.
    pub delivery_host: String,
}

#[derive(Clone)]
pub struct CmsConfig {
    pub base_url: String,
    pub api_token: String,
    /// Provider string the CMS stores on CDN-backed entries.
    pub cdn_provider: String,
}

/// Command-line surface.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Reconcile CDN-hosted images with the CMS media library"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compare inventories and show per-folder status (read-only)
    Audit(ScopeArgs),
    /// Check CMS reference entries and the folder tree for invariant violations (read-only)
    Validate(ScopeArgs),
    /// Full per-folder breakdown, written to a JSON report (read-only)
    Report(ScopeArgs),
    /// List every action a migrate or cleanup would take (read-only)
    Preview(ScopeArgs),
    /// Create missing folders and point CMS entries at CDN URLs
    #[command(alias = "execute")]
    Migrate(ScopeArgs),
    /// Remove leftover native uploads (preview unless --execute --confirm)
    Cleanup(ScopeArgs),
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Folder path relative to the root folder, or an asset id
    pub target: Option<String>,

    /// Target every folder under the root
    #[arg(long, conflicts_with = "target")]
    pub all: bool,

    /// Compute and print actions without mutating anything
    #[arg(long, conflicts_with = "execute")]
    pub dry_run: bool,

    /// Perform mutations (cleanup also needs --confirm)
    #[arg(long)]
    pub execute: bool,

    /// Confirm destructive cleanup
    #[arg(long)]
    pub confirm: bool,

    /// Write the JSON report to this path
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Name prefix marking leftovers from earlier native uploads (repeatable)
    #[arg(long = "leftover-prefix")]
    pub leftover_prefixes: Vec<String>,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Audit(_) => "audit",
            Command::Validate(_) => "validate",
            Command::Report(_) => "report",
            Command::Preview(_) => "preview",
            Command::Migrate(_) => "migrate",
            Command::Cleanup(_) => "cleanup",
        }
    }
}

const DEFAULT_ROOT_FOLDER: &str = "beckwithbarrow";
const DEFAULT_PAGE_SIZE: u32 = 100;
const MAX_PAGE_SIZE: u32 = 500;

impl AppConfig {
    /// Read configuration through `lookup` (normally `std::env::var`).
    ///
    /// A missing credential is an authentication failure: nothing can be
    /// read or written without it.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> SyncResult<Self> {
        let required = |key: &str| -> SyncResult<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| SyncError::Auth(format!("environment variable {} is not set", key)))
        };
        let optional = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let number = |key: &str, default: u64| -> SyncResult<u64> {
            match lookup(key).map(|v| v.trim().to_string()) {
                Some(value) if !value.is_empty() => value.parse::<u64>().map_err(|err| {
                    SyncError::validation(key, format!("`{}` is not a number: {}", value, err))
                }),
                _ => Ok(default),
            }
        };

        let cdn = CdnConfig {
            cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            api_key: required("CLOUDINARY_API_KEY")?,
            api_secret: required("CLOUDINARY_API_SECRET")?,
            api_base: optional("CLOUDINARY_API_BASE", "https://api.cloudinary.com/v1_1")
                .trim_end_matches('/')
                .to_string(),
            delivery_host: optional("CLOUDINARY_DELIVERY_HOST", "res.cloudinary.com"),
        };
        let cms = CmsConfig {
            base_url: required("STRAPI_URL")?.trim_end_matches('/').to_string(),
            api_token: required("STRAPI_API_TOKEN")?,
            cdn_provider: optional("STRAPI_CDN_PROVIDER", "cloudinary"),
        };

        let page_size = number("MEDIA_SYNC_PAGE_SIZE", DEFAULT_PAGE_SIZE as u64)?
            .clamp(1, MAX_PAGE_SIZE as u64) as u32;
        let retry = RetryPolicy::default()
            .with_max_attempts(number("MEDIA_SYNC_MAX_ATTEMPTS", 4)?.max(1) as u32)
            .with_base_delay(Duration::from_millis(number("MEDIA_SYNC_BASE_DELAY_MS", 500)?));

        Ok(Self {
            cdn,
            cms,
            root_folder: normalize_path(&optional("MEDIA_SYNC_ROOT_FOLDER", DEFAULT_ROOT_FOLDER)),
            page_size,
            retry,
            request_timeout: Duration::from_secs(number("MEDIA_SYNC_TIMEOUT_SECS", 30)?.max(1)),
            report_dir: PathBuf::from(optional("MEDIA_SYNC_REPORT_DIR", "reports")),
        })
    }
}

impl CdnConfig {
    /// Whether `url` is served by this CDN account rather than CMS storage.
    pub fn is_delivery_url(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        parsed.scheme() == "https"
            && parsed.host_str() == Some(self.delivery_host.as_str())
            && parsed
                .path()
                .starts_with(&format!("/{}/", self.cloud_name))
    }

    /// On-the-fly transformation URL resizing `original` into `variant`'s
    /// bounding box. The CDN renders it on request; nothing is stored.
    pub fn transformation_url(&self, original: &AssetRecord, variant: Variant) -> String {
        let transformation = match variant.bounds() {
            Some((width, height)) => format!("c_limit,h_{},w_{}/", height, width),
            None => String::new(),
        };
        let version = if original.version.is_empty() {
            String::new()
        } else {
            format!("v{}/", original.version)
        };
        let extension = if original.format.is_empty() {
            String::new()
        } else {
            format!(".{}", original.format)
        };
        format!(
            "https://{}/{}/image/upload/{}{}{}{}",
            self.delivery_host,
            self.cloud_name,
            transformation,
            version,
            original.public_id,
            extension
        )
    }
}

// Credentials stay out of logs.
impl std::fmt::Debug for CdnConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdnConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_base", &self.api_base)
            .field("delivery_host", &self.delivery_host)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for CmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmsConfig")
            .field("base_url", &self.base_url)
            .field("cdn_provider", &self.cdn_provider)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig::from_env(|key| {
        match key {
            "CLOUDINARY_CLOUD_NAME" => Some("demo"),
            "CLOUDINARY_API_KEY" => Some("key"),
            "CLOUDINARY_API_SECRET" => Some("secret"),
            "STRAPI_URL" => Some("https://cms.example.test/"),
            "STRAPI_API_TOKEN" => Some("token"),
            "MEDIA_SYNC_BASE_DELAY_MS" => Some("0"),
            _ => None,
        }
        .map(str::to_string)
    })
    .expect("test config")
}
