//! CDN (Cloudinary) Admin API access.
//!
//! The trait is the seam the inventory reader depends on; `CloudinaryClient`
//! is the HTTP implementation. Nothing here writes to the CDN.

use super::http::{build_client, send_json};
use crate::{
    config::{AppConfig, CdnConfig},
    errors::{SyncError, SyncResult},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

/// One resource as listed by the Admin API.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CdnResource {
    pub public_id: String,
    /// Set when the account uses dynamic folders.
    #[serde(default)]
    pub asset_folder: Option<String>,
    /// Set by older fixed-folder accounts.
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub secure_url: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct CdnResourcePage {
    #[serde(default)]
    pub resources: Vec<CdnResource>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CdnFolder {
    pub name: String,
    pub path: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct CdnFolderPage {
    #[serde(default)]
    pub folders: Vec<CdnFolder>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait CdnApi: Send + Sync {
    /// One page of image resources whose public id starts with `prefix`.
    async fn list_resources(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> SyncResult<CdnResourcePage>;

    /// One page of direct subfolders of `path`.
    async fn list_subfolders(
        &self,
        path: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> SyncResult<CdnFolderPage>;
}

pub struct CloudinaryClient {
    http: Client,
    cfg: CdnConfig,
}

impl CloudinaryClient {
    pub fn new(cfg: &AppConfig) -> SyncResult<Self> {
        Ok(Self {
            http: build_client(cfg.request_timeout)?,
            cfg: cfg.cdn.clone(),
        })
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> SyncResult<Url> {
        let mut url = Url::parse(&self.cfg.api_base).map_err(|err| {
            SyncError::validation("CLOUDINARY_API_BASE", format!("invalid URL: {}", err))
        })?;
        url.path_segments_mut()
            .map_err(|_| SyncError::validation("CLOUDINARY_API_BASE", "URL cannot be a base"))?
            .pop_if_empty()
            .push(&self.cfg.cloud_name)
            .extend(segments.into_iter().filter(|s| !s.is_empty()));
        Ok(url)
    }
}

#[async_trait]
impl CdnApi for CloudinaryClient {
    async fn list_resources(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> SyncResult<CdnResourcePage> {
        let url = self.endpoint(["resources", "image", "upload"])?;
        let max_results = page_size.to_string();
        let mut request = self
            .http
            .get(url)
            .basic_auth(&self.cfg.api_key, Some(&self.cfg.api_secret))
            .query(&[("prefix", prefix), ("max_results", max_results.as_str())]);
        if let Some(cursor) = cursor {
            request = request.query(&[("next_cursor", cursor)]);
        }
        send_json(request).await
    }

    async fn list_subfolders(
        &self,
        path: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> SyncResult<CdnFolderPage> {
        let url = self.endpoint(std::iter::once("folders").chain(path.split('/')))?;
        let mut request = self
            .http
            .get(url)
            .basic_auth(&self.cfg.api_key, Some(&self.cfg.api_secret))
            .query(&[("max_results", page_size.to_string())]);
        if let Some(cursor) = cursor {
            request = request.query(&[("next_cursor", cursor)]);
        }
        send_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn endpoints_keep_folder_separators() {
        let client = CloudinaryClient::new(&test_config()).unwrap();
        let url = client
            .endpoint(std::iter::once("folders").chain("beckwithbarrow/agricola".split('/')))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.cloudinary.com/v1_1/demo/folders/beckwithbarrow/agricola"
        );
    }

    #[test]
    fn decodes_admin_api_listing() {
        let page: CdnResourcePage = serde_json::from_str(
            r#"{
                "resources": [{
                    "public_id": "beckwithbarrow/agricola/agricola_001",
                    "format": "jpg",
                    "version": 1700000000,
                    "width": 2400,
                    "height": 1600,
                    "bytes": 512000,
                    "asset_folder": "beckwithbarrow/agricola",
                    "secure_url": "https://res.cloudinary.com/demo/image/upload/v1700000000/beckwithbarrow/agricola/agricola_001.jpg",
                    "type": "upload"
                }],
                "next_cursor": "abc"
            }"#,
        )
        .unwrap();
        assert_eq!(page.resources.len(), 1);
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));
        assert_eq!(page.resources[0].version, 1700000000);
    }
}
