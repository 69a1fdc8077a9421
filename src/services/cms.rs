//! CMS (Strapi) media library access.
//!
//! `CmsApi` is the seam every reader and executor goes through;
//! `StrapiClient` is its HTTP implementation. The upload endpoint is only
//! ever fed the fixed placeholder image; real bytes stay on the CDN.

use super::http::{build_client, send_discard, send_json};
use crate::{
    config::{AppConfig, CmsConfig},
    errors::{SyncError, SyncResult},
    models::{action::ReferencePatch, media::MediaFormat},
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    Client, RequestBuilder,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Reference to a related record: Strapi returns either a bare id or a
/// populated object depending on the endpoint.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(untagged)]
pub enum Relation {
    Id(i64),
    Object { id: i64 },
}

impl Relation {
    pub fn id(self) -> i64 {
        match self {
            Relation::Id(id) | Relation::Object { id } => id,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct StrapiFormat {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Kilobytes, as Strapi stores it.
    #[serde(default)]
    pub size: Option<f64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct StrapiFile {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub formats: Option<BTreeMap<String, StrapiFormat>>,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub provider_metadata: Option<Value>,
    #[serde(default)]
    pub folder: Option<Relation>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StrapiFolder {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub parent: Option<Relation>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListEnvelope<T> {
    Data { data: Vec<T> },
    Results { results: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            ListEnvelope::Data { data } => data,
            ListEnvelope::Results { results } => results,
            ListEnvelope::Bare(items) => items,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ItemEnvelope<T> {
    Data { data: T },
    Bare(T),
}

impl<T> ItemEnvelope<T> {
    fn into_item(self) -> T {
        match self {
            ItemEnvelope::Data { data } => data,
            ItemEnvelope::Bare(item) => item,
        }
    }
}

#[async_trait]
pub trait CmsApi: Send + Sync {
    /// Files `start..start + limit`, ordered by id.
    async fn list_files(&self, start: usize, limit: usize) -> SyncResult<Vec<StrapiFile>>;

    /// Files whose name equals `name` exactly.
    async fn find_files_by_name(&self, name: &str) -> SyncResult<Vec<StrapiFile>>;

    async fn list_folders(&self) -> SyncResult<Vec<StrapiFolder>>;

    async fn create_folder(&self, name: &str, parent: Option<i64>) -> SyncResult<StrapiFolder>;

    /// Create an entry from the placeholder payload; the caller patches it
    /// straight afterwards.
    async fn upload_placeholder(
        &self,
        name: &str,
        folder: Option<i64>,
        payload: Bytes,
    ) -> SyncResult<StrapiFile>;

    /// Overwrite `url`, `formats` and provider fields; id, name and folder stay.
    /// `width`, `height`, `size`, `ext` and `mime` are rewritten as well, so a
    /// placeholder entry stops describing a 1x1 PNG.
    async fn patch_reference(&self, id: i64, patch: &ReferencePatch) -> SyncResult<StrapiFile>;

    async fn delete_file(&self, id: i64) -> SyncResult<()>;
}

pub struct StrapiClient {
    http: Client,
    cfg: CmsConfig,
}

impl StrapiClient {
    pub fn new(cfg: &AppConfig) -> SyncResult<Self> {
        Ok(Self {
            http: build_client(cfg.request_timeout)?,
            cfg: cfg.cms.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.cfg.api_token)
    }
}

/// JSON body written by [`CmsApi::patch_reference`].
pub fn reference_body(patch: &ReferencePatch, provider: &str) -> Value {
    let formats: BTreeMap<&str, Value> = patch
        .formats
        .iter()
        .map(|(key, format)| (key.as_str(), format_body(key, format, patch)))
        .collect();
    json!({
        "url": patch.url,
        "formats": formats,
        "provider": provider,
        "provider_metadata": patch.provider_metadata,
        "width": patch.width,
        "height": patch.height,
        "size": kilobytes(patch.size_bytes),
        "ext": format!(".{}", patch.ext),
        "mime": patch.mime,
    })
}

fn format_body(key: &str, format: &MediaFormat, patch: &ReferencePatch) -> Value {
    json!({
        "name": format!("{}_{}", key, patch.url.rsplit('/').next().unwrap_or_default()),
        "url": format.url,
        "width": format.width,
        "height": format.height,
        "size": kilobytes(format.size_bytes),
        "ext": format!(".{}", patch.ext),
        "mime": patch.mime,
    })
}

pub fn kilobytes(bytes: u64) -> f64 {
    ((bytes as f64 / 1024.0) * 100.0).round() / 100.0
}

#[async_trait]
impl CmsApi for StrapiClient {
    async fn list_files(&self, start: usize, limit: usize) -> SyncResult<Vec<StrapiFile>> {
        let request = self
            .authorized(self.http.get(self.url("/api/upload/files")))
            .query(&[
                ("populate", "folder".to_string()),
                ("sort", "id:asc".to_string()),
                ("pagination[start]", start.to_string()),
                ("pagination[limit]", limit.to_string()),
            ]);
        send_json::<ListEnvelope<StrapiFile>>(request)
            .await
            .map(ListEnvelope::into_items)
    }

    async fn find_files_by_name(&self, name: &str) -> SyncResult<Vec<StrapiFile>> {
        let request = self
            .authorized(self.http.get(self.url("/api/upload/files")))
            .query(&[("populate", "folder"), ("filters[name][$eq]", name)]);
        let files = send_json::<ListEnvelope<StrapiFile>>(request)
            .await
            .map(ListEnvelope::into_items)?;
        // Some deployments ignore the filter; never trust it blindly.
        Ok(files.into_iter().filter(|f| f.name == name).collect())
    }

    async fn list_folders(&self) -> SyncResult<Vec<StrapiFolder>> {
        let request = self
            .authorized(self.http.get(self.url("/upload/folders")))
            .query(&[("populate", "parent"), ("pagination[pageSize]", "-1")]);
        send_json::<ListEnvelope<StrapiFolder>>(request)
            .await
            .map(ListEnvelope::into_items)
    }

    async fn create_folder(&self, name: &str, parent: Option<i64>) -> SyncResult<StrapiFolder> {
        let request = self
            .authorized(self.http.post(self.url("/upload/folders")))
            .json(&json!({ "name": name, "parent": parent }));
        send_json::<ItemEnvelope<StrapiFolder>>(request)
            .await
            .map(ItemEnvelope::into_item)
    }

    async fn upload_placeholder(
        &self,
        name: &str,
        folder: Option<i64>,
        payload: Bytes,
    ) -> SyncResult<StrapiFile> {
        let file_info = json!({ "name": name, "folder": folder }).to_string();
        let part = Part::stream(payload)
            .file_name(name.to_string())
            .mime_str("image/png")
            .map_err(|err| SyncError::validation(name, format!("placeholder part: {}", err)))?;
        let form = Form::new().part("files", part).text("fileInfo", file_info);
        let request = self
            .authorized(self.http.post(self.url("/api/upload")))
            .multipart(form);
        let mut uploaded = send_json::<ListEnvelope<StrapiFile>>(request)
            .await
            .map(ListEnvelope::into_items)?;
        if uploaded.is_empty() {
            return Err(SyncError::conflict(
                name,
                "upload succeeded but the CMS returned no entry",
            ));
        }
        Ok(uploaded.swap_remove(0))
    }

    async fn patch_reference(&self, id: i64, patch: &ReferencePatch) -> SyncResult<StrapiFile> {
        let request = self
            .authorized(self.http.put(self.url(&format!("/api/upload/files/{}", id))))
            .json(&reference_body(patch, &self.cfg.cdn_provider));
        send_json::<ItemEnvelope<StrapiFile>>(request)
            .await
            .map(ItemEnvelope::into_item)
    }

    async fn delete_file(&self, id: i64) -> SyncResult<()> {
        let request =
            self.authorized(self.http.delete(self.url(&format!("/api/upload/files/{}", id))));
        send_discard(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_and_wrapped_listings() {
        let bare: ListEnvelope<StrapiFolder> =
            serde_json::from_str(r#"[{"id":1,"name":"agricola","parent":null}]"#).unwrap();
        assert_eq!(bare.into_items().len(), 1);

        let wrapped: ListEnvelope<StrapiFolder> = serde_json::from_str(
            r#"{"data":[{"id":2,"name":"details","parent":{"id":1,"name":"agricola"}}]}"#,
        )
        .unwrap();
        let items = wrapped.into_items();
        assert_eq!(items[0].parent.map(Relation::id), Some(1));
    }

    #[test]
    fn decodes_files_with_null_formats() {
        let files: Vec<StrapiFile> = serde_json::from_str(
            r#"[{
                "id": 7,
                "name": "haythorne_0109.jpg",
                "url": "/uploads/haythorne_0109_abc.jpg",
                "formats": null,
                "provider": "local",
                "provider_metadata": null,
                "folder": null
            }]"#,
        )
        .unwrap();
        assert_eq!(files[0].formats, None);
        assert_eq!(files[0].folder, None);
    }

    #[test]
    fn reference_body_converts_sizes_to_kilobytes() {
        let mut formats = BTreeMap::new();
        formats.insert(
            "thumbnail".to_string(),
            MediaFormat {
                url: "https://res.cloudinary.com/demo/image/upload/c_limit,h_156,w_245/v1/a.jpg"
                    .into(),
                width: 234,
                height: 156,
                size_bytes: 10_240,
            },
        );
        let patch = ReferencePatch {
            url: "https://res.cloudinary.com/demo/image/upload/v1/a.jpg".into(),
            formats,
            provider_metadata: json!({"public_id": "a"}),
            width: 2400,
            height: 1600,
            size_bytes: 2048,
            ext: "jpg".into(),
            mime: "image/jpeg".into(),
        };
        let body = reference_body(&patch, "cloudinary");
        assert_eq!(body["provider"], "cloudinary");
        assert_eq!(body["size"], 2.0);
        assert_eq!(body["ext"], ".jpg");
        assert_eq!((body["width"].as_u64(), body["height"].as_u64()), (Some(2400), Some(1600)));
        assert_eq!(body["mime"], "image/jpeg");
        assert_eq!(body["formats"]["thumbnail"]["size"], 10.0);
        assert_eq!(body["formats"]["thumbnail"]["name"], "thumbnail_a.jpg");
    }
}
