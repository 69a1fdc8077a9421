//! In-memory CDN and CMS doubles for unit and workflow tests.

use super::{
    cdn::{CdnApi, CdnFolder, CdnFolderPage, CdnResource, CdnResourcePage},
    cms::{CmsApi, Relation, StrapiFile, StrapiFolder, StrapiFormat, kilobytes},
};
use crate::{
    errors::{SyncError, SyncResult},
    models::{action::ReferencePatch, parent_path},
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Mutex,
};

pub const ROOT: &str = "beckwithbarrow";

/// A listing record as the Admin API would return it for `public_id`.
pub fn resource(public_id: &str) -> CdnResource {
    CdnResource {
        public_id: public_id.to_string(),
        asset_folder: None,
        folder: None,
        format: "jpg".into(),
        version: 1_700_000_000,
        width: 2400,
        height: 1600,
        bytes: 512_000,
        secure_url: format!(
            "https://res.cloudinary.com/demo/image/upload/v1700000000/{}.jpg",
            public_id
        ),
    }
}

#[derive(Default)]
struct CdnState {
    resources: BTreeMap<String, CdnResource>,
    folders: BTreeSet<String>,
    fail_next: u32,
    resource_calls: u32,
}

#[derive(Default)]
pub struct FakeCdn {
    page_size: Option<usize>,
    state: Mutex<CdnState>,
}

impl FakeCdn {
    /// Force pages smaller than the reader asks for.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: Some(page_size),
            ..Default::default()
        }
    }

    /// Add an image under the root: `folder` is relative, `variants` are
    /// size-class prefixes such as `"thumbnail"`.
    pub fn add_image(&self, folder: &str, basename: &str, with_original: bool, variants: &[&str]) {
        let dir = if folder.is_empty() {
            ROOT.to_string()
        } else {
            format!("{}/{}", ROOT, folder)
        };
        let mut names: Vec<String> = variants
            .iter()
            .map(|v| format!("{}_{}", v, basename))
            .collect();
        if with_original {
            names.push(basename.to_string());
        }

        let mut state = self.state.lock().unwrap();
        for name in names {
            let mut res = resource(&format!("{}/{}", dir, name));
            res.asset_folder = Some(dir.clone());
            state.resources.insert(res.public_id.clone(), res);
        }
        drop(state);
        self.add_folder(&dir);
    }

    /// Register a folder (full path) and its ancestors.
    pub fn add_folder(&self, path: &str) {
        let mut state = self.state.lock().unwrap();
        let mut current = path;
        while !current.is_empty() {
            state.folders.insert(current.to_string());
            current = parent_path(current);
        }
    }

    pub fn fail_next_resource_calls(&self, count: u32) {
        self.state.lock().unwrap().fail_next = count;
    }

    pub fn resource_calls(&self) -> u32 {
        self.state.lock().unwrap().resource_calls
    }
}

#[async_trait]
impl CdnApi for FakeCdn {
    async fn list_resources(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> SyncResult<CdnResourcePage> {
        let mut state = self.state.lock().unwrap();
        state.resource_calls += 1;
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(SyncError::TransientNetwork("503 from fake CDN".into()));
        }

        let size = self.page_size.unwrap_or(page_size as usize);
        let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or_default();
        let matching: Vec<&CdnResource> = state
            .resources
            .values()
            .filter(|r| r.public_id.starts_with(prefix))
            .collect();
        let resources = matching.iter().skip(start).take(size).map(|r| (*r).clone()).collect();
        let next_cursor = (start + size < matching.len()).then(|| (start + size).to_string());
        Ok(CdnResourcePage {
            resources,
            next_cursor,
        })
    }

    async fn list_subfolders(
        &self,
        path: &str,
        _cursor: Option<&str>,
        _page_size: u32,
    ) -> SyncResult<CdnFolderPage> {
        let state = self.state.lock().unwrap();
        let folders = state
            .folders
            .iter()
            .filter(|f| f.as_str() != path && parent_path(f) == path)
            .map(|f| CdnFolder {
                name: f.rsplit('/').next().unwrap_or_default().to_string(),
                path: f.clone(),
            })
            .collect();
        Ok(CdnFolderPage {
            folders,
            next_cursor: None,
        })
    }
}

#[derive(Default)]
struct CmsState {
    last_id: i64,
    files: BTreeMap<i64, StrapiFile>,
    folders: BTreeMap<i64, StrapiFolder>,
    mutations: u32,
    fail_patches: bool,
    race_next_folder: bool,
    writes_before_denial: Option<u32>,
    denied_writes: u32,
    rejected_deletes: BTreeSet<i64>,
}

impl CmsState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    /// Gate every write on the token still being allowed to write.
    fn authorize_write(&mut self) -> SyncResult<()> {
        match self.writes_before_denial {
            Some(0) => {
                self.denied_writes += 1;
                Err(SyncError::Auth("403 Forbidden from fake CMS".into()))
            }
            Some(left) => {
                self.writes_before_denial = Some(left - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct FakeCms {
    state: Mutex<CmsState>,
}

impl FakeCms {
    pub fn add_folder(&self, name: &str, parent: Option<i64>) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.folders.insert(
            id,
            StrapiFolder {
                id,
                name: name.into(),
                parent: parent.map(Relation::Id),
            },
        );
        id
    }

    pub fn add_native_file(&self, name: &str, folder: Option<i64>) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.files.insert(id, native_file(id, name, folder));
        id
    }

    pub fn file(&self, id: i64) -> Option<StrapiFile> {
        self.state.lock().unwrap().files.get(&id).cloned()
    }

    pub fn files(&self) -> Vec<StrapiFile> {
        self.state.lock().unwrap().files.values().cloned().collect()
    }

    pub fn folders(&self) -> Vec<StrapiFolder> {
        self.state.lock().unwrap().folders.values().cloned().collect()
    }

    /// Writes performed through the API since construction.
    pub fn mutations(&self) -> u32 {
        self.state.lock().unwrap().mutations
    }

    pub fn fail_patches(&self, fail: bool) {
        self.state.lock().unwrap().fail_patches = fail;
    }

    /// The next `create_folder` finds that someone else created the folder
    /// between our check and our write.
    pub fn race_next_folder_creation(&self) {
        self.state.lock().unwrap().race_next_folder = true;
    }

    /// Allow `count` more writes, then answer every write with `Auth`.
    pub fn deny_writes_after(&self, count: u32) {
        self.state.lock().unwrap().writes_before_denial = Some(count);
    }

    /// Write calls answered with `Auth`.
    pub fn denied_writes(&self) -> u32 {
        self.state.lock().unwrap().denied_writes
    }

    /// Deleting `id` fails with a non-retryable API error.
    pub fn reject_delete_of(&self, id: i64) {
        self.state.lock().unwrap().rejected_deletes.insert(id);
    }
}

fn native_file(id: i64, name: &str, folder: Option<i64>) -> StrapiFile {
    StrapiFile {
        id,
        name: name.into(),
        url: format!("/uploads/{}", name),
        formats: None,
        provider: "local".into(),
        provider_metadata: None,
        folder: folder.map(|id| Relation::Object { id }),
    }
}

#[async_trait]
impl CmsApi for FakeCms {
    async fn list_files(&self, start: usize, limit: usize) -> SyncResult<Vec<StrapiFile>> {
        let state = self.state.lock().unwrap();
        Ok(state.files.values().skip(start).take(limit).cloned().collect())
    }

    async fn find_files_by_name(&self, name: &str) -> SyncResult<Vec<StrapiFile>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .values()
            .filter(|f| f.name == name)
            .cloned()
            .collect())
    }

    async fn list_folders(&self) -> SyncResult<Vec<StrapiFolder>> {
        Ok(self.state.lock().unwrap().folders.values().cloned().collect())
    }

    async fn create_folder(&self, name: &str, parent: Option<i64>) -> SyncResult<StrapiFolder> {
        let mut state = self.state.lock().unwrap();
        state.authorize_write()?;
        let raced = std::mem::take(&mut state.race_next_folder);
        let exists = state
            .folders
            .values()
            .any(|f| f.name == name && f.parent.map(Relation::id) == parent);
        if exists || raced {
            if raced && !exists {
                let id = state.next_id();
                state.folders.insert(
                    id,
                    StrapiFolder {
                        id,
                        name: name.into(),
                        parent: parent.map(Relation::Id),
                    },
                );
            }
            return Err(SyncError::conflict(
                format!("folder `{}`", name),
                "a folder with this name already exists",
            ));
        }
        let id = state.next_id();
        let folder = StrapiFolder {
            id,
            name: name.into(),
            parent: parent.map(Relation::Id),
        };
        state.folders.insert(id, folder.clone());
        state.mutations += 1;
        Ok(folder)
    }

    async fn upload_placeholder(
        &self,
        name: &str,
        folder: Option<i64>,
        payload: Bytes,
    ) -> SyncResult<StrapiFile> {
        if payload.is_empty() {
            return Err(SyncError::validation(name, "empty upload"));
        }
        let mut state = self.state.lock().unwrap();
        state.authorize_write()?;
        let id = state.next_id();
        let file = native_file(id, name, folder);
        state.files.insert(id, file.clone());
        state.mutations += 1;
        Ok(file)
    }

    async fn patch_reference(&self, id: i64, patch: &ReferencePatch) -> SyncResult<StrapiFile> {
        let mut state = self.state.lock().unwrap();
        state.authorize_write()?;
        if state.fail_patches {
            return Err(SyncError::Api {
                status: 400,
                url: format!("/api/upload/files/{}", id),
                message: "patch rejected".into(),
            });
        }
        let Some(file) = state.files.get_mut(&id) else {
            return Err(SyncError::NotFound(format!("/api/upload/files/{}", id)));
        };
        file.url = patch.url.clone();
        file.formats = Some(
            patch
                .formats
                .iter()
                .map(|(key, format)| {
                    (
                        key.clone(),
                        StrapiFormat {
                            url: format.url.clone(),
                            width: Some(format.width),
                            height: Some(format.height),
                            size: Some(kilobytes(format.size_bytes)),
                        },
                    )
                })
                .collect(),
        );
        file.provider = "cloudinary".into();
        file.provider_metadata = Some(patch.provider_metadata.clone());
        let patched = file.clone();
        state.mutations += 1;
        Ok(patched)
    }

    async fn delete_file(&self, id: i64) -> SyncResult<()> {
        let mut state = self.state.lock().unwrap();
        state.authorize_write()?;
        if state.rejected_deletes.contains(&id) {
            return Err(SyncError::Api {
                status: 400,
                url: format!("/api/upload/files/{}", id),
                message: "delete rejected".into(),
            });
        }
        if state.files.remove(&id).is_none() {
            return Err(SyncError::NotFound(format!("/api/upload/files/{}", id)));
        }
        state.mutations += 1;
        Ok(())
    }
}
