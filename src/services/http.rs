//! Thin helpers shared by the CDN and CMS clients: one place to build the
//! reqwest client and to map responses onto [`SyncError`].

use crate::errors::{SyncError, SyncResult};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub fn build_client(timeout: Duration) -> SyncResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("media-sync/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| SyncError::TransientNetwork(format!("building HTTP client: {}", err)))
}

/// Send `request` and decode a JSON body.
pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> SyncResult<T> {
    let response = checked(request).await?;
    let url = response.url().to_string();
    let status = response.status().as_u16();
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|err| SyncError::Api {
        status,
        url,
        message: format!("could not decode response: {}", err),
    })
}

/// Send `request` and discard whatever body comes back.
pub async fn send_discard(request: RequestBuilder) -> SyncResult<()> {
    checked(request).await.map(|_| ())
}

async fn checked(request: RequestBuilder) -> SyncResult<Response> {
    let response = request.send().await?;
    let status = response.status();
    debug!("{} {}", status.as_u16(), response.url());
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::from_status(status, &url, &body))
}
