use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::naming::ContentUploadParams;
use super::types::{BundleHandle, BundleMetadata, UploadTarget};
use crate::config::UploaderConfig;
use crate::error::{ServiceErrorKind, UploadError};

/// The two calls an upload needs from the bundle service.
#[async_trait]
pub trait BundleService: Send + Sync {
    fn create_bundle_url(&self, target: &UploadTarget) -> String;

    fn contents_url(&self, handle: &BundleHandle) -> String;

    async fn create_bundle(
        &self,
        target: &UploadTarget,
        metadata: &BundleMetadata,
    ) -> Result<BundleHandle, UploadError>;

    async fn upload_contents(
        &self,
        handle: &BundleHandle,
        params: &ContentUploadParams,
        bytes: Vec<u8>,
    ) -> Result<(), UploadError>;
}

#[derive(Serialize)]
struct CreateBundleRequest<'a> {
    data: [BundleResource<'a>; 1],
}

#[derive(Serialize)]
struct BundleResource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    attributes: BundleAttributes<'a>,
}

#[derive(Serialize)]
struct BundleAttributes<'a> {
    bundle_type: &'static str,
    metadata: &'a BundleMetadata,
}

impl<'a> CreateBundleRequest<'a> {
    fn dataset(metadata: &'a BundleMetadata) -> Self {
        Self {
            data: [BundleResource {
                kind: "bundles",
                attributes: BundleAttributes {
                    bundle_type: "dataset",
                    metadata,
                },
            }],
        }
    }
}

#[derive(Deserialize)]
struct CreateBundleResponse {
    data: Vec<CreatedResource>,
}

#[derive(Deserialize)]
struct CreatedResource {
    id: String,
}

#[derive(Clone)]
pub struct RestBundleClient {
    http: Client,
    base_url: String,
    headers: HeaderMap,
}

impl RestBundleClient {
    pub fn new(config: &UploaderConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.auth_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(Self {
            http: Client::builder().build()?,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    fn bundles_url(&self, target: &UploadTarget) -> Result<Url, url::ParseError> {
        let mut params = vec![("worksheet", target.worksheet_uuid.clone())];
        if let Some(key) = target.after_sort_key {
            params.push(("after_sort_key", key.to_string()));
        }
        Url::parse_with_params(&format!("{}/bundles", self.base_url), &params)
    }

    fn create_request(&self, url: Url, metadata: &BundleMetadata) -> RequestBuilder {
        self.http
            .post(url)
            .headers(self.headers.clone())
            .json(&CreateBundleRequest::dataset(metadata))
    }

    fn contents_request(
        &self,
        handle: &BundleHandle,
        params: &ContentUploadParams,
        bytes: Vec<u8>,
    ) -> RequestBuilder {
        self.http
            .put(self.contents_url(handle))
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, "application/octet-stream")
            .query(params)
            .body(bytes)
    }

    async fn failure_text(response: Response) -> String {
        let status = response.status();
        let kind = ServiceErrorKind::from_status(status);
        let body = response.text().await.unwrap_or_default();
        warn!(?kind, %status, "Bundle service rejected request");
        failure_message(status, body)
    }
}

/// Raw response text, or the status line when the body is empty.
fn failure_message(status: StatusCode, body: String) -> String {
    if body.trim().is_empty() {
        status.to_string()
    } else {
        body
    }
}

#[async_trait]
impl BundleService for RestBundleClient {
    fn create_bundle_url(&self, target: &UploadTarget) -> String {
        match self.bundles_url(target) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}/bundles", self.base_url),
        }
    }

    fn contents_url(&self, handle: &BundleHandle) -> String {
        format!("{}/bundles/{}/contents/blob/", self.base_url, handle)
    }

    async fn create_bundle(
        &self,
        target: &UploadTarget,
        metadata: &BundleMetadata,
    ) -> Result<BundleHandle, UploadError> {
        let display_url = self.create_bundle_url(target);
        let url = self
            .bundles_url(target)
            .map_err(|e| UploadError::MetadataCreation {
                url: display_url.clone(),
                message: format!("Invalid server URL: {}", e),
            })?;

        debug!("POST {}", url);
        let response = self
            .create_request(url, metadata)
            .send()
            .await
            .map_err(|e| UploadError::MetadataCreation {
                url: display_url.clone(),
                message: format!("Failed to send request: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(UploadError::MetadataCreation {
                url: display_url,
                message: Self::failure_text(response).await,
            });
        }

        let body: CreateBundleResponse =
            response
                .json()
                .await
                .map_err(|e| UploadError::MetadataCreation {
                    url: display_url.clone(),
                    message: format!("Failed to parse response: {}", e),
                })?;

        let handle = body
            .data
            .into_iter()
            .next()
            .map(|resource| BundleHandle(resource.id))
            .ok_or(UploadError::MissingBundleId { url: display_url })?;

        info!("Created bundle {} ({})", handle, metadata.name);
        Ok(handle)
    }

    async fn upload_contents(
        &self,
        handle: &BundleHandle,
        params: &ContentUploadParams,
        bytes: Vec<u8>,
    ) -> Result<(), UploadError> {
        let url = self.contents_url(handle);
        let size = bytes.len();

        debug!("PUT {} ({} bytes)", url, size);
        let response = self
            .contents_request(handle, params, bytes)
            .send()
            .await
            .map_err(|e| UploadError::ContentUpload {
                url: url.clone(),
                message: format!("Failed to send request: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(UploadError::ContentUpload {
                url,
                message: Self::failure_text(response).await,
            });
        }

        info!("Uploaded {} bytes to bundle {}", size, handle);
        Ok(())
    }
}
