//! HTTP client for the Kollus upload API.
//!
//! [`UploadClient`] issues the three calls of an upload: create a destination,
//! transfer the file, read processing progress. [`ProgressMonitor`] polls a
//! progress address on a timer and reports through callbacks. The two are
//! independent; callers compose them.

pub mod api;
pub mod monitor;

use kollus_core::{ClientConfig, UploadError, UploadResult, UploadVariant};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;

pub use api::destination_form_fields;
pub use monitor::{MonitorOptions, ProgressMonitor, ProgressSource};

/// Path of the destination endpoint on the API host (normal uploads).
pub const API_CREATE_URL_PATH: &str = "/api/upload/create-url";
/// Path of the destination endpoint on the upload host (passthrough, filelive).
pub const UPLOAD_CREATE_URL_PATH: &str = "/api/v1/create_url";

/// HTTP client for the upload protocol. Cheap to clone.
#[derive(Clone)]
pub struct UploadClient {
    client: Client,
    api_base_url: String,
    upload_base_url: String,
    access_token: String,
}

impl fmt::Debug for UploadClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadClient")
            .field("api_base_url", &self.api_base_url)
            .field("upload_base_url", &self.upload_base_url)
            .finish()
    }
}

impl UploadClient {
    /// Client against the default production hosts.
    pub fn new(access_token: impl Into<String>) -> UploadResult<Self> {
        Self::from_config(&ClientConfig::new(access_token))
    }

    pub fn from_config(config: &ClientConfig) -> UploadResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.http_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| UploadError::transport("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            upload_base_url: config.upload_base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    /// Create client from KOLLUS_* environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = ClientConfig::from_env()?;
        Ok(Self::from_config(&config)?)
    }

    /// Point the client at other hosts (staging, test servers).
    pub fn with_base_urls(mut self, api_base_url: &str, upload_base_url: &str) -> Self {
        self.api_base_url = api_base_url.trim_end_matches('/').to_string();
        self.upload_base_url = upload_base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn upload_base_url(&self) -> &str {
        &self.upload_base_url
    }

    /// Destination endpoint for a variant, without credentials.
    pub fn destination_endpoint(&self, variant: UploadVariant) -> String {
        if variant.uses_upload_host() {
            format!("{}{}", self.upload_base_url, UPLOAD_CREATE_URL_PATH)
        } else {
            format!("{}{}", self.api_base_url, API_CREATE_URL_PATH)
        }
    }

    /// Destination endpoint with the access token appended.
    fn authorized_destination_url(&self, variant: UploadVariant) -> String {
        format!(
            "{}?access_token={}",
            self.destination_endpoint(variant),
            urlencoding::encode(&self.access_token)
        )
    }

    /// POST a multipart form and collect the status and body.
    async fn post_multipart(
        &self,
        url: &str,
        form: reqwest::multipart::Form,
        operation: &str,
    ) -> UploadResult<RawResponse> {
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::transport(format!("Failed to send {} request", operation), e))?;

        RawResponse::read(response, operation).await
    }

    /// GET without credentials and collect the status and body.
    async fn get(&self, url: &str, operation: &str) -> UploadResult<RawResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UploadError::transport(format!("Failed to send {} request", operation), e))?;

        RawResponse::read(response, operation).await
    }
}

/// Status and body of a response, decoded separately so each call decides
/// how an undecodable body is reported.
struct RawResponse {
    status: StatusCode,
    body: String,
    operation: String,
}

impl RawResponse {
    async fn read(response: reqwest::Response, operation: &str) -> UploadResult<Self> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::transport(format!("Failed to read {} response", operation), e))?;

        Ok(Self {
            status,
            body,
            operation: operation.to_string(),
        })
    }

    /// Decode the body whatever the status. An undecodable body is a
    /// transport error.
    fn json<T: DeserializeOwned>(&self) -> UploadResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            UploadError::transport(
                format!(
                    "Failed to parse {} response as JSON (status {})",
                    self.operation, self.status
                ),
                e,
            )
        })
    }

    /// Like [`json`](Self::json), but an undecodable body on a non-success
    /// status is a rejection carrying the HTTP status code.
    fn json_or_rejection<T: DeserializeOwned>(&self) -> UploadResult<T> {
        match serde_json::from_str(&self.body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !self.status.is_success() => Err(UploadError::rejected(
                Some(i64::from(self.status.as_u16())),
                format!(
                    "{} request failed with status {}: {}",
                    self.operation, self.status, self.body
                ),
            )),
            Err(_) => self.json(),
        }
    }
}
