//! [`ExtractionEngine`] over HTTP with `reqwest`.
//!
//! One shared `Client` per engine keeps the connection to the local service
//! alive between the upload and the (possibly repeated) processing calls.
//! Each route gets its own timeout: uploads are bounded by file size, while
//! clean-mode processing of a long document can legitimately take minutes.

use super::wire::{error_detail, HealthResponse, ProcessRequest, ProcessResponse, UploadResponse};
use super::{ExtractionEngine, ProcessOutput, UploadPayload, UploadReceipt};
use crate::config::EngineConfig;
use crate::error::{EngineError, SessionError};
use crate::options::Options;
use crate::session::RemoteId;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP client for the local extraction engine.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: Client,
    config: EngineConfig,
}

impl HttpEngine {
    pub fn new(config: EngineConfig) -> Result<Self, SessionError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| SessionError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Send one request and decode a 2xx JSON body into `T`.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
        timeout_secs: u64,
    ) -> Result<T, EngineError> {
        let response = request
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout {
                        url: url.to_string(),
                        secs: timeout_secs,
                    }
                } else {
                    EngineError::Transport {
                        url: url.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| EngineError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            let detail = error_detail(status.as_u16(), &String::from_utf8_lossy(&body));
            warn!("Engine {} answered HTTP {}: {}", url, status.as_u16(), detail);
            return Err(EngineError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        debug!("Engine {} answered {} ({} bytes)", url, status, body.len());
        serde_json::from_slice(&body).map_err(|e| EngineError::MalformedBody(e.to_string()))
    }
}

#[async_trait]
impl ExtractionEngine for HttpEngine {
    async fn upload(&self, payload: UploadPayload<'_>) -> Result<UploadReceipt, EngineError> {
        let url = self.config.endpoint("upload");
        info!("Uploading '{}' ({} bytes) to {}", payload.file_name, payload.bytes.len(), url);

        let part = Part::bytes(payload.bytes.to_vec())
            .file_name(payload.file_name.to_string())
            .mime_str(payload.media_type)
            .map_err(|e| EngineError::Transport {
                url: url.clone(),
                reason: format!("invalid media type '{}': {e}", payload.media_type),
            })?;
        let form = Form::new().part("file", part);

        let response: UploadResponse = self
            .send_json(
                self.client.post(&url).multipart(form),
                &url,
                self.config.upload_timeout_secs,
            )
            .await?;
        response.into_receipt()
    }

    async fn process(&self, remote_id: &RemoteId, options: &Options) -> Result<ProcessOutput, EngineError> {
        let url = self.config.endpoint("process");
        let body = ProcessRequest::new(remote_id, options);
        info!(
            "Processing {} pages {}-{:?} ({})",
            remote_id,
            options.start_page(),
            options.end_page().as_option(),
            options.mode()
        );

        let response: ProcessResponse = self
            .send_json(
                self.client.post(&url).json(&body),
                &url,
                self.config.process_timeout_secs,
            )
            .await?;
        Ok(response.into())
    }

    async fn health(&self) -> Result<String, EngineError> {
        let url = self.config.endpoint("");
        let response: HealthResponse = self
            .send_json(
                self.client.get(&url),
                &url,
                self.config.connect_timeout_secs,
            )
            .await?;
        Ok(response.message)
    }
}
