//! JSON bodies exchanged with the engine.

use super::{ProcessOutput, UploadReceipt};
use crate::error::EngineError;
use crate::options::{ExtractionMode, Options};
use crate::session::RemoteId;
use serde::{Deserialize, Serialize};

/// `POST /process` request body.
#[derive(Debug, Serialize)]
pub struct ProcessRequest<'a> {
    pub file_id: &'a str,
    pub options: WireOptions,
}

impl<'a> ProcessRequest<'a> {
    pub fn new(remote_id: &'a RemoteId, options: &Options) -> Self {
        Self {
            file_id: remote_id.as_str(),
            options: WireOptions::from(options),
        }
    }
}

/// Options as the engine spells them. An open-ended range omits `end_page`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireOptions {
    pub start_page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_page: Option<u32>,
    pub mode: ExtractionMode,
}

impl From<&Options> for WireOptions {
    fn from(o: &Options) -> Self {
        Self {
            start_page: o.start_page(),
            end_page: o.end_page().as_option(),
            mode: o.mode(),
        }
    }
}

/// `POST /upload` success body.
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub filename: String,
    pub page_count: u32,
}

impl UploadResponse {
    pub fn into_receipt(self) -> Result<UploadReceipt, EngineError> {
        if self.file_id.trim().is_empty() {
            return Err(EngineError::MalformedBody("upload response has an empty file_id".into()));
        }
        Ok(UploadReceipt {
            remote_id: RemoteId::new(self.file_id),
            filename: self.filename,
            page_count: self.page_count,
        })
    }
}

/// `POST /process` success body. Extra fields (`id`, `filename`, `metadata`) are ignored.
#[derive(Debug, Deserialize)]
pub struct ProcessResponse {
    pub markdown_content: String,
    #[serde(default)]
    pub page_count: Option<u32>,
}

impl From<ProcessResponse> for ProcessOutput {
    fn from(r: ProcessResponse) -> Self {
        Self {
            markdown: r.markdown_content,
            page_count: r.page_count,
        }
    }
}

/// `GET /` body.
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}

/// Error body. Usually `{ "detail": "..." }`, but request-validation
/// failures carry a list of problems under `detail`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Best human-readable message for a non-2xx response body.
pub fn error_detail(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => format!("HTTP {status}"),
    }
}
