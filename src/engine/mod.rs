//! The extraction engine: the one external collaborator.
//!
//! The engine is a separate local HTTP service that does the actual PDF→text
//! work. The controllers only ever see it through [`ExtractionEngine`], so
//! tests can substitute an in-process fake and embedders can route calls
//! through whatever transport they like. [`HttpEngine`] is the real client.
//!
//! ## Contract
//!
//! ```text
//! POST /upload   multipart `file`          → { file_id, filename, page_count }
//! POST /process  { file_id, options }      → { markdown_content, … }
//! GET  /                                   → { message }
//! non-2xx                                  → { detail }
//! ```

pub mod http;
pub mod wire;

use crate::error::EngineError;
use crate::options::Options;
use crate::session::RemoteId;
use async_trait::async_trait;

pub use http::HttpEngine;

/// The bytes sent to `/upload`.
#[derive(Debug, Clone, Copy)]
pub struct UploadPayload<'a> {
    pub file_name: &'a str,
    pub media_type: &'a str,
    pub bytes: &'a [u8],
}

/// What the engine answered to a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub remote_id: RemoteId,
    pub filename: String,
    pub page_count: u32,
}

/// What the engine answered to a successful processing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub markdown: String,
    /// Pages actually extracted, if the engine reports it.
    pub page_count: Option<u32>,
}

/// A client for the extraction engine.
///
/// Each method performs exactly one request; there is no retry.
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Upload a document and receive its engine-side id and page count.
    async fn upload(&self, payload: UploadPayload<'_>) -> Result<UploadReceipt, EngineError>;

    /// Extract text from a previously uploaded document.
    async fn process(&self, remote_id: &RemoteId, options: &Options) -> Result<ProcessOutput, EngineError>;

    /// Ask the engine whether it is up; returns its status message.
    async fn health(&self) -> Result<String, EngineError>;
}
