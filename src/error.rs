//! Error types for the documinter session controller.
//!
//! Three error types reflect three distinct failure surfaces:
//!
//! * [`SessionError`] — returned by the controllers. Every variant is
//!   user-facing and recoverable: the session is left in a consistent state
//!   and the user may simply retry the action.
//!
//! * [`EngineError`] — a single failed call to the extraction engine
//!   (transport problem, non-2xx status, malformed body). Controllers wrap it
//!   into [`SessionError::Ingestion`] or [`SessionError::Processing`] after
//!   recording it on the session.
//!
//! * [`ExportError`] — copying or saving the artifact failed. Exports never
//!   touch the session, so these carry no state implications.
//!
//! Calling a store transition from the wrong lifecycle state is *not* an
//! error value: it is a controller bug and panics (see
//! [`crate::session::store::SessionStore`]).

use crate::session::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// All user-facing errors returned by the session controllers.
#[derive(Debug, Error)]
pub enum SessionError {
    // ── Validation errors (local, no network call made) ───────────────────
    /// The candidate file is not marked as a PDF document.
    #[error("'{name}' is not a PDF document (media type: {media_type})\nPlease choose a .pdf file.")]
    NotAPdf { name: String, media_type: String },

    /// The candidate file exceeds the configured upload limit.
    #[error("'{name}' is {size} bytes, which exceeds the {limit}-byte upload limit")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    /// The candidate file has no content at all.
    #[error("'{name}' is empty")]
    EmptyFile { name: String },

    /// The candidate file could not be read from disk.
    #[error("Failed to read '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Start page below 1.
    #[error("Start page must be at least 1 (got {start})")]
    StartPageTooLow { start: u32 },

    /// End page before start page.
    #[error("Invalid page range {start}-{end}: end page must be >= start page")]
    InvalidPageRange { start: u32, end: u32 },

    /// Start page beyond the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: u32, total: u32 },

    // ── Precondition errors ───────────────────────────────────────────────
    /// `submit` called while another upload is still in flight.
    #[error("An upload is already in progress")]
    UploadInFlight,

    /// `run` (or an options/artifact change) requested while processing.
    #[error("Processing is already in progress")]
    ProcessingInFlight,

    /// `submit` called when a document is already loaded; reset first.
    #[error("A document is already loaded; start over to upload another")]
    DocumentAlreadyLoaded,

    /// The operation needs an uploaded document.
    #[error("No document has been uploaded yet")]
    NoDocument,

    /// The operation needs a conversion result.
    #[error("There is no extracted text yet; run extraction first")]
    NoArtifact,

    // ── Engine errors ─────────────────────────────────────────────────────
    /// Upload to the engine failed; the session is back to empty.
    #[error("Upload failed: {message}")]
    Ingestion { message: String },

    /// Processing by the engine failed; the session is back to ready.
    #[error("Processing failed: {message}")]
    Processing { message: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SessionError {
    /// Wrap an engine failure as the error for the stage it happened in.
    pub fn from_engine(stage: Stage, err: &EngineError) -> Self {
        let message = err.user_message();
        match stage {
            Stage::Ingestion => SessionError::Ingestion { message },
            Stage::Processing => SessionError::Processing { message },
        }
    }

    /// True for local validation failures that never reached the engine.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SessionError::NotAPdf { .. }
                | SessionError::FileTooLarge { .. }
                | SessionError::EmptyFile { .. }
                | SessionError::Unreadable { .. }
                | SessionError::StartPageTooLow { .. }
                | SessionError::InvalidPageRange { .. }
                | SessionError::PageOutOfRange { .. }
        )
    }
}

/// A single failed call to the extraction engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Connection refused, DNS failure, reset, …
    #[error("Could not reach the extraction engine at {url}: {reason}\nIs the local engine running?")]
    Transport { url: String, reason: String },

    /// The request exceeded its configured timeout.
    #[error("Extraction engine did not answer within {secs}s ({url})")]
    Timeout { url: String, secs: u64 },

    /// The engine answered with a non-2xx status.
    #[error("Extraction engine returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The engine answered 2xx but the body did not match the contract.
    #[error("Malformed response from extraction engine: {0}")]
    MalformedBody(String),
}

impl EngineError {
    /// The short message surfaced to the user.
    ///
    /// For status errors this is the engine's own `detail`, which is what the
    /// user needs to see ("Only PDF files are allowed", "File not found").
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Status { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

/// Failure to export the current artifact.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Nothing to export yet.
    #[error("There is no extracted text to export")]
    NoArtifact,

    /// Could not create or write the Markdown file.
    #[error("Failed to write '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The clipboard sink rejected the text.
    #[error("Clipboard error: {0}")]
    Clipboard(String),
}
