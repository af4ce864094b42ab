//! The conversion session aggregate.
//!
//! A [`Session`] is the single live workflow instance: which document is
//! loaded, what the engine called it, which options are selected and what
//! text came back. It is only ever changed through
//! [`store::SessionStore`]'s transitions; everything here is read-only.

pub mod store;

use crate::options::Options;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Where the session is in its lifecycle.
///
/// ```text
/// Empty ──▶ Uploading ──▶ Ready ◀──▶ Processing ──▶ Completed
///   ▲           │                                      │
///   └───────────┘ (upload failed)      options changed ┘──▶ Ready
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Empty,
    Uploading,
    Ready,
    Processing,
    Completed,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lifecycle::Empty => "empty",
            Lifecycle::Uploading => "uploading",
            Lifecycle::Ready => "ready",
            Lifecycle::Processing => "processing",
            Lifecycle::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// The stage an engine failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Ingestion,
    Processing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Ingestion => f.write_str("ingestion"),
            Stage::Processing => f.write_str("processing"),
        }
    }
}

/// The file the user picked. Kept for display and export naming only; its
/// bytes are never read again after the upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRef {
    pub local_handle: PathBuf,
    pub declared_name: String,
    pub size_bytes: u64,
}

/// Opaque document token issued by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The latest conversion result. Editable in place after it is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub text: String,
    /// Pages the engine reports having extracted, when it says so.
    pub pages_extracted: Option<u32>,
}

impl Artifact {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pages_extracted: None,
        }
    }
}

/// The most recent engine failure, kept until the next attempt or reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastError {
    pub stage: Stage,
    pub message: String,
}

/// Snapshot of one conversion session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub(crate) lifecycle: Lifecycle,
    pub(crate) document: Option<DocumentRef>,
    pub(crate) remote_id: Option<RemoteId>,
    pub(crate) page_count: u32,
    pub(crate) options: Options,
    pub(crate) artifact: Option<Artifact>,
    pub(crate) last_error: Option<LastError>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            lifecycle: Lifecycle::Empty,
            document: None,
            remote_id: None,
            page_count: 0,
            options: Options::default(),
            artifact: None,
            last_error: None,
        }
    }
}

impl Session {
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn document(&self) -> Option<&DocumentRef> {
        self.document.as_ref()
    }

    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.remote_id.as_ref()
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn last_error(&self) -> Option<&LastError> {
        self.last_error.as_ref()
    }

    /// True when the artifact was produced with the current options.
    ///
    /// After an options change the old artifact stays visible and editable,
    /// but it no longer reflects what a run would produce.
    pub fn artifact_is_current(&self) -> bool {
        self.lifecycle == Lifecycle::Completed && self.artifact.is_some()
    }
}
