//! # documinter
//!
//! Client-side session controller for converting PDF documents to Markdown
//! through a local extraction engine.
//!
//! The engine (a separate HTTP service) does the actual text extraction. This
//! crate owns everything around it: which document is loaded, which pages
//! and mode are selected, what the engine produced, and the rules for moving
//! between those states when uploads and runs succeed, fail, overlap, or get
//! overtaken by a reset.
//!
//! ## Session Flow
//!
//! ```text
//! CandidateFile
//!  │
//!  ├─ 1. Ingest   validate locally, POST /upload      Empty → Uploading → Ready
//!  ├─ 2. Options  page range + mode                    Completed → Ready on change
//!  ├─ 3. Process  POST /process                        Ready → Processing → Completed
//!  └─ 4. Artifact view, edit in place, copy, save      Completed
//! ```
//!
//! One [`SessionHandle`] is created per process and injected into every
//! controller. A reset at any time returns the session to `Empty`; engine
//! answers that arrive afterwards are recognised by their generation and
//! dropped.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use documinter::{
//!     ArtifactEditor, CandidateFile, EngineConfig, HttpEngine, IngestionController,
//!     ProcessingController, SessionHandle,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default();
//!     let engine = Arc::new(HttpEngine::new(config.clone())?);
//!     let session = SessionHandle::default();
//!
//!     let ingest = IngestionController::new(session.clone(), engine.clone(), &config);
//!     let process = ProcessingController::new(session.clone(), engine);
//!     let editor = ArtifactEditor::new(session.clone());
//!
//!     ingest.submit(&CandidateFile::open("report.pdf").await?).await?;
//!     process.run().await?;
//!     let path = editor.download_as_file(".").await?;
//!     eprintln!("saved {}", path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `documinter` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod clipboard;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod observer;
pub mod options;
pub mod process;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::{export_file_name, ArtifactEditor, RenderedView};
pub use clipboard::{Clipboard, MemoryClipboard, Osc52Clipboard};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use engine::{ExtractionEngine, HttpEngine, ProcessOutput, UploadPayload, UploadReceipt};
pub use error::{EngineError, ExportError, SessionError};
pub use ingest::{CandidateFile, IngestionController};
pub use observer::{NoopObserver, SessionObserver};
pub use options::{ExtractionMode, Options, OptionsPatch, PageBound};
pub use process::ProcessingController;
pub use session::store::{Completion, Generation, InvalidTransition, Operation, SessionHandle, SessionStore};
pub use session::{Artifact, DocumentRef, LastError, Lifecycle, RemoteId, Session, Stage};
