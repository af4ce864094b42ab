//! Ingestion: validate a picked file and upload it to the engine.
//!
//! Validation happens entirely locally, before the session is touched: a
//! file that is not marked as a PDF, is empty, is over the upload limit, or
//! whose content does not start with the `%PDF` magic never reaches the
//! engine. Only then does [`IngestionController::submit`] move the session to
//! `Uploading` and make its single network call.

use crate::config::EngineConfig;
use crate::engine::{ExtractionEngine, UploadPayload, UploadReceipt};
use crate::error::SessionError;
use crate::session::store::{Completion, SessionHandle};
use crate::session::{DocumentRef, Lifecycle, Stage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Media type a candidate must declare.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// First bytes of every PDF file.
const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A file the user picked, not yet uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub local_handle: PathBuf,
    pub declared_name: String,
    /// Media type as declared by whatever picked the file.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl CandidateFile {
    pub fn new(
        local_handle: impl Into<PathBuf>,
        declared_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            local_handle: local_handle.into(),
            declared_name: declared_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a file from disk; its media type is guessed from the extension,
    /// the same way a browser fills in `File.type`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| SessionError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        let declared_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        debug!("Opened {} ({} bytes, {})", path.display(), bytes.len(), media_type);
        Ok(Self::new(path, declared_name, media_type, bytes))
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// True if the declared media type is PDF (parameters such as
    /// `; charset=…` are ignored).
    pub fn is_marked_pdf(&self) -> bool {
        self.media_type
            .split(';')
            .next()
            .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_MEDIA_TYPE))
            .unwrap_or(false)
    }

    /// Local checks; no network, no session change.
    pub fn validate(&self, max_upload_bytes: u64) -> Result<(), SessionError> {
        if !self.is_marked_pdf() {
            return Err(SessionError::NotAPdf {
                name: self.declared_name.clone(),
                media_type: self.media_type.clone(),
            });
        }
        if self.bytes.is_empty() {
            return Err(SessionError::EmptyFile {
                name: self.declared_name.clone(),
            });
        }
        if self.size_bytes() > max_upload_bytes {
            return Err(SessionError::FileTooLarge {
                name: self.declared_name.clone(),
                size: self.size_bytes(),
                limit: max_upload_bytes,
            });
        }
        if !self.bytes.starts_with(PDF_MAGIC) {
            return Err(SessionError::NotAPdf {
                name: self.declared_name.clone(),
                media_type: format!("{} (content does not start with %PDF)", self.media_type),
            });
        }
        Ok(())
    }

    fn document_ref(&self) -> DocumentRef {
        DocumentRef {
            local_handle: self.local_handle.clone(),
            declared_name: self.declared_name.clone(),
            size_bytes: self.size_bytes(),
        }
    }

    fn payload(&self) -> UploadPayload<'_> {
        UploadPayload {
            file_name: &self.declared_name,
            media_type: PDF_MEDIA_TYPE,
            bytes: &self.bytes,
        }
    }
}

/// Drives `Empty → Uploading → Ready` (or back to `Empty` on failure).
#[derive(Clone)]
pub struct IngestionController {
    session: SessionHandle,
    engine: Arc<dyn ExtractionEngine>,
    max_upload_bytes: u64,
}

impl IngestionController {
    pub fn new(session: SessionHandle, engine: Arc<dyn ExtractionEngine>, config: &EngineConfig) -> Self {
        Self {
            session,
            engine,
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Validate `file` and upload it.
    ///
    /// # Returns
    /// - `Ok(Completion::Applied(receipt))` — the session is `Ready`.
    /// - `Ok(Completion::Stale)` — the session was reset while the upload was
    ///   in flight; the engine's answer was dropped.
    ///
    /// # Errors
    /// - Validation errors: nothing was sent and the session is unchanged.
    /// - [`SessionError::UploadInFlight`] / [`SessionError::DocumentAlreadyLoaded`]:
    ///   the session is not `Empty`; the first upload keeps ownership.
    /// - [`SessionError::Ingestion`]: the engine call failed and the session
    ///   is back to `Empty`.
    pub async fn submit(&self, file: &CandidateFile) -> Result<Completion<UploadReceipt>, SessionError> {
        file.validate(self.max_upload_bytes)?;

        let generation = self.session.update(|store| match store.lifecycle() {
            Lifecycle::Empty => Ok(store.begin_upload(file.document_ref())),
            Lifecycle::Uploading => Err(SessionError::UploadInFlight),
            Lifecycle::Ready | Lifecycle::Processing | Lifecycle::Completed => {
                Err(SessionError::DocumentAlreadyLoaded)
            }
        })?;

        info!("Uploading {} ({} bytes)", file.declared_name, file.size_bytes());
        let result = self.engine.upload(file.payload()).await;

        self.session.update(|store| {
            if !store.is_current(generation) {
                warn!("Dropping upload result for {}: session was reset", file.declared_name);
                store.notify_stale(Stage::Ingestion);
                return Ok(Completion::Stale);
            }
            match result {
                Ok(receipt) => {
                    info!(
                        "Upload complete: {} → {} ({} pages)",
                        receipt.filename, receipt.remote_id, receipt.page_count
                    );
                    store.complete_upload(
                        receipt.remote_id.clone(),
                        receipt.filename.clone(),
                        receipt.page_count,
                    );
                    Ok(Completion::Applied(receipt))
                }
                Err(e) => {
                    warn!("Upload of {} failed: {}", file.declared_name, e);
                    store.fail_at(Stage::Ingestion, e.user_message());
                    Err(SessionError::from_engine(Stage::Ingestion, &e))
                }
            }
        })
    }
}
