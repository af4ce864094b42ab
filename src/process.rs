//! Processing: turn the uploaded document into text with the current options.
//!
//! [`ProcessingController::run`] owns the `Ready | Completed → Processing →
//! Completed` path. Only one run can be in flight: the lifecycle check and
//! the `begin_process` transition happen under one store lock, so a second
//! `run` issued before the first resolves sees `Processing` and is rejected
//! without touching the network.
//!
//! [`ProcessingController::configure`] is the only way options change; it is
//! refused while a run is in flight so a completion can never be attributed
//! to options it was not produced with.

use crate::engine::ExtractionEngine;
use crate::error::SessionError;
use crate::options::OptionsPatch;
use crate::session::store::{Completion, SessionHandle};
use crate::session::{Artifact, Lifecycle, Stage};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Drives processing runs and option changes.
#[derive(Clone)]
pub struct ProcessingController {
    session: SessionHandle,
    engine: Arc<dyn ExtractionEngine>,
}

impl ProcessingController {
    pub fn new(session: SessionHandle, engine: Arc<dyn ExtractionEngine>) -> Self {
        Self { session, engine }
    }

    /// Apply a partial options update.
    ///
    /// A completed session drops back to `Ready` when the options actually
    /// change; its artifact stays available but is no longer current.
    pub fn configure(&self, patch: OptionsPatch) -> Result<(), SessionError> {
        self.session.update(|store| match store.lifecycle() {
            Lifecycle::Ready | Lifecycle::Completed => store.update_options(&patch),
            Lifecycle::Processing => Err(SessionError::ProcessingInFlight),
            Lifecycle::Uploading => Err(SessionError::UploadInFlight),
            Lifecycle::Empty => Err(SessionError::NoDocument),
        })
    }

    /// Run extraction with the session's current options.
    ///
    /// # Returns
    /// - `Ok(Completion::Applied(artifact))` — the session is `Completed`.
    /// - `Ok(Completion::Stale)` — the session was reset during the call.
    ///
    /// # Errors
    /// - [`SessionError::ProcessingInFlight`] — another run owns the session.
    /// - [`SessionError::NoDocument`] / [`SessionError::UploadInFlight`] —
    ///   nothing to process yet.
    /// - [`SessionError::Processing`] — the engine call failed; the session is
    ///   back to `Ready` with its options intact.
    pub async fn run(&self) -> Result<Completion<Artifact>, SessionError> {
        let (generation, remote_id, options) = self.session.update(|store| {
            match store.lifecycle() {
                Lifecycle::Processing => return Err(SessionError::ProcessingInFlight),
                Lifecycle::Uploading => return Err(SessionError::UploadInFlight),
                Lifecycle::Empty => return Err(SessionError::NoDocument),
                Lifecycle::Ready | Lifecycle::Completed => {}
            }
            let session = store.session();
            let remote_id = session.remote_id().cloned().ok_or(SessionError::NoDocument)?;
            let options = *session.options();
            options.validate()?;
            Ok((store.begin_process(), remote_id, options))
        })?;

        let start = Instant::now();
        let result = self.engine.process(&remote_id, &options).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        self.session.update(|store| {
            if !store.is_current(generation) {
                warn!("Dropping processing result for {}: session was reset", remote_id);
                store.notify_stale(Stage::Processing);
                return Ok(Completion::Stale);
            }
            match result {
                Ok(output) => {
                    info!(
                        "Processing complete: {} chars in {}ms",
                        output.markdown.len(),
                        elapsed_ms
                    );
                    let artifact = Artifact {
                        text: output.markdown,
                        pages_extracted: output.page_count,
                    };
                    store.complete_process(artifact.clone());
                    Ok(Completion::Applied(artifact))
                }
                Err(e) => {
                    warn!("Processing {} failed after {}ms: {}", remote_id, elapsed_ms, e);
                    store.fail_at(Stage::Processing, e.user_message());
                    Err(SessionError::from_engine(Stage::Processing, &e))
                }
            }
        })
    }
}
