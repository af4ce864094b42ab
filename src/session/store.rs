//! The session state machine and the handle controllers share.
//!
//! [`SessionStore`] owns the one [`Session`] value and applies transitions:
//!
//! ```text
//! Empty      --begin_upload------------> Uploading
//! Uploading  --complete_upload---------> Ready
//! Uploading  --fail_at(Ingestion)------> Empty
//! Ready      --update_options----------> Ready
//! Ready      --begin_process-----------> Processing
//! Processing --complete_process--------> Completed
//! Processing --fail_at(Processing)-----> Ready
//! Completed  --update_options----------> Ready
//! Completed  --edit_artifact-----------> Completed
//! Completed  --begin_process-----------> Processing
//! any        --reset-------------------> Empty
//! ```
//!
//! A transition requested from a state outside its source set panics with
//! [`InvalidTransition`]: the controllers check the lifecycle before they
//! transition, so reaching one means a controller is broken.
//!
//! Every `begin_*` and `reset` advances the [`Generation`]. Controllers hold
//! on to the generation their operation started under and only apply the
//! completion if it is still current.

use super::{Artifact, DocumentRef, LastError, Lifecycle, RemoteId, Session, Stage};
use crate::error::SessionError;
use crate::observer::{SessionObserver, SharedObserver};
use crate::options::{Options, OptionsPatch};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

/// Monotonic identity of the session's current operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Outcome of an asynchronous operation whose completion may be superseded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T> {
    /// The result was applied to the session.
    Applied(T),
    /// The session was reset (or moved on) while the call was in flight;
    /// the result was dropped.
    Stale,
}

impl<T> Completion<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, Completion::Stale)
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Completion::Applied(v) => Some(v),
            Completion::Stale => None,
        }
    }
}

/// Store transitions, named for logging and observer events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    BeginUpload,
    CompleteUpload,
    BeginProcess,
    CompleteProcess,
    FailAt(Stage),
    UpdateOptions,
    EditArtifact,
    Reset,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::BeginUpload => f.write_str("begin_upload"),
            Operation::CompleteUpload => f.write_str("complete_upload"),
            Operation::BeginProcess => f.write_str("begin_process"),
            Operation::CompleteProcess => f.write_str("complete_process"),
            Operation::FailAt(stage) => write!(f, "fail_at({stage})"),
            Operation::UpdateOptions => f.write_str("update_options"),
            Operation::EditArtifact => f.write_str("edit_artifact"),
            Operation::Reset => f.write_str("reset"),
        }
    }
}

/// A transition was requested from a lifecycle state that does not allow it.
#[derive(Debug, Error)]
#[error("invalid session transition: `{operation}` is not allowed from `{from}`")]
pub struct InvalidTransition {
    pub operation: Operation,
    pub from: Lifecycle,
}

/// Single-session state container.
#[derive(Default)]
pub struct SessionStore {
    session: Session,
    generation: Generation,
    observers: Vec<SharedObserver>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &self.session)
            .field("generation", &self.generation)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.session.lifecycle
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// True if no `begin_*` or `reset` happened since `generation` was issued.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    pub fn add_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// `Empty → Uploading`. Records the picked file and clears any old error.
    pub fn begin_upload(&mut self, document: DocumentRef) -> Generation {
        let from = self.expect_source(Operation::BeginUpload, &[Lifecycle::Empty]);
        self.session.document = Some(document);
        self.session.last_error = None;
        self.session.lifecycle = Lifecycle::Uploading;
        self.generation = self.generation.next();
        self.notify_transition(from, Operation::BeginUpload);
        self.generation
    }

    /// `Uploading → Ready`. Options reset to cover the whole document.
    pub fn complete_upload(&mut self, remote_id: RemoteId, name: impl Into<String>, page_count: u32) {
        let from = self.expect_source(Operation::CompleteUpload, &[Lifecycle::Uploading]);
        let name = name.into();
        if let Some(doc) = self.session.document.as_mut() {
            if !name.is_empty() {
                doc.declared_name = name;
            }
        }
        self.session.remote_id = Some(remote_id);
        self.session.page_count = page_count;
        self.session.options = Options::for_document(page_count);
        self.session.lifecycle = Lifecycle::Ready;
        self.notify_transition(from, Operation::CompleteUpload);
    }

    /// `Ready | Completed → Processing`.
    pub fn begin_process(&mut self) -> Generation {
        let from = self.expect_source(
            Operation::BeginProcess,
            &[Lifecycle::Ready, Lifecycle::Completed],
        );
        self.session.last_error = None;
        self.session.lifecycle = Lifecycle::Processing;
        self.generation = self.generation.next();
        self.notify_transition(from, Operation::BeginProcess);
        self.generation
    }

    /// `Processing → Completed`. The new artifact replaces any previous one.
    pub fn complete_process(&mut self, artifact: Artifact) {
        let from = self.expect_source(Operation::CompleteProcess, &[Lifecycle::Processing]);
        self.session.artifact = Some(artifact);
        self.session.lifecycle = Lifecycle::Completed;
        self.notify_transition(from, Operation::CompleteProcess);
    }

    /// `Uploading → Empty` for ingestion, `Processing → Ready` for processing.
    ///
    /// A failed upload retains nothing about the document. A failed run keeps
    /// the options and whatever artifact an earlier run left behind.
    pub fn fail_at(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        let operation = Operation::FailAt(stage);
        let from = match stage {
            Stage::Ingestion => {
                let from = self.expect_source(operation, &[Lifecycle::Uploading]);
                self.session = Session::default();
                from
            }
            Stage::Processing => {
                let from = self.expect_source(operation, &[Lifecycle::Processing]);
                self.session.lifecycle = Lifecycle::Ready;
                from
            }
        };
        self.session.last_error = Some(LastError {
            stage,
            message: message.clone(),
        });
        for observer in &self.observers {
            observer.on_error(stage, &message);
        }
        self.notify_transition(from, operation);
    }

    /// `Ready → Ready`, `Completed → Ready` when the options actually change.
    ///
    /// Invalid ranges are rejected and nothing is stored. A patch that leaves
    /// the options as they are does not invalidate a completed artifact.
    pub fn update_options(&mut self, patch: &OptionsPatch) -> Result<(), SessionError> {
        let from = self.expect_source(
            Operation::UpdateOptions,
            &[Lifecycle::Ready, Lifecycle::Completed],
        );
        let merged = self.session.options.merge(patch, self.session.page_count)?;
        if merged == self.session.options {
            return Ok(());
        }
        self.session.options = merged;
        self.session.lifecycle = Lifecycle::Ready;
        self.notify_transition(from, Operation::UpdateOptions);
        Ok(())
    }

    /// Replace the artifact text. Lifecycle is unchanged.
    ///
    /// Allowed from `Completed`, and from `Ready` while a stale artifact from
    /// an earlier run is still on display.
    pub fn edit_artifact(&mut self, text: impl Into<String>) {
        let from = self.lifecycle();
        let editable = match from {
            Lifecycle::Completed => true,
            Lifecycle::Ready => self.session.artifact.is_some(),
            _ => false,
        };
        if !editable {
            self.invalid(Operation::EditArtifact, from);
        }
        if let Some(artifact) = self.session.artifact.as_mut() {
            artifact.text = text.into();
        }
        self.notify_transition(from, Operation::EditArtifact);
    }

    /// `any → Empty`, discarding everything and invalidating in-flight calls.
    pub fn reset(&mut self) {
        let from = self.lifecycle();
        self.session = Session::default();
        self.generation = self.generation.next();
        self.notify_transition(from, Operation::Reset);
    }

    /// Tell observers a completion for `stage` arrived too late and was dropped.
    pub fn notify_stale(&self, stage: Stage) {
        for observer in &self.observers {
            observer.on_stale_completion(stage);
        }
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn expect_source(&self, operation: Operation, allowed: &[Lifecycle]) -> Lifecycle {
        let from = self.lifecycle();
        if !allowed.contains(&from) {
            self.invalid(operation, from);
        }
        from
    }

    fn invalid(&self, operation: Operation, from: Lifecycle) -> ! {
        panic!("{}", InvalidTransition { operation, from })
    }

    fn notify_transition(&self, from: Lifecycle, operation: Operation) {
        let to = self.lifecycle();
        debug!("session {} : {} → {} (gen {:?})", operation, from, to, self.generation);
        for observer in &self.observers {
            observer.on_transition(from, to, operation);
        }
    }
}

/// Shared, cloneable access to the one [`SessionStore`].
///
/// Every controller gets a clone. Each method takes the lock for a single
/// check-then-transition step and never across an `.await`, so two
/// operations never interleave their reads and writes.
///
/// Observers run while the lock is held and must not call back into the
/// handle.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionStore>>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionHandle").field(&*self.lock()).finish()
    }
}

impl SessionHandle {
    pub fn new(store: SessionStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// A copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.lock().session().clone()
    }

    /// Read from the current session without copying it.
    pub fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(self.lock().session())
    }

    /// Run one atomic step against the store.
    pub fn update<R>(&self, f: impl FnOnce(&mut SessionStore) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lock().lifecycle()
    }

    pub fn generation(&self) -> Generation {
        self.lock().generation()
    }

    pub fn add_observer(&self, observer: Arc<dyn SessionObserver>) {
        self.lock().add_observer(observer);
    }

    /// Return to a fresh `Empty` session; in-flight completions become stale.
    pub fn reset(&self) {
        self.lock().reset();
    }

    fn lock(&self) -> MutexGuard<'_, SessionStore> {
        // A panic inside a transition already reported the bug; keep serving
        // the last consistent state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
