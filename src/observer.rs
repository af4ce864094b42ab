//! Observer trait for session events.
//!
//! Register an [`Arc<dyn SessionObserver>`] with
//! [`crate::session::store::SessionHandle::add_observer`] to be told about
//! every lifecycle transition, every engine failure and every completion that
//! arrived too late to be applied.
//!
//! This is how a front end stays in sync with the store without polling: a
//! terminal spinner, a GUI binding or a log sink all plug in here, and the
//! store knows nothing about any of them.
//!
//! # Example
//!
//! ```rust
//! use documinter::{Lifecycle, Operation, SessionHandle, SessionObserver};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct History(Mutex<Vec<Lifecycle>>);
//!
//! impl SessionObserver for History {
//!     fn on_transition(&self, _from: Lifecycle, to: Lifecycle, _op: Operation) {
//!         self.0.lock().unwrap().push(to);
//!     }
//! }
//!
//! let handle = SessionHandle::default();
//! let history = Arc::new(History::default());
//! handle.add_observer(history.clone());
//! handle.reset();
//! assert_eq!(*history.0.lock().unwrap(), vec![Lifecycle::Empty]);
//! ```

use crate::session::store::Operation;
use crate::session::{Lifecycle, Stage};
use std::sync::Arc;

/// Receives session events. All methods default to no-ops.
///
/// Methods are called while the store is locked; implementations must be
/// quick and must not call back into the session handle.
pub trait SessionObserver: Send + Sync {
    /// A store transition was applied.
    ///
    /// `from == to` for transitions that keep the lifecycle
    /// (`edit_artifact`, `update_options` from `Ready`).
    fn on_transition(&self, from: Lifecycle, to: Lifecycle, operation: Operation) {
        let _ = (from, to, operation);
    }

    /// An engine call failed and the session was rolled back.
    fn on_error(&self, stage: Stage, message: &str) {
        let _ = (stage, message);
    }

    /// A completion for `stage` was dropped because the session moved on.
    fn on_stale_completion(&self, stage: Stage) {
        let _ = stage;
    }
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Convenience alias for the type the store keeps.
pub type SharedObserver = Arc<dyn SessionObserver>;
