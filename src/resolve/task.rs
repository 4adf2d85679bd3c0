//! Per-field task handles.
//!
//! Every remote lookup in this crate runs as its own spawned task producing
//! `Result<Option<T>, FieldError>`:
//! - `Ok(Some(v))` — the field resolved to a value
//! - `Ok(None)` — resource absent or field not applicable
//! - `Err(_)` — fetch/parse failure for this field only
//!
//! [`FieldTask::get`] is the single boundary where errors are logged and
//! collapsed to `None`, keeping "not yet resolved" (the handle), "resolved
//! to nothing" (`None`), and "failed" (logged) distinct until that point.

use crate::traits::FieldError;
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handle to one in-flight field computation.
///
/// Awaitable independently of sibling fields; consuming it never blocks on
/// anything but its own task.
#[derive(Debug)]
pub struct FieldTask<T> {
    name: &'static str,
    handle: JoinHandle<Result<Option<T>, FieldError>>,
}

impl<T: Send + 'static> FieldTask<T> {
    /// Spawns `fut` on the runtime and returns its handle.
    pub fn spawn<F>(name: &'static str, fut: F) -> Self
    where
        F: Future<Output = Result<Option<T>, FieldError>> + Send + 'static,
    {
        Self {
            name,
            handle: tokio::spawn(fut),
        }
    }

    /// A task that resolves to absent without doing any work.
    pub fn absent(name: &'static str) -> Self {
        Self::spawn(name, async { Ok(None) })
    }

    /// Awaits the task and collapses failures to `None`.
    ///
    /// Fetch/parse failures are expected (missing files, malformed
    /// manifests) and logged at debug level; a panicked task is a bug and
    /// logged at warn level. Either way siblings are unaffected.
    pub async fn get(self) -> Option<T> {
        match self.handle.await {
            Ok(Ok(value)) => value,
            Ok(Err(error)) => {
                debug!(field = self.name, %error, "field left unresolved");
                None
            }
            Err(join_error) => {
                warn!(field = self.name, %join_error, "field task panicked");
                None
            }
        }
    }
}
