//! # Autosave Scheduler
//!
//! Debounced, single-flight persistence through an injected save function.
//!
//! ## State machine
//!
//! ```text
//!            notify_dirty              debounce elapsed
//!   Idle ───────────────→ Pending ───────────────────→ Saving
//!    ↑ ↑                    │ cancel                     │
//!    │ └────────────────────┘                            │
//!    │            Ok                                     │
//!    ├───────────────────────────────────────────────────┤
//!    │                                        Err        ↓
//!    └──── Ok ──── retry (auto w/ backoff, or explicit) ─ Error
//! ```
//!
//! - Every `notify_dirty` re-arms the debounce timer, so a burst of edits
//!   produces one save once edits stop
//! - A save in flight is never re-entered; a trigger that fires during a
//!   save is coalesced into one follow-up debounce cycle
//! - Timers are invalidated by a generation counter instead of being aborted
//! - After `shutdown` the result of an in-flight save is ignored
//!
//! The scheduler knows nothing about the document: the save function
//! captures whatever it needs. Revisions passed to `notify_dirty` come back in
//! [`AutosaveSnapshot::saved_revision`] so the editor can tell whether the
//! saved state is still current.
//!
//! Timers run on the ambient tokio runtime.

use crate::config::AutosaveConfig;
use crate::errors::SaveError;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AutosaveStatus {
    #[default]
    Idle,
    Pending,
    Saving,
    Error,
}

/// Status report handed to the observer on every change
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveSnapshot {
    pub status: AutosaveStatus,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Revision written by the most recent successful save
    pub saved_revision: Option<u64>,
}

pub type SaveFn = Arc<dyn Fn() -> BoxFuture<'static, Result<(), SaveError>> + Send + Sync>;
pub type Observer = Arc<dyn Fn(&AutosaveSnapshot) + Send + Sync>;

struct Inner {
    snapshot: AutosaveSnapshot,

    /// Latest revision reported dirty and not yet saved
    dirty_revision: Option<u64>,

    /// Bumped to invalidate outstanding timers
    generation: u64,

    saving: bool,

    /// A debounce fired while saving
    rerun: bool,

    /// Consecutive failed saves
    failures: u32,

    save_count: u64,

    shut_down: bool,

    observer: Option<Observer>,
}

/// Handle to the scheduler. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AutosaveScheduler {
    inner: Arc<Mutex<Inner>>,
    save: SaveFn,
    config: AutosaveConfig,
}

impl std::fmt::Debug for AutosaveScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutosaveScheduler")
            .field("config", &self.config)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl AutosaveScheduler {
    pub fn new<F, Fut>(config: AutosaveConfig, save: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), SaveError>> + Send + 'static,
    {
        let save: SaveFn = Arc::new(move || save().boxed());
        Self {
            inner: Arc::new(Mutex::new(Inner {
                snapshot: AutosaveSnapshot::default(),
                dirty_revision: None,
                generation: 0,
                saving: false,
                rerun: false,
                failures: 0,
                save_count: 0,
                shut_down: false,
                observer: None,
            })),
            save,
            config,
        }
    }

    /// Subscribe to status changes (replaces any previous observer)
    pub fn set_observer(&self, observer: impl Fn(&AutosaveSnapshot) + Send + Sync + 'static) {
        self.lock().observer = Some(Arc::new(observer));
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> AutosaveSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn status(&self) -> AutosaveStatus {
        self.lock().snapshot.status
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().dirty_revision.is_some()
    }

    /// Number of times the save function has been invoked
    pub fn save_count(&self) -> u64 {
        self.lock().save_count
    }

    pub fn config(&self) -> &AutosaveConfig {
        &self.config
    }

    /// Update the status and collect the observer to call once unlocked
    fn set_status(
        inner: &mut Inner,
        status: AutosaveStatus,
    ) -> Option<(Observer, AutosaveSnapshot)> {
        inner.snapshot.status = status;
        inner
            .observer
            .clone()
            .map(|observer| (observer, inner.snapshot.clone()))
    }

    fn emit(pending: Option<(Observer, AutosaveSnapshot)>) {
        if let Some((observer, snapshot)) = pending {
            observer(&snapshot);
        }
    }

    /// Record a dirty-producing edit and (re)arm the debounce timer
    pub fn notify_dirty(&self, revision: u64) {
        let (generation, pending) = {
            let mut inner = self.lock();
            if inner.shut_down {
                return;
            }
            inner.dirty_revision = Some(revision);
            if !self.config.enabled {
                return;
            }
            inner.generation += 1;
            let pending = if inner.saving {
                None
            } else {
                Self::set_status(&mut inner, AutosaveStatus::Pending)
            };
            (inner.generation, pending)
        };
        Self::emit(pending);
        debug!(revision, generation, "Autosave debounce armed");
        self.arm(generation, self.config.debounce());
    }

    fn arm(&self, generation: u64, delay: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime, autosave timer not started");
            return;
        };
        let this = self.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            this.fire(generation).await;
        });
    }

    async fn fire(self, generation: u64) {
        {
            let mut inner = self.lock();
            if inner.shut_down || inner.generation != generation {
                return;
            }
            if inner.saving {
                inner.rerun = true;
                debug!("Save in flight, coalescing trigger");
                return;
            }
        }
        self.run_save().await;
    }

    /// Invoke the save function once. Returns true on success.
    async fn run_save(&self) -> bool {
        let (revision, pending) = {
            let mut inner = self.lock();
            if inner.saving || inner.shut_down {
                return false;
            }
            inner.saving = true;
            inner.save_count += 1;
            (inner.dirty_revision, Self::set_status(&mut inner, AutosaveStatus::Saving))
        };
        Self::emit(pending);
        debug!(?revision, "Autosave started");

        let result = (self.save)().await;

        let (pending, follow_up) = {
            let mut inner = self.lock();
            inner.saving = false;
            if inner.shut_down {
                debug!("Scheduler shut down, ignoring save result");
                return result.is_ok();
            }

            let follow_up = match &result {
                Ok(()) => {
                    inner.failures = 0;
                    inner.snapshot.last_saved_at = Some(Utc::now());
                    inner.snapshot.last_error = None;
                    inner.snapshot.saved_revision = revision;
                    if inner.dirty_revision == revision {
                        inner.dirty_revision = None;
                    }
                    info!(?revision, "Autosave succeeded");
                    None
                }
                Err(error) => {
                    inner.failures += 1;
                    inner.snapshot.last_error = Some(error.to_string());
                    warn!(%error, failures = inner.failures, "Autosave failed");
                    (inner.failures <= self.config.max_retries)
                        .then(|| self.config.backoff(inner.failures))
                }
            };

            let status = match (&result, inner.rerun) {
                (_, true) => AutosaveStatus::Pending,
                (Ok(()), false) if inner.dirty_revision.is_some() => AutosaveStatus::Pending,
                (Ok(()), false) => AutosaveStatus::Idle,
                (Err(_), false) => AutosaveStatus::Error,
            };
            let pending = Self::set_status(&mut inner, status);

            // Follow-up work: a coalesced trigger, an edit that landed during
            // the save, or an automatic retry
            let follow_up = if inner.rerun || (result.is_ok() && inner.dirty_revision.is_some()) {
                inner.rerun = false;
                inner.generation += 1;
                Some((inner.generation, self.config.debounce()))
            } else if let Some(delay) = follow_up {
                inner.generation += 1;
                Some((inner.generation, delay))
            } else {
                None
            };
            (pending, follow_up)
        };

        Self::emit(pending);
        if let Some((generation, delay)) = follow_up {
            self.arm(generation, delay);
        }
        result.is_ok()
    }

    /// Retry a failed save right away. Resets the automatic retry budget.
    pub async fn retry(&self) -> bool {
        {
            let mut inner = self.lock();
            if inner.shut_down || inner.saving || inner.snapshot.status != AutosaveStatus::Error {
                return false;
            }
            inner.failures = 0;
            inner.generation += 1;
        }
        info!("Explicit autosave retry");
        self.run_save().await
    }

    /// Skip the debounce and save now if anything is unsaved
    pub async fn flush(&self) -> bool {
        {
            let mut inner = self.lock();
            if inner.shut_down || inner.saving || inner.dirty_revision.is_none() {
                return false;
            }
            inner.generation += 1;
        }
        self.run_save().await
    }

    /// Drop a pending (not yet fired) save. Unsaved changes stay unsaved.
    pub fn cancel(&self) {
        let pending = {
            let mut inner = self.lock();
            inner.generation += 1;
            if inner.snapshot.status != AutosaveStatus::Pending {
                return;
            }
            let status = if inner.snapshot.last_error.is_some() {
                AutosaveStatus::Error
            } else {
                AutosaveStatus::Idle
            };
            Self::set_status(&mut inner, status)
        };
        debug!("Autosave cancelled");
        Self::emit(pending);
    }

    /// Stop all timers and detach the observer. Idempotent.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        inner.shut_down = true;
        inner.generation += 1;
        inner.observer = None;
        debug!("Autosave scheduler shut down");
    }
}
