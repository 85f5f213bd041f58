//! Debounced README persistence for one bound project.
//!
//! A controller is created for a project when its detail is loaded and torn
//! down when the selection moves on; it is never re-pointed at another
//! project. Edits arm a single-slot timer; when the timer fires the latest
//! content is written through [`ProjectApi::update_readme`]. Results that
//! arrive after teardown are dropped.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use shared::domain::ProjectName;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::api::ProjectApi;

const SAVE_FAILED_FALLBACK: &str = "Failed to save README";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Saved,
    Unsaved,
    Saving,
    Error,
}

impl SaveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Unsaved => "unsaved",
            Self::Saving => "saving",
            Self::Error => "error",
        }
    }

    pub fn is_settled(self) -> bool {
        matches!(self, Self::Saved | Self::Error)
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutosaveSnapshot {
    pub project: ProjectName,
    pub content: String,
    pub baseline: String,
    pub status: SaveStatus,
    pub error: Option<String>,
}

impl AutosaveSnapshot {
    pub fn status_text(&self) -> String {
        match (self.status, &self.error) {
            (SaveStatus::Error, Some(message)) => message.clone(),
            (status, _) => status.to_string(),
        }
    }
}

struct ArmedTimer {
    id: u64,
    handle: JoinHandle<()>,
}

struct AutosaveState {
    content: String,
    baseline: String,
    status: SaveStatus,
    error: Option<String>,
    timer: Option<ArmedTimer>,
    next_timer_id: u64,
    in_flight: bool,
    save_queued: bool,
    closed: bool,
}

impl AutosaveState {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }
}

struct Inner {
    project: ProjectName,
    api: Arc<dyn ProjectApi>,
    debounce: Duration,
    state: Mutex<AutosaveState>,
    status_tx: watch::Sender<SaveStatus>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, AutosaveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, state: &mut AutosaveState, status: SaveStatus) {
        state.status = status;
        self.status_tx.send_replace(status);
    }

    /// Replaces whatever timer is armed with a fresh one.
    fn arm(self: &Arc<Self>, state: &mut AutosaveState) {
        state.cancel_timer();
        state.next_timer_id += 1;
        let id = state.next_timer_id;
        let inner = Arc::clone(self);
        let debounce = self.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            inner.fire(id).await;
        });
        state.timer = Some(ArmedTimer { id, handle });
    }

    async fn fire(self: Arc<Self>, id: u64) {
        let content = {
            let mut state = self.lock();
            if state.closed || state.timer.as_ref().map(|timer| timer.id) != Some(id) {
                return;
            }
            // Detach before the request so a later arm cannot abort it.
            state.timer = None;
            if state.in_flight {
                state.save_queued = true;
                return;
            }
            self.begin_save(&mut state)
        };
        self.persist(content).await;
    }

    fn begin_save(&self, state: &mut AutosaveState) -> String {
        state.in_flight = true;
        self.set_status(state, SaveStatus::Saving);
        state.content.clone()
    }

    async fn persist(&self, mut content: String) {
        loop {
            debug!(project = %self.project, bytes = content.len(), "saving readme");
            let result = self.api.update_readme(&self.project, &content).await;

            let mut state = self.lock();
            if state.closed {
                debug!(project = %self.project, "dropping readme save result after teardown");
                return;
            }
            state.in_flight = false;

            match result {
                Ok(_) => {
                    info!(project = %self.project, "readme saved");
                    state.baseline = content;
                    state.error = None;
                    let status = if state.content == state.baseline {
                        SaveStatus::Saved
                    } else {
                        SaveStatus::Unsaved
                    };
                    self.set_status(&mut state, status);
                }
                Err(err) => {
                    warn!(project = %self.project, error = %err, "readme save failed");
                    state.error = Some(err.user_message(SAVE_FAILED_FALLBACK));
                    self.set_status(&mut state, SaveStatus::Error);
                }
            }

            if !std::mem::take(&mut state.save_queued) {
                return;
            }
            if state.content == state.baseline {
                state.error = None;
                self.set_status(&mut state, SaveStatus::Saved);
                return;
            }
            content = self.begin_save(&mut state);
        }
    }
}

pub struct AutosaveController {
    inner: Arc<Inner>,
}

impl AutosaveController {
    pub fn new(
        api: Arc<dyn ProjectApi>,
        project: ProjectName,
        loaded_content: impl Into<String>,
        debounce: Duration,
    ) -> Self {
        let loaded_content = loaded_content.into();
        let (status_tx, _) = watch::channel(SaveStatus::Saved);
        debug!(project = %project, "binding readme autosave");
        Self {
            inner: Arc::new(Inner {
                project,
                api,
                debounce,
                state: Mutex::new(AutosaveState {
                    content: loaded_content.clone(),
                    baseline: loaded_content,
                    status: SaveStatus::Saved,
                    error: None,
                    timer: None,
                    next_timer_id: 0,
                    in_flight: false,
                    save_queued: false,
                    closed: false,
                }),
                status_tx,
            }),
        }
    }

    pub fn project(&self) -> &ProjectName {
        &self.inner.project
    }

    pub fn status(&self) -> SaveStatus {
        self.inner.lock().status
    }

    pub fn content(&self) -> String {
        self.inner.lock().content.clone()
    }

    pub fn snapshot(&self) -> AutosaveSnapshot {
        let state = self.inner.lock();
        AutosaveSnapshot {
            project: self.inner.project.clone(),
            content: state.content.clone(),
            baseline: state.baseline.clone(),
            status: state.status,
            error: state.error.clone(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Records new editor content and schedules a save for it.
    ///
    /// Returning to the saved baseline while nothing is in flight cancels the
    /// pending save instead of writing identical content back.
    pub fn edit(&self, content: impl Into<String>) {
        let mut state = self.inner.lock();
        if state.closed {
            return;
        }
        state.content = content.into();

        if state.content == state.baseline && !state.in_flight {
            state.cancel_timer();
            state.error = None;
            self.inner.set_status(&mut state, SaveStatus::Saved);
            return;
        }

        self.inner.set_status(&mut state, SaveStatus::Unsaved);
        self.inner.arm(&mut state);
    }

    /// Saves the current content immediately, skipping the debounce.
    pub async fn save_now(&self) -> SaveStatus {
        let content = {
            let mut state = self.inner.lock();
            if state.closed {
                return state.status;
            }
            state.cancel_timer();
            if state.in_flight {
                state.save_queued = true;
                return state.status;
            }
            if state.content == state.baseline && state.status != SaveStatus::Error {
                return state.status;
            }
            self.inner.begin_save(&mut state)
        };
        self.inner.persist(content).await;
        self.status()
    }

    /// Waits until no save is pending or running.
    pub async fn settled(&self) -> SaveStatus {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(|status| status.is_settled())
            .await
            .map(|status| *status);
        settled.unwrap_or_else(|_| self.status())
    }

    /// Cancels the armed timer and detaches any in-flight save. Idempotent.
    pub fn teardown(&self) {
        let mut state = self.inner.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.cancel_timer();
        debug!(project = %self.inner.project, "readme autosave torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.lock().closed
    }
}

impl Drop for AutosaveController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for AutosaveController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutosaveController")
            .field("project", &self.inner.project)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/autosave_tests.rs"]
mod tests;
