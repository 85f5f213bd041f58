//! Project view state: which project is selected, its last fetched detail,
//! and the per-project readme autosave.
//!
//! Every fetch is tagged with the [`SelectionToken`] current when it was
//! issued. A response whose token no longer matches is dropped, so a slow
//! fetch for a project the user already left can never overwrite what is
//! shown for the new one.

use std::{sync::Arc, time::Duration};

use shared::domain::{Project, ProjectDetail, ProjectName};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    api::ProjectApi,
    autosave::{AutosaveController, SaveStatus},
    config::ClientSettings,
    error::ClientResult,
    ingest::{normalize, IngestEvent},
    upload::{UploadOutcome, UploadSequencer},
};

const LOAD_FAILED_FALLBACK: &str = "Failed to load project";
const UPLOAD_FAILED_FALLBACK: &str = "Failed to upload images";
const DELETE_FAILED_FALLBACK: &str = "Failed to delete image";
const EVENT_CAPACITY: usize = 64;

/// Marker of the active selection. Replaced on every selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SelectionToken(u64);

impl SelectionToken {
    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone)]
pub enum ViewEvent {
    SelectionChanged(Option<ProjectName>),
    DetailLoaded(ProjectName),
    StaleResponseDiscarded(ProjectName),
    UploadFinished {
        project: ProjectName,
        uploaded: usize,
        failed: bool,
    },
    Error(String),
}

#[derive(Default)]
struct ViewState {
    token: SelectionToken,
    current: Option<ProjectName>,
    detail: Option<ProjectDetail>,
    loading: bool,
    error: Option<String>,
    autosave: Option<Arc<AutosaveController>>,
    fetches_issued: u64,
    last_applied_fetch: u64,
}

struct PendingFetch {
    project: ProjectName,
    token: SelectionToken,
    id: u64,
}

pub struct ProjectViewController {
    api: Arc<dyn ProjectApi>,
    autosave_debounce: Duration,
    uploads: UploadSequencer,
    state: Mutex<ViewState>,
    events: broadcast::Sender<ViewEvent>,
}

impl ProjectViewController {
    pub fn new(api: Arc<dyn ProjectApi>, settings: &ClientSettings) -> Self {
        Self::with_debounce(api, settings.autosave_debounce())
    }

    pub fn with_debounce(api: Arc<dyn ProjectApi>, autosave_debounce: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            uploads: UploadSequencer::new(Arc::clone(&api)),
            api,
            autosave_debounce,
            state: Mutex::new(ViewState::default()),
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    pub async fn current_project(&self) -> Option<ProjectName> {
        self.state.lock().await.current.clone()
    }

    pub async fn selection_token(&self) -> SelectionToken {
        self.state.lock().await.token
    }

    pub async fn detail(&self) -> Option<ProjectDetail> {
        self.state.lock().await.detail.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.state.lock().await.error.clone()
    }

    pub async fn dismiss_error(&self) {
        self.state.lock().await.error = None;
    }

    pub fn uploading(&self) -> bool {
        self.uploads.is_busy()
    }

    /// Autosave bound to the selected project, once its detail has loaded.
    pub async fn autosave(&self) -> Option<Arc<AutosaveController>> {
        self.state.lock().await.autosave.clone()
    }

    pub async fn list_projects(&self) -> ClientResult<Vec<String>> {
        self.api.list_projects().await
    }

    /// Validates `raw_name`, creates the project and selects it.
    pub async fn create_project(&self, raw_name: &str) -> ClientResult<Project> {
        let name = ProjectName::parse(raw_name)?;
        let project = self.api.create_project(&name).await?;
        info!(project = %project.name, created = project.created, "project ready");
        self.select_project(Some(project.name.clone())).await;
        Ok(project)
    }

    /// Switches the view to `next`.
    ///
    /// The previous project's autosave is torn down before anything else, and
    /// `None` clears the detail without a request. Re-selecting the current
    /// project only refreshes it.
    pub async fn select_project(&self, next: Option<ProjectName>) {
        let fetch = {
            let mut state = self.state.lock().await;
            // Same guard as the token bump: racing selects of one project switch once.
            if next.is_none() || next != state.current {
                state.token = state.token.next();
                state.current = next.clone();
                state.detail = None;
                state.error = None;
                if let Some(autosave) = state.autosave.take() {
                    autosave.teardown();
                }
                debug!(project = ?next, token = state.token.0, "selection changed");
                let _ = self.events.send(ViewEvent::SelectionChanged(next));
            }

            match state.current.clone() {
                Some(project) => Self::issue_fetch(&mut state, project),
                None => {
                    state.loading = false;
                    return;
                }
            }
        };
        self.load_detail(fetch).await;
    }

    /// Refetches the selected project's detail, if any.
    pub async fn refresh(&self) {
        let token = self.state.lock().await.token;
        self.refresh_for(token).await;
    }

    async fn refresh_for(&self, token: SelectionToken) {
        let fetch = {
            let mut state = self.state.lock().await;
            if state.token != token {
                debug!("skipping refresh for a selection that is no longer active");
                return;
            }
            let Some(project) = state.current.clone() else {
                return;
            };
            Self::issue_fetch(&mut state, project)
        };
        self.load_detail(fetch).await;
    }

    fn issue_fetch(state: &mut ViewState, project: ProjectName) -> PendingFetch {
        state.loading = true;
        state.fetches_issued += 1;
        PendingFetch {
            project,
            token: state.token,
            id: state.fetches_issued,
        }
    }

    async fn load_detail(&self, fetch: PendingFetch) {
        let result = self.api.project_detail(&fetch.project).await;

        let mut state = self.state.lock().await;
        if state.token != fetch.token || fetch.id < state.last_applied_fetch {
            debug!(project = %fetch.project, fetch = fetch.id, "discarding stale project detail");
            let _ = self
                .events
                .send(ViewEvent::StaleResponseDiscarded(fetch.project));
            return;
        }
        state.last_applied_fetch = fetch.id;
        if fetch.id == state.fetches_issued {
            state.loading = false;
        }

        match result {
            Ok(detail) => {
                if state.autosave.is_none() {
                    state.autosave = Some(Arc::new(AutosaveController::new(
                        Arc::clone(&self.api),
                        fetch.project.clone(),
                        detail.readme.clone(),
                        self.autosave_debounce,
                    )));
                }
                debug!(project = %fetch.project, images = detail.images.len(), "project detail loaded");
                state.detail = Some(detail);
                let _ = self.events.send(ViewEvent::DetailLoaded(fetch.project));
            }
            Err(err) => {
                warn!(project = %fetch.project, error = %err, "failed to load project detail");
                self.raise(&mut state, err.user_message(LOAD_FAILED_FALLBACK));
            }
        }
    }

    fn raise(&self, state: &mut ViewState, message: String) {
        state.error = Some(message.clone());
        let _ = self.events.send(ViewEvent::Error(message));
    }

    /// Writes `message` to the error slot unless the selection moved on.
    async fn raise_for(&self, token: SelectionToken, message: String) {
        let mut state = self.state.lock().await;
        if state.token == token {
            self.raise(&mut state, message);
        } else {
            debug!(%message, "dropping error for a selection that is no longer active");
        }
    }

    async fn clear_error_for(&self, token: SelectionToken) -> Option<ProjectName> {
        let mut state = self.state.lock().await;
        if state.token != token {
            return None;
        }
        state.error = None;
        state.current.clone()
    }

    /// Uploads the images carried by a paste or drop event into the selected
    /// project, then refreshes its detail.
    ///
    /// Ingestion is disabled while no project is selected or a batch is
    /// still running; a drop is still marked as handled in that case.
    pub async fn ingest(&self, event: &mut IngestEvent) -> UploadOutcome {
        let (current, token) = {
            let state = self.state.lock().await;
            (state.current.clone(), state.token)
        };
        let busy = self.uploads.is_busy();
        let files = normalize(event, current.is_none() || busy);
        if files.is_empty() {
            return if busy {
                UploadOutcome::Busy
            } else {
                UploadOutcome::Empty
            };
        }
        let Some(project) = self.clear_error_for(token).await else {
            return UploadOutcome::Empty;
        };

        let outcome = self
            .uploads
            .run(&project, files, self.refresh_for(token))
            .await;

        if let UploadOutcome::Finished(report) = &outcome {
            let _ = self.events.send(ViewEvent::UploadFinished {
                project: project.clone(),
                uploaded: report.uploaded.len(),
                failed: report.failure.is_some(),
            });
            if let Some(failure) = &report.failure {
                self.raise_for(token, failure.error.user_message(UPLOAD_FAILED_FALLBACK))
                    .await;
            }
        }
        outcome
    }

    /// Deletes `filename` from the selected project and refreshes its detail.
    /// Returns whether the image was deleted.
    pub async fn delete_image(&self, filename: &str) -> bool {
        let token = self.state.lock().await.token;
        let Some(project) = self.clear_error_for(token).await else {
            return false;
        };

        match self.api.delete_image(&project, filename).await {
            Ok(_) => {
                info!(project = %project, filename, "image deleted");
                self.refresh_for(token).await;
                true
            }
            Err(err) => {
                warn!(project = %project, filename, error = %err, "image delete failed");
                self.raise_for(token, err.user_message(DELETE_FAILED_FALLBACK))
                    .await;
                false
            }
        }
    }

    /// Forwards an editor change to the bound autosave. Returns `false` when
    /// no project detail is loaded yet.
    pub async fn edit_readme(&self, content: impl Into<String>) -> bool {
        match self.autosave().await {
            Some(autosave) => {
                autosave.edit(content);
                true
            }
            None => false,
        }
    }

    pub async fn save_readme_now(&self) -> Option<SaveStatus> {
        let autosave = self.autosave().await?;
        Some(autosave.save_now().await)
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
