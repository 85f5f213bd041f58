pub mod api;
pub mod autosave;
pub mod config;
pub mod error;
pub mod ingest;
pub mod upload;
pub mod view;

pub use api::{HttpProjectApi, ProjectApi};
pub use autosave::{AutosaveController, AutosaveSnapshot, SaveStatus};
pub use config::{load_settings, load_settings_from, ClientSettings};
pub use error::{ClientError, ClientResult};
pub use ingest::{ClipboardItem, DragEvent, DragPhase, ImageFile, IngestEvent};
pub use upload::{UploadFailure, UploadOutcome, UploadReport, UploadSequencer};
pub use view::{ProjectViewController, SelectionToken, ViewEvent};

#[cfg(test)]
#[path = "tests/fake_api.rs"]
mod fake_api;
