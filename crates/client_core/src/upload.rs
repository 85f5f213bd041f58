use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use shared::domain::{ImageInfo, ProjectName};
use tracing::{debug, info, warn};

use crate::{api::ProjectApi, error::ClientError, ingest::ImageFile};

#[derive(Debug, Clone)]
pub struct UploadFailure {
    /// Zero-based position of the failing file in the batch.
    pub index: usize,
    pub file_name: String,
    pub error: ClientError,
}

#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    pub uploaded: Vec<ImageInfo>,
    pub failure: Option<UploadFailure>,
    /// Files never attempted because an earlier upload failed.
    pub skipped: usize,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone)]
pub enum UploadOutcome {
    /// Another batch was still running; this one was dropped.
    Busy,
    /// Nothing to upload.
    Empty,
    Finished(UploadReport),
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct UploadSequencer {
    api: Arc<dyn ProjectApi>,
    busy: AtomicBool,
}

impl UploadSequencer {
    pub fn new(api: Arc<dyn ProjectApi>) -> Self {
        Self {
            api,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Uploads `files` one at a time, in order, stopping at the first failure,
    /// then awaits `refresh` exactly once whatever the outcome.
    ///
    /// `refresh` is not polled when the batch is dropped as busy or empty.
    pub async fn run<F>(&self, project: &ProjectName, files: Vec<ImageFile>, refresh: F) -> UploadOutcome
    where
        F: Future<Output = ()>,
    {
        if files.is_empty() {
            return UploadOutcome::Empty;
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(project = %project, files = files.len(), "upload batch ignored while busy");
            return UploadOutcome::Busy;
        }
        let _busy = BusyGuard(&self.busy);

        let total = files.len();
        let mut report = UploadReport::default();
        for (index, file) in files.iter().enumerate() {
            debug!(project = %project, index, file = %file.name, "uploading image");
            match self.api.upload_image(project, file).await {
                Ok(info) => report.uploaded.push(info),
                Err(error) => {
                    warn!(project = %project, index, file = %file.name, %error, "image upload failed; aborting batch");
                    report.skipped = total - index - 1;
                    report.failure = Some(UploadFailure {
                        index,
                        file_name: file.name.clone(),
                        error,
                    });
                    break;
                }
            }
        }
        info!(
            project = %project,
            uploaded = report.uploaded.len(),
            total,
            "upload batch finished"
        );

        refresh.await;
        UploadOutcome::Finished(report)
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
