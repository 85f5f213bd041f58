//! Turns paste and drag/drop input into the ordered list of image files to
//! upload.

use std::path::Path;

use anyhow::{Context, Result};

const IMAGE_TYPE_PREFIX: &str = "image/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(name, content_type, bytes))
    }

    pub fn is_image(&self) -> bool {
        is_image_type(&self.content_type)
    }
}

fn is_image_type(content_type: &str) -> bool {
    content_type
        .get(..IMAGE_TYPE_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(IMAGE_TYPE_PREFIX))
}

/// One entry of a clipboard payload. Entries of non-file kinds carry no file.
#[derive(Debug, Clone)]
pub struct ClipboardItem {
    pub item_type: String,
    pub file: Option<ImageFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Over,
    Drop,
}

#[derive(Debug, Clone)]
pub struct DragEvent {
    pub phase: DragPhase,
    pub files: Vec<ImageFile>,
    default_prevented: bool,
}

impl DragEvent {
    pub fn over() -> Self {
        Self {
            phase: DragPhase::Over,
            files: Vec::new(),
            default_prevented: false,
        }
    }

    pub fn dropped(files: Vec<ImageFile>) -> Self {
        Self {
            phase: DragPhase::Drop,
            files,
            default_prevented: false,
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

#[derive(Debug, Clone)]
pub enum IngestEvent {
    Paste(Vec<ClipboardItem>),
    Drag(DragEvent),
}

impl IngestEvent {
    pub fn paste(items: Vec<ClipboardItem>) -> Self {
        Self::Paste(items)
    }

    pub fn drop_files(files: Vec<ImageFile>) -> Self {
        Self::Drag(DragEvent::dropped(files))
    }

    pub fn is_default_prevented(&self) -> bool {
        match self {
            Self::Paste(_) => false,
            Self::Drag(drag) => drag.is_default_prevented(),
        }
    }
}

/// Filters `event` down to its image files, in the order they appear.
///
/// Drag events always have their default handling suppressed, even when
/// ingestion is disabled, so a dropped file never replaces the page.
pub fn normalize(event: &mut IngestEvent, disabled: bool) -> Vec<ImageFile> {
    match event {
        IngestEvent::Paste(items) => {
            if disabled {
                return Vec::new();
            }
            items
                .iter()
                .filter(|item| is_image_type(&item.item_type))
                .filter_map(|item| item.file.clone())
                .collect()
        }
        IngestEvent::Drag(drag) => {
            drag.prevent_default();
            if disabled || drag.phase == DragPhase::Over {
                return Vec::new();
            }
            drag.files
                .iter()
                .filter(|file| file.is_image())
                .cloned()
                .collect()
        }
    }
}

#[cfg(test)]
#[path = "tests/ingest_tests.rs"]
mod tests;
