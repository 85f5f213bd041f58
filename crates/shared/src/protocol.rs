use serde::{Deserialize, Serialize};

use crate::domain::ProjectName;

/// Multipart form field carrying an uploaded image.
pub const UPLOAD_FIELD_NAME: &str = "file";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectListResponse {
    pub projects: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: ProjectName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteImageResponse {
    pub deleted: bool,
}

/// Body of both the readme read and the readme write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadmeContent {
    pub content: String,
}
