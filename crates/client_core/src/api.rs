//! The projects REST API as seen by the client: a trait seam plus the reqwest
//! implementation used outside of tests.

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ImageInfo, Project, ProjectDetail, ProjectName},
    error::error_message_from_body,
    protocol::{
        CreateProjectRequest, DeleteImageResponse, ProjectListResponse, ReadmeContent,
        UPLOAD_FIELD_NAME,
    },
};
use tracing::debug;
use url::Url;

use crate::{
    config::ClientSettings,
    error::{ClientError, ClientResult},
    ingest::ImageFile,
};

#[async_trait]
pub trait ProjectApi: Send + Sync {
    async fn list_projects(&self) -> ClientResult<Vec<String>>;
    async fn create_project(&self, name: &ProjectName) -> ClientResult<Project>;
    async fn project_detail(&self, name: &ProjectName) -> ClientResult<ProjectDetail>;
    async fn upload_image(&self, project: &ProjectName, file: &ImageFile)
        -> ClientResult<ImageInfo>;
    async fn delete_image(&self, project: &ProjectName, filename: &str) -> ClientResult<bool>;
    async fn readme(&self, project: &ProjectName) -> ClientResult<String>;
    async fn update_readme(&self, project: &ProjectName, content: &str) -> ClientResult<String>;
}

pub struct HttpProjectApi {
    http: Client,
    base_url: Url,
}

impl HttpProjectApi {
    pub fn new(settings: &ClientSettings) -> ClientResult<Self> {
        let base_url = Url::parse(&settings.api_base_url).map_err(|err| {
            ClientError::Transport(format!(
                "invalid API base URL '{}': {err}",
                settings.api_base_url
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Transport(format!(
                "API base URL '{base_url}' cannot carry a path"
            )));
        }
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Transport("API base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn ensure_success(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    let message = error_message_from_body(status.as_u16(), status.canonical_reason(), &body);
    debug!(status = status.as_u16(), %message, "api request rejected");
    Err(ClientError::api(status.as_u16(), message))
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let response = ensure_success(response).await?;
    Ok(response.json::<T>().await?)
}

#[async_trait]
impl ProjectApi for HttpProjectApi {
    async fn list_projects(&self) -> ClientResult<Vec<String>> {
        let url = self.endpoint(&["projects"])?;
        let body: ProjectListResponse = decode(self.http.get(url).send().await?).await?;
        Ok(body.projects)
    }

    async fn create_project(&self, name: &ProjectName) -> ClientResult<Project> {
        let url = self.endpoint(&["projects"])?;
        let request = CreateProjectRequest { name: name.clone() };
        decode(self.http.post(url).json(&request).send().await?).await
    }

    async fn project_detail(&self, name: &ProjectName) -> ClientResult<ProjectDetail> {
        let url = self.endpoint(&["projects", name.as_str()])?;
        debug!(project = %name, "fetching project detail");
        decode(self.http.get(url).send().await?).await
    }

    async fn upload_image(
        &self,
        project: &ProjectName,
        file: &ImageFile,
    ) -> ClientResult<ImageInfo> {
        let url = self.endpoint(&["projects", project.as_str(), "images"])?;
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new().part(UPLOAD_FIELD_NAME, part);
        decode(self.http.post(url).multipart(form).send().await?).await
    }

    async fn delete_image(&self, project: &ProjectName, filename: &str) -> ClientResult<bool> {
        let url = self.endpoint(&["projects", project.as_str(), "images", filename])?;
        let body: DeleteImageResponse = decode(self.http.delete(url).send().await?).await?;
        Ok(body.deleted)
    }

    async fn readme(&self, project: &ProjectName) -> ClientResult<String> {
        let url = self.endpoint(&["projects", project.as_str(), "readme"])?;
        let body: ReadmeContent = decode(self.http.get(url).send().await?).await?;
        Ok(body.content)
    }

    async fn update_readme(&self, project: &ProjectName, content: &str) -> ClientResult<String> {
        let url = self.endpoint(&["projects", project.as_str(), "readme"])?;
        let request = ReadmeContent {
            content: content.to_string(),
        };
        let body: ReadmeContent = decode(self.http.put(url).json(&request).send().await?).await?;
        Ok(body.content)
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
