use urlencoding::encode;

use crate::api::ApiClient;
use crate::models::{
    DeletedProject, FileUpload, Project, ProjectInput, ProjectUpdate,
};
use crate::utils::http_helpers::ApiError;

impl ApiClient {
    /// `GET /projects`: all projects of the signed-in user.
    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.get_json("/projects").await
    }

    pub async fn get_project(&self, id: &str) -> Result<Project, ApiError> {
        self.get_json(&format!("/projects/{}", encode(id))).await
    }

    pub async fn create_project(&self, input: &ProjectInput) -> Result<Project, ApiError> {
        self.post_json("/projects", input).await
    }

    pub async fn update_project(&self, id: &str, update: &ProjectUpdate) -> Result<Project, ApiError> {
        self.put_json(&format!("/projects/{}", encode(id)), update).await
    }

    /// Soft-deletes the project.
    pub async fn delete_project(&self, id: &str) -> Result<DeletedProject, ApiError> {
        self.delete_json(&format!("/projects/{}", encode(id))).await
    }

    pub async fn upload_project_attachment(
        &self,
        id: &str,
        file: &FileUpload,
    ) -> Result<Project, ApiError> {
        self.post_file(&format!("/projects/{}/attachments", encode(id)), file)
            .await
    }

    pub async fn remove_project_attachment(
        &self,
        id: &str,
        attachment_id: &str,
    ) -> Result<Project, ApiError> {
        self.delete_json(&format!(
            "/projects/{}/attachments/{}",
            encode(id),
            encode(attachment_id)
        ))
        .await
    }
}
