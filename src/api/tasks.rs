use urlencoding::encode;

use crate::api::ApiClient;
use crate::models::{DeletedTask, FileUpload, PageParams, Paginated, Task, TaskInput};
use crate::utils::http_helpers::ApiError;

impl ApiClient {
    /// `GET /projects/{id}/tasks`, one page at a time.
    pub async fn list_tasks(
        &self,
        project_id: &str,
        page: PageParams,
    ) -> Result<Paginated<Task>, ApiError> {
        self.get_json_with_query(&format!("/projects/{}/tasks", encode(project_id)), &page)
            .await
    }

    pub async fn create_task(&self, project_id: &str, input: &TaskInput) -> Result<Task, ApiError> {
        self.post_json(&format!("/projects/{}/tasks", encode(project_id)), input)
            .await
    }

    pub async fn update_task(
        &self,
        project_id: &str,
        task_id: &str,
        input: &TaskInput,
    ) -> Result<Task, ApiError> {
        let path = format!("/projects/{}/tasks/{}", encode(project_id), encode(task_id));
        self.put_json(&path, input).await
    }

    pub async fn delete_task(&self, project_id: &str, task_id: &str) -> Result<DeletedTask, ApiError> {
        let path = format!("/projects/{}/tasks/{}", encode(project_id), encode(task_id));
        self.delete_json(&path).await
    }

    pub async fn upload_task_attachment(
        &self,
        project_id: &str,
        task_id: &str,
        file: &FileUpload,
    ) -> Result<Task, ApiError> {
        self.post_file(
            &format!("/projects/{}/tasks/{}/attachments", encode(project_id), encode(task_id)),
            file,
        )
        .await
    }
}
