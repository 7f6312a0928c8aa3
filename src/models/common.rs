use serde::{Deserialize, Serialize};

/// A file attached to a project or task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    #[serde(default, alias = "publicId", skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
}

/// The envelope list endpoints return for paginated collections.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub data: Vec<T>,
}

/// Page selection for list endpoints.
#[derive(Serialize, Debug, Clone, Copy, Default)]
pub struct PageParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// A bare `{ "message": ... }` acknowledgement.
#[derive(Deserialize, Debug, Clone)]
pub struct MessageResponse {
    pub message: String,
}

/// Response of `POST /upload/file`.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileResponse {
    pub message: String,
    pub file_url: String,
    #[serde(default)]
    pub public_id: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
}

/// Response of `POST /ai/extract-text`: the job that will do the work.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExtractTextResponse {
    pub message: String,
    pub job_id: String,
}

/// An in-memory file to send as a multipart `file` field.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        FileUpload {
            file_name: file_name.into(),
            mime_type: None,
            bytes,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}
