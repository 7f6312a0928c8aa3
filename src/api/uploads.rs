use reqwest::multipart::{Form, Part};

use crate::api::ApiClient;
use crate::models::{ExtractTextResponse, FileUpload, UploadFileResponse};
use crate::utils::http_helpers::{decode_response, transport_error, ApiError};

/// A multipart form with the file in its `file` field.
pub(crate) fn file_form(file: &FileUpload) -> Result<Form, ApiError> {
    let mut part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
    if let Some(mime) = &file.mime_type {
        part = part.mime_str(mime).map_err(transport_error)?;
    }
    Ok(Form::new().part("file", part))
}

impl ApiClient {
    /// Sends `file` as multipart to `path`, replaying the upload after a token refresh if needed.
    pub(crate) async fn post_file<T>(&self, path: &str, file: &FileUpload) -> Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = self.url(path);
        let response = self
            .send(|http| Ok(http.post(&url).multipart(file_form(file)?)))
            .await?;
        decode_response(response).await
    }

    /// `POST /upload/file`: stores a file and returns its URL.
    pub async fn upload_file(&self, file: &FileUpload) -> Result<UploadFileResponse, ApiError> {
        self.post_file("/upload/file", file).await
    }

    /// `POST /ai/extract-text`: queues a text extraction job for an uploaded file.
    pub async fn extract_text(&self, file_url: &str) -> Result<ExtractTextResponse, ApiError> {
        self.post_json("/ai/extract-text", &serde_json::json!({ "fileUrl": file_url }))
            .await
    }
}
