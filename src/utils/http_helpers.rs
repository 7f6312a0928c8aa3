use http::StatusCode;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// Every failure an API call can surface to the calling screen.
/// The `Display` output is always a display-ready message.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got a response (connection refused, DNS, timeout).
    /// The session is left untouched.
    #[error("No response from server. Please check your connection.")]
    Network(#[source] reqwest::Error),

    /// Authorization failed and could not be recovered by a token refresh.
    /// The session has been cleared and the user must log in again.
    #[error("{message}")]
    Unauthorized { message: String },

    /// 422-class field validation errors, flattened into one message.
    #[error("{0}")]
    Validation(String),

    /// Any other non-success status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    /// A success response whose body did not have the expected shape.
    #[error("Unexpected response from server: {0}")]
    Decode(String),

    /// The request could not be built (e.g. an invalid multipart MIME type).
    #[error("Invalid request: {0}")]
    Request(String),
}

impl ApiError {
    /// True when the caller should send the user to the login screen.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// The HTTP status behind this error, when there was a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::Validation(_) => Some(StatusCode::UNPROCESSABLE_ENTITY),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Turns a transport-level reqwest failure into an `ApiError`.
pub fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_builder() {
        ApiError::Request(err.to_string())
    } else {
        ApiError::Network(err)
    }
}

/// Decodes a success body, or converts a failure response into an `ApiError`.
pub async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    let body = response.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Builds the display-ready error for a non-success response.
pub async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    // A body we cannot read or parse still yields a status-based message.
    let body = match response.bytes().await {
        Ok(raw) => serde_json::from_slice::<Value>(&raw).unwrap_or(Value::Null),
        Err(_) => Value::Null,
    };
    error_from_parts(status, &body)
}

/// Maps a status and a (possibly null) JSON body onto the error taxonomy.
pub fn error_from_parts(status: StatusCode, body: &Value) -> ApiError {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "An error occurred".to_string());

    if status == StatusCode::UNAUTHORIZED {
        return ApiError::Unauthorized { message };
    }

    if status == StatusCode::UNPROCESSABLE_ENTITY {
        let errors = body
            .get("errors")
            .and_then(Value::as_object)
            .or_else(|| body.pointer("/data/errors").and_then(Value::as_object));
        if let Some(errors) = errors {
            let formatted = format_validation_errors(errors);
            return ApiError::Validation(if formatted.is_empty() {
                "Validation failed".to_string()
            } else {
                formatted
            });
        }
    }

    ApiError::Status { status, message }
}

/// Formats `{"field": ["a", "b"], "other": "c"}` as `"field: a, b; other: c"`.
pub fn format_validation_errors(errors: &Map<String, Value>) -> String {
    errors
        .iter()
        .map(|(field, messages)| {
            let joined = match messages {
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}: {}", field, joined)
        })
        .collect::<Vec<_>>()
        .join("; ")
}
