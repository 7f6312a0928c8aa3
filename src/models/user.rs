use serde::{Deserialize, Serialize};

/// The profile of the signed-in user, as returned by `/auth/me` and the login endpoints.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct UserProfile {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl UserProfile {
    /// Construct a profile with no role or phone set.
    pub fn new(id: impl Into<String>, email: impl Into<String>, name: impl Into<String>) -> Self {
        UserProfile {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            role: None,
            phone: None,
        }
    }

    /// Fills an empty name from the local part of the e-mail address, or "User".
    pub fn with_display_name(mut self) -> Self {
        if self.name.trim().is_empty() {
            self.name = match self.email.split('@').next() {
                Some(local) if !local.is_empty() => local.to_string(),
                _ => "User".to_string(),
            };
        }
        self
    }
}

/// Body of `POST /auth/login`.
#[derive(Serialize, Debug, Clone)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Serialize, Debug, Clone)]
pub struct RegisterPayload {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Response of the login and register endpoints.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: UserProfile,
}
