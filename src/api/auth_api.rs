use crate::api::ApiClient;
use crate::models::{AuthResponse, LoginPayload, RegisterPayload, UserProfile};
use crate::utils::http_helpers::{decode_response, error_from_response, ApiError};

impl ApiClient {
    /// `POST /auth/login`. Sent without credentials; a 401 here means bad
    /// credentials, not an expired session.
    pub async fn login(&self, payload: &LoginPayload) -> Result<AuthResponse, ApiError> {
        let url = self.url("/auth/login");
        decode_response(self.send_public(|http| Ok(http.post(&url).json(payload))).await?).await
    }

    /// `POST /auth/register`.
    pub async fn register(&self, payload: &RegisterPayload) -> Result<AuthResponse, ApiError> {
        let url = self.url("/auth/register");
        decode_response(self.send_public(|http| Ok(http.post(&url).json(payload))).await?).await
    }

    /// `GET /auth/me`: the profile behind the current access token.
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.get_json("/auth/me").await
    }

    /// `POST /auth/logout`: invalidates the refresh token server-side.
    /// Never triggers a refresh; the body is ignored.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let url = self.url("/auth/logout");
        let response = self.send_once(|http| Ok(http.post(&url))).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}
