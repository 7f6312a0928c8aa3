use tracing::{info, warn};

use super::bootstrap::Bootstrapper;
use super::guard::{GuardDecision, RouteGuard};
use super::session::{SessionContext, SessionStatus};
use crate::api::ApiClient;
use crate::config::RoutesConfig;
use crate::models::{AuthResponse, LoginPayload, RegisterPayload, TokenPair, UserProfile};
use crate::utils::http_helpers::ApiError;

/// Entry point for everything session related: bootstrap, login, register,
/// logout and route decisions. Holds the API client, the bootstrapper and
/// the route guard that all share one `SessionContext`.
pub struct Auth {
    client: ApiClient,
    bootstrapper: Bootstrapper,
    guard: RouteGuard,
}

impl Auth {
    pub fn new(client: ApiClient, routes: &RoutesConfig) -> Self {
        Auth {
            bootstrapper: Bootstrapper::new(client.clone()),
            guard: RouteGuard::new(routes),
            client,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn session(&self) -> &SessionContext {
        self.client.session()
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    /// Resolves the session for this application load. Safe to call repeatedly.
    pub async fn bootstrap(&self) -> SessionStatus {
        self.bootstrapper.run().await
    }

    /// Logs in with e-mail and password. Bad credentials surface the server's
    /// message and leave the session as it was.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let response = self
            .client
            .login(&LoginPayload {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        Ok(self.start_session(response).await)
    }

    /// Creates an account and signs straight into it.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, ApiError> {
        let response = self
            .client
            .register(&RegisterPayload {
                name: name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        Ok(self.start_session(response).await)
    }

    /// Invalidates the refresh token server-side (best effort) and clears the
    /// session. The local session is cleared whatever the server answers.
    pub async fn logout(&self) {
        if self.session().access_token().is_some() {
            if let Err(e) = self.client.logout().await {
                warn!("Server-side logout failed: {}", e);
            }
        }
        self.session().clear().await;
        info!("Logged out");
    }

    /// The guard decision for `requested` under the current session.
    pub fn check_route(&self, requested: &str) -> GuardDecision {
        self.guard.check(self.session(), requested)
    }

    async fn start_session(&self, response: AuthResponse) -> UserProfile {
        let user = response.user.with_display_name();
        self.session()
            .establish(
                TokenPair::new(response.access_token, response.refresh_token),
                user.clone(),
            )
            .await;
        user
    }
}
