use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::session::SessionStatus;
use crate::api::ApiClient;

/// Resolves the session once per application load.
///
/// Concurrent and repeated calls share the first resolution: only one
/// `/auth/me` request is ever issued, and a resolved status is never
/// regressed to `Unresolved`.
pub struct Bootstrapper {
    client: ApiClient,
    resolved: OnceCell<SessionStatus>,
}

impl Bootstrapper {
    pub fn new(client: ApiClient) -> Self {
        Bootstrapper {
            client,
            resolved: OnceCell::new(),
        }
    }

    /// Runs bootstrap (or waits for the run in progress) and returns the
    /// current session status.
    pub async fn run(&self) -> SessionStatus {
        self.resolved.get_or_init(|| self.resolve()).await;
        self.client.session().status()
    }

    async fn resolve(&self) -> SessionStatus {
        let session = self.client.session();
        session.ensure_loaded().await;

        if session.status().is_resolved() {
            debug!("Session already resolved by a login or logout; skipping bootstrap");
            return session.status();
        }

        if session.access_token().is_none() {
            session.resolve_anonymous();
            info!("No persisted access token; session is anonymous");
            return session.status();
        }

        match self.client.current_user().await {
            Ok(user) => {
                let user = user.with_display_name();
                info!("Restored session for '{}'", user.email);
                session.resolve_authenticated(user);
            }
            Err(e) => {
                warn!("Persisted session could not be restored: {}", e);
                session.reject_persisted_token().await;
            }
        }
        session.status()
    }
}
