//! Shared client state.
//!
//! Everything a caller needs after startup: the configuration it was built
//! from and the `Auth` facade that owns the session and the API client.

use crate::api::ApiClient;
use crate::auth::{Auth, SessionContext};
use crate::config::ConfigV1;
use std::sync::Arc;

/// Client state shared across tasks. Cheap to clone.
#[derive(Clone)]
pub struct ClientState {
    /// Configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Session, API client and route guard.
    pub auth: Arc<Auth>,
}

impl ClientState {
    pub fn client(&self) -> &ApiClient {
        self.auth.client()
    }

    pub fn session(&self) -> &SessionContext {
        self.auth.session()
    }
}
