//! Client startup.
//!
//! Wires the token store, session, API client and route guard together from
//! the configuration, then resolves the session for this run.

use std::sync::Arc;
use tracing::info;

use crate::api::ApiClient;
use crate::auth::{Auth, GuardDecision, SessionContext, SessionStatus};
use crate::config::ConfigV1;
use crate::state::ClientState;
use crate::store::create_store;
use crate::utils::http_helpers::ApiError;

/// Builds the client state. No network traffic happens here.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be constructed.
pub fn build_state(config: Arc<ConfigV1>) -> Result<ClientState, ApiError> {
    let store = create_store(&config.storage);
    info!("Using '{}' token store", store.get_name());

    let session = SessionContext::new(store);
    let client = ApiClient::new(&config.api, session)?;
    let auth = Arc::new(Auth::new(client, &config.routes));

    Ok(ClientState { config, auth })
}

/// Bootstraps the session and returns the guard decision for each of `paths`.
pub async fn run(
    config: Arc<ConfigV1>,
    paths: &[String],
) -> Result<(SessionStatus, Vec<(String, GuardDecision)>), Box<dyn std::error::Error>> {
    let state = build_state(config)?;

    info!("Resolving session against {}", state.config.api.base_url);
    let status = state.auth.bootstrap().await;
    if let Some(user) = state.session().user() {
        info!("Signed in as '{}' <{}>", user.name, user.email);
    }

    let mut decisions = Vec::with_capacity(paths.len());
    for path in paths {
        let decision = state.auth.guard().check_resolved(state.session(), path).await;
        decisions.push((path.clone(), decision));
    }
    Ok((status, decisions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, LoggingConfig, RoutesConfig, StoreConfig};
    use mockito::Server;

    fn config_for(base_url: &str) -> Arc<ConfigV1> {
        Arc::new(ConfigV1 {
            api: ApiConfig {
                base_url: base_url.to_string(),
                timeout_in_ms: 2_000,
            },
            storage: StoreConfig::Memory,
            routes: RoutesConfig::default(),
            logging: LoggingConfig::default(),
        })
    }

    #[tokio::test]
    async fn test_run_without_tokens_redirects_protected_paths() {
        let mut server = Server::new_async().await;
        let me = server
            .mock("GET", "/auth/me")
            .expect(0)
            .create_async()
            .await;

        let paths = vec!["/".to_string(), "/projects".to_string()];
        let (status, decisions) = run(config_for(&server.url()), &paths).await.unwrap();

        me.assert_async().await;
        assert_eq!(status, SessionStatus::Anonymous);
        assert_eq!(decisions[0].1, GuardDecision::Admit);
        assert_eq!(
            decisions[1].1,
            GuardDecision::Redirect {
                to: "/login".to_string(),
                return_to: "/projects".to_string(),
            }
        );
    }
}
