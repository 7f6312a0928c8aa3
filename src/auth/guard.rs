use tracing::debug;

use super::session::{SessionContext, SessionStatus};
use crate::config::RoutesConfig;

/// What the router should do with a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Bootstrap has not resolved yet: show a loading indicator, do not redirect.
    Pending,
    /// Render the requested screen.
    Admit,
    /// Send the user to the login screen, remembering where they were going.
    Redirect { to: String, return_to: String },
}

/// Gates protected screens on the resolved session status.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    login_path: String,
    default_landing: String,
    public_paths: Vec<String>,
}

/// The path component of a location, without query, fragment or trailing slash.
fn path_of(location: &str) -> &str {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    let path = &location[..end];
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

impl RouteGuard {
    pub fn new(config: &RoutesConfig) -> Self {
        RouteGuard {
            login_path: config.login_path.clone(),
            default_landing: config.default_landing.clone(),
            public_paths: config.public_paths.clone(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Public paths are reachable whatever the session status.
    pub fn is_public(&self, location: &str) -> bool {
        let path = path_of(location);
        path == path_of(&self.login_path) || self.public_paths.iter().any(|p| path_of(p) == path)
    }

    /// The access decision for `requested` under `status`.
    pub fn decide(&self, status: SessionStatus, requested: &str) -> GuardDecision {
        if self.is_public(requested) {
            return GuardDecision::Admit;
        }
        match status {
            SessionStatus::Unresolved => GuardDecision::Pending,
            SessionStatus::Authenticated => GuardDecision::Admit,
            SessionStatus::Anonymous => {
                debug!("Redirecting '{}' to '{}'", requested, self.login_path);
                GuardDecision::Redirect {
                    to: self.login_path.clone(),
                    return_to: requested.to_string(),
                }
            }
        }
    }

    /// The decision for `requested` given the session's current status.
    pub fn check(&self, session: &SessionContext, requested: &str) -> GuardDecision {
        self.decide(session.status(), requested)
    }

    /// Like `check`, but waits for bootstrap to resolve instead of returning `Pending`.
    pub async fn check_resolved(&self, session: &SessionContext, requested: &str) -> GuardDecision {
        let status = session.wait_resolved().await;
        self.decide(status, requested)
    }

    /// Where to go after a successful login: the preserved location when it is
    /// a local path, otherwise the default landing page.
    pub fn post_login_target(&self, return_to: Option<&str>) -> String {
        match return_to {
            Some(target)
                if target.starts_with('/')
                    && !target.starts_with("//")
                    && !target.contains('\\')
                    && path_of(target) != path_of(&self.login_path) =>
            {
                target.to_string()
            }
            _ => self.default_landing.clone(),
        }
    }
}
