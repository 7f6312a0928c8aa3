//! Access-token refresh with at most one refresh in flight.
//!
//! The first caller that needs a refresh creates a shared pending operation;
//! callers arriving while it runs attach to it and receive the same outcome.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use http::StatusCode;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::session::SessionContext;
use crate::models::{RefreshRequest, RefreshResponse, TokenPair};
use crate::store::TokenKey;

/// Why a refresh did not produce a new access token. Cloneable so a single
/// outcome can be handed to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("no refresh token is stored")]
    MissingRefreshToken,
    #[error("refresh token was rejected ({0})")]
    Rejected(StatusCode),
    #[error("refresh response did not contain an access token")]
    NoAccessToken,
    #[error("refresh request failed: {0}")]
    Transport(String),
    /// The session was logged out or replaced while the refresh was in flight.
    #[error("session changed while the refresh was in flight")]
    Superseded,
}

type PendingRefresh = Shared<BoxFuture<'static, Result<TokenPair, RefreshError>>>;

struct RefreshInner {
    http: reqwest::Client,
    endpoint: String,
    session: SessionContext,
    pending: Mutex<Option<PendingRefresh>>,
}

/// Exchanges the stored refresh token for a new access token via `POST /auth/refresh`.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<RefreshInner>,
}

/// Empties the in-flight slot when the refresh future finishes, fails, or unwinds.
struct ClearPendingOnDrop(Arc<RefreshInner>);

impl Drop for ClearPendingOnDrop {
    fn drop(&mut self) {
        self.0
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl RefreshCoordinator {
    /// `base_url` is the API root; the refresh endpoint is `{base_url}/auth/refresh`.
    pub fn new(http: reqwest::Client, base_url: &str, session: SessionContext) -> Self {
        RefreshCoordinator {
            inner: Arc::new(RefreshInner {
                http,
                endpoint: format!("{}/auth/refresh", base_url.trim_end_matches('/')),
                session,
                pending: Mutex::new(None),
            }),
        }
    }

    /// True while a refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Refreshes the access token, or joins the refresh already in flight.
    ///
    /// On failure the session has been cleared and the caller should send the
    /// user to login. `Superseded` means a login or logout replaced the session
    /// while the refresh ran; that newer session is left alone.
    pub async fn refresh(&self) -> Result<TokenPair, RefreshError> {
        let pending = {
            let mut slot = self
                .inner
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(pending) => {
                    debug!("Joining the token refresh already in flight");
                    pending.clone()
                }
                None => {
                    let inner = self.inner.clone();
                    let pending = async move {
                        let _clear = ClearPendingOnDrop(inner.clone());
                        inner.run().await
                    }
                    .boxed()
                    .shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };
        pending.await
    }
}

impl RefreshInner {
    async fn run(&self) -> Result<TokenPair, RefreshError> {
        self.session.ensure_loaded().await;
        let used_refresh_token = self.session.refresh_token();

        let result = match used_refresh_token.as_deref() {
            Some(refresh_token) => {
                info!("Refreshing access token");
                self.exchange(refresh_token).await
            }
            None => Err(RefreshError::MissingRefreshToken),
        };

        let tokens = match result {
            Ok(tokens) => tokens,
            Err(e) => {
                // A login or logout that landed during the exchange owns the session now.
                if !self
                    .session
                    .clear_if_current(TokenKey::Refresh, used_refresh_token.as_deref())
                    .await
                {
                    debug!("Refresh failed ({}) but the session was replaced meanwhile", e);
                    return Err(RefreshError::Superseded);
                }
                warn!("Token refresh failed, session cleared: {}", e);
                return Err(e);
            }
        };

        let applied = match used_refresh_token.as_deref() {
            Some(used) => self.session.replace_tokens(used, &tokens).await,
            None => false,
        };
        if !applied {
            return Err(RefreshError::Superseded);
        }
        info!("Access token refreshed");
        Ok(tokens)
    }

    async fn exchange(&self, refresh_token: &str) -> Result<TokenPair, RefreshError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected(status));
        }

        let body = response
            .json::<RefreshResponse>()
            .await
            .map_err(|e| RefreshError::Transport(format!("invalid refresh response: {}", e)))?;
        body.into_pair().ok_or(RefreshError::NoAccessToken)
    }
}
