//! The session context: the single owner of the signed-in state.
//!
//! `SessionContext` is the only writer of the in-memory session and of the
//! persisted tokens. Everything else reads snapshots or subscribes to changes.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{watch, OnceCell};
use tracing::{debug, info, warn};

use crate::models::{TokenPair, UserProfile};
use crate::store::{TokenKey, TokenStore};

/// Where the session stands for the current application load.
///
/// `Unresolved` only exists until bootstrap finishes; afterwards the status
/// moves between `Authenticated` and `Anonymous` and never goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Unresolved,
    Authenticated,
    Anonymous,
}

impl SessionStatus {
    pub fn is_resolved(self) -> bool {
        self != SessionStatus::Unresolved
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
    pub status: SessionStatus,
}

// Tokens never end up in logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .field("status", &self.status)
            .finish()
    }
}

struct SessionInner {
    store: Arc<dyn TokenStore>,
    state: watch::Sender<Session>,
    loaded: OnceCell<()>,
}

/// Shared handle to the session. Cloning is cheap; all clones see the same state.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<SessionInner>,
}

impl SessionContext {
    /// An empty, unresolved session backed by the given token store.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(Session::default());
        SessionContext {
            inner: Arc::new(SessionInner {
                store,
                state,
                loaded: OnceCell::new(),
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.state.borrow().refresh_token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.state.borrow().user.clone()
    }

    /// A receiver notified on every session change (e.g. to redirect on logout).
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Waits until bootstrap (or a login) has resolved the session.
    pub async fn wait_resolved(&self) -> SessionStatus {
        let mut rx = self.subscribe();
        let resolved = rx
            .wait_for(|s| s.status.is_resolved())
            .await
            .map(|session| session.status);
        // The channel cannot close while `self` holds the sender.
        resolved.unwrap_or(SessionStatus::Anonymous)
    }

    /// Reads the persisted tokens into memory the first time it is called.
    /// Every request awaits this before picking its bearer token, so nothing
    /// is sent with an empty session while the store still holds one.
    pub async fn ensure_loaded(&self) {
        self.inner
            .loaded
            .get_or_init(|| async move {
                if let Err(e) = self.load_persisted().await {
                    warn!(
                        "Could not read persisted tokens from '{}' store: {}",
                        self.inner.store.get_name(),
                        e
                    );
                }
            })
            .await;
    }

    /// Copies persisted tokens into the in-memory session. Only applies while
    /// unresolved, so a login that raced ahead of bootstrap is kept.
    pub async fn load_persisted(&self) -> Result<(), String> {
        let access_token = self.inner.store.load(TokenKey::Access).await?;
        let refresh_token = self.inner.store.load(TokenKey::Refresh).await?;
        self.inner.state.send_if_modified(|s| {
            if s.status.is_resolved() {
                return false;
            }
            s.access_token = access_token;
            s.refresh_token = refresh_token;
            true
        });
        Ok(())
    }

    /// Starts a new authenticated session (login or register).
    pub async fn establish(&self, tokens: TokenPair, user: UserProfile) {
        info!("Session established for '{}'", user.email);
        let refresh_token = tokens.refresh_token.clone();
        self.inner.state.send_modify(|s| {
            s.access_token = Some(tokens.access_token.clone());
            s.refresh_token = refresh_token.clone();
            s.user = Some(user);
            s.status = SessionStatus::Authenticated;
        });

        self.persist(TokenKey::Access, Some(&tokens.access_token)).await;
        self.persist(TokenKey::Refresh, refresh_token.as_deref()).await;
    }

    /// Installs refreshed tokens, provided the session still holds the refresh
    /// token they were minted from. Returns false (and changes nothing) when a
    /// logout or a new login happened while the refresh was in flight.
    pub async fn replace_tokens(&self, used_refresh_token: &str, tokens: &TokenPair) -> bool {
        let applied = self.inner.state.send_if_modified(|s| {
            if s.refresh_token.as_deref() != Some(used_refresh_token) {
                return false;
            }
            s.access_token = Some(tokens.access_token.clone());
            if let Some(rotated) = &tokens.refresh_token {
                s.refresh_token = Some(rotated.clone());
            }
            true
        });
        if !applied {
            debug!("Discarding refreshed tokens; the session changed during the refresh");
            return false;
        }

        self.persist(TokenKey::Access, Some(&tokens.access_token)).await;
        if let Some(rotated) = &tokens.refresh_token {
            self.persist(TokenKey::Refresh, Some(rotated)).await;
        }
        true
    }

    /// Bootstrap succeeded: mark the session authenticated. No-op once resolved.
    pub fn resolve_authenticated(&self, user: UserProfile) -> bool {
        self.inner.state.send_if_modified(|s| {
            if s.status.is_resolved() {
                return false;
            }
            s.user = Some(user);
            s.status = SessionStatus::Authenticated;
            true
        })
    }

    /// Bootstrap found no usable session. No-op once resolved.
    pub fn resolve_anonymous(&self) -> bool {
        self.inner.state.send_if_modified(|s| {
            if s.status.is_resolved() {
                return false;
            }
            s.user = None;
            s.status = SessionStatus::Anonymous;
            true
        })
    }

    /// Bootstrap could not confirm the persisted access token: forget it and
    /// resolve anonymous. The refresh token is kept. No-op once resolved.
    pub async fn reject_persisted_token(&self) -> bool {
        let rejected = self.inner.state.send_if_modified(|s| {
            if s.status.is_resolved() {
                return false;
            }
            s.access_token = None;
            s.user = None;
            s.status = SessionStatus::Anonymous;
            true
        });
        if rejected {
            self.persist(TokenKey::Access, None).await;
        }
        rejected
    }

    /// Ends the session: tokens removed from memory and storage, status `Anonymous`.
    pub async fn clear(&self) {
        self.inner.state.send_modify(|s| {
            s.access_token = None;
            s.refresh_token = None;
            s.user = None;
            s.status = SessionStatus::Anonymous;
        });
        self.clear_store().await;
    }

    /// Ends the session only if `key` still holds `expected`. Returns false,
    /// leaving everything untouched, when a login or logout got there first.
    pub async fn clear_if_current(&self, key: TokenKey, expected: Option<&str>) -> bool {
        let cleared = self.inner.state.send_if_modified(|s| {
            let current = match key {
                TokenKey::Access => s.access_token.as_deref(),
                TokenKey::Refresh => s.refresh_token.as_deref(),
            };
            if current != expected {
                return false;
            }
            s.access_token = None;
            s.refresh_token = None;
            s.user = None;
            s.status = SessionStatus::Anonymous;
            true
        });
        if !cleared {
            debug!("Not clearing session; its {} changed meanwhile", key);
            return false;
        }
        self.clear_store().await;
        true
    }

    async fn clear_store(&self) {
        if let Err(e) = self.inner.store.clear().await {
            warn!(
                "Failed to remove persisted tokens from '{}' store: {}",
                self.inner.store.get_name(),
                e
            );
        }
        info!("Session cleared");
    }

    /// Storage failures are logged, never surfaced: the in-memory session stays authoritative.
    async fn persist(&self, key: TokenKey, value: Option<&str>) {
        let result = match value {
            Some(value) => self.inner.store.save(key, value).await,
            None => self.inner.store.remove(key).await,
        };
        if let Err(e) = result {
            warn!(
                "Failed to persist '{}' in '{}' store: {}",
                key,
                self.inner.store.get_name(),
                e
            );
        }
    }
}
