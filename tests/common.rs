use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use taskflow_client::api::ApiClient;
use taskflow_client::auth::{Auth, SessionContext};
use taskflow_client::config::RoutesConfig;
use taskflow_client::store::memory_store::MemoryStore;
use taskflow_client::store::{TokenKey, TokenStore};
use tokio::sync::{mpsc, Semaphore};

pub const ADA_JSON: &str = r#"{"_id": "u1", "email": "ada@example.com", "name": "Ada"}"#;

/// An `Auth` talking to `base_url`, backed by `store`, with default routes.
pub fn build_auth(base_url: &str, store: Arc<dyn TokenStore>) -> Arc<Auth> {
    let session = SessionContext::new(store);
    let client = ApiClient::with_http(reqwest::Client::new(), base_url, session);
    Arc::new(Auth::new(client, &RoutesConfig::default()))
}

/// A login response body carrying the given tokens and Ada's profile.
pub fn auth_response(access_token: &str, refresh_token: &str) -> String {
    format!(
        r#"{{"accessToken": "{}", "refreshToken": "{}", "user": {}}}"#,
        access_token, refresh_token, ADA_JSON
    )
}

/// A token store whose reads wait until `open` is called, to hold a bootstrap
/// at the point where it reads persisted tokens.
pub struct GatedStore {
    inner: MemoryStore,
    gate: Semaphore,
}

impl GatedStore {
    pub fn new(inner: MemoryStore) -> Self {
        GatedStore {
            inner,
            gate: Semaphore::new(0),
        }
    }

    pub fn open(&self) {
        self.gate.add_permits(64);
    }
}

#[async_trait]
impl TokenStore for GatedStore {
    async fn load(&self, key: TokenKey) -> Result<Option<String>, String> {
        let _permit = self.gate.acquire().await.map_err(|e| e.to_string())?;
        self.inner.load(key).await
    }

    async fn save(&self, key: TokenKey, value: &str) -> Result<(), String> {
        self.inner.save(key, value).await
    }

    async fn remove(&self, key: TokenKey) -> Result<(), String> {
        self.inner.remove(key).await
    }

    fn get_name(&self) -> &str {
        "gated"
    }
}

/// Keeps a mock's response back until `release` is called. Lets a test act
/// while the client is waiting on that response.
pub struct HeldResponse {
    arrived: mpsc::UnboundedReceiver<()>,
    release: std::sync::mpsc::Sender<()>,
}

impl HeldResponse {
    /// A body callback for `Mock::with_body_from_request` and its handle.
    pub fn new(
        body: &'static str,
    ) -> (
        impl Fn(&mockito::Request) -> Vec<u8> + Send + Sync + 'static,
        HeldResponse,
    ) {
        let (arrived_tx, arrived) = mpsc::unbounded_channel();
        let (release, release_rx) = std::sync::mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let respond = move |_: &mockito::Request| {
            let _ = arrived_tx.send(());
            // Runs on the mock server's own thread; a dropped handle also releases.
            if let Ok(rx) = release_rx.lock() {
                let _ = rx.recv();
            }
            body.as_bytes().to_vec()
        };
        (respond, HeldResponse { arrived, release })
    }

    /// Waits until the server has received the request.
    pub async fn arrived(&mut self) {
        self.arrived.recv().await;
    }

    pub fn release(&self) {
        let _ = self.release.send(());
    }
}
