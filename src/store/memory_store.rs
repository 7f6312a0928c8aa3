use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{TokenKey, TokenStore};

/// A process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<TokenKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// A store that already holds the given tokens, as if persisted by an earlier run.
    pub fn with_tokens(access_token: Option<&str>, refresh_token: Option<&str>) -> Self {
        let mut values = HashMap::new();
        if let Some(token) = access_token {
            values.insert(TokenKey::Access, token.to_string());
        }
        if let Some(token) = refresh_token {
            values.insert(TokenKey::Refresh, token.to_string());
        }
        MemoryStore {
            values: Mutex::new(values),
        }
    }

    fn values(&self) -> Result<std::sync::MutexGuard<'_, HashMap<TokenKey, String>>, String> {
        self.values
            .lock()
            .map_err(|_| "memory token store mutex poisoned".to_string())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn load(&self, key: TokenKey) -> Result<Option<String>, String> {
        Ok(self.values()?.get(&key).cloned())
    }

    async fn save(&self, key: TokenKey, value: &str) -> Result<(), String> {
        self.values()?.insert(key, value.to_string());
        Ok(())
    }

    async fn remove(&self, key: TokenKey) -> Result<(), String> {
        self.values()?.remove(&key);
        Ok(())
    }

    fn get_name(&self) -> &str {
        "memory"
    }
}
