use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{file_store::FileStore, memory_store::MemoryStore};
use crate::config::StoreConfig;

/// The two persisted session values. The storage key names are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    Access,
    Refresh,
}

impl TokenKey {
    pub const ALL: [TokenKey; 2] = [TokenKey::Access, TokenKey::Refresh];

    /// The fixed name the value is stored under.
    pub fn storage_name(self) -> &'static str {
        match self {
            TokenKey::Access => "accessToken",
            TokenKey::Refresh => "refreshToken",
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_name())
    }
}

/// The TokenStore trait abstracts durable token storage (load, save, remove).
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self, key: TokenKey) -> Result<Option<String>, String>;
    async fn save(&self, key: TokenKey, value: &str) -> Result<(), String>;
    async fn remove(&self, key: TokenKey) -> Result<(), String>;

    /// Removes both tokens.
    async fn clear(&self) -> Result<(), String> {
        for key in TokenKey::ALL {
            self.remove(key).await?;
        }
        Ok(())
    }

    fn get_name(&self) -> &str;
}

/// Creates a concrete store implementation based on the StoreConfig.
pub fn create_store(config: &StoreConfig) -> Arc<dyn TokenStore> {
    match config {
        StoreConfig::Memory => {
            info!("Token storage is in-memory; sessions will not survive a restart.");
            Arc::new(MemoryStore::new())
        }
        StoreConfig::File(file_config) => {
            info!(
                "Persisting tokens to '{}'.",
                file_config.path.to_string_lossy()
            );
            Arc::new(FileStore::new(file_config))
        }
    }
}
