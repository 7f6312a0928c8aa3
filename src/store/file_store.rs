use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{TokenKey, TokenStore};

/// The config struct for file-backed token storage.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
pub struct FileStoreConfig {
    pub path: PathBuf,
}

/// Persists the tokens as a flat JSON object keyed by the fixed storage names,
/// e.g. `{"accessToken": "...", "refreshToken": "..."}`.
///
/// Every write replaces the file atomically (temp file + rename), so a crash
/// mid-write leaves the previous contents intact.
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(config: &FileStoreConfig) -> Self {
        FileStore {
            path: config.path.clone(),
            lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, String> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(format!(
                    "Failed to read token file '{}': {}",
                    self.path.display(),
                    e
                ))
            }
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&raw).map_err(|e| {
            warn!(
                "Token file '{}' is not a JSON object: {}",
                self.path.display(),
                e
            );
            format!("Failed to parse token file: {}", e)
        })
    }

    async fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| format!("Failed to create token directory: {}", e))?;
            }
        }
        let body = serde_json::to_vec_pretty(values)
            .map_err(|e| format!("Failed to serialize tokens: {}", e))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| format!("Failed to write token file: {}", e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| format!("Failed to replace token file: {}", e))?;
        debug!("Token file '{}' updated", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileStore {
    async fn load(&self, key: TokenKey) -> Result<Option<String>, String> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key.storage_name()))
    }

    async fn save(&self, key: TokenKey, value: &str) -> Result<(), String> {
        let _guard = self.lock.lock().await;
        let mut values = self.read_all().await?;
        values.insert(key.storage_name().to_string(), value.to_string());
        self.write_all(&values).await
    }

    async fn remove(&self, key: TokenKey) -> Result<(), String> {
        let _guard = self.lock.lock().await;
        let mut values = self.read_all().await?;
        if values.remove(key.storage_name()).is_none() {
            return Ok(());
        }
        self.write_all(&values).await
    }

    fn get_name(&self) -> &str {
        "file"
    }
}
