use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::store::file_store::FileStoreConfig;

/// Where the access/refresh tokens are persisted between runs.
/// We differentiate the backends via a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(tag = "type")]
pub enum StoreConfig {
    /// Process-local storage; the session does not survive a restart.
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "file")]
    File(FileStoreConfig),
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory
    }
}
