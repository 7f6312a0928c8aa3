use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Route surface consumed by the route guard.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct RoutesConfig {
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Where a freshly logged-in user lands when no return path was preserved.
    #[serde(default = "default_landing")]
    pub default_landing: String,
    /// Paths reachable without a session. Everything else is protected.
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_landing() -> String {
    "/dashboard".to_string()
}

fn default_public_paths() -> Vec<String> {
    vec!["/".to_string(), "/login".to_string(), "/register".to_string()]
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            default_landing: default_landing(),
            public_paths: default_public_paths(),
        }
    }
}
