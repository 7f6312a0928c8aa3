use std::path::Path;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::routes::RoutesConfig;
use super::store::StoreConfig;

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: remote API, token storage, routes and logging.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StoreConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How to reach the TaskFlow API.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to, e.g. "http://localhost:5000/api/v1".
    pub base_url: String,
    /// Applied to every request, including token refresh.
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
}

fn default_timeout_in_ms() -> u64 {
    10_000
}

/// Extracts a versioned config from the given figment.
pub fn extract_config(figment: Figment) -> Result<ConfigV1, figment::Error> {
    match figment.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
}

/// Load config from a YAML file, with `TASKFLOW_` prefixed environment overrides
/// (nested keys separated by `__`, e.g. `TASKFLOW_API__BASE_URL`).
pub fn load_config_from(path: impl AsRef<Path>) -> Result<ConfigV1, figment::Error> {
    let figment = Figment::new()
        .merge(Yaml::file(path.as_ref()))
        .merge(Env::prefixed("TASKFLOW_").split("__"));
    extract_config(figment)
}

/// Load config from a YAML file named "config.yaml" in the current directory.
pub fn load_config() -> ConfigV1 {
    match load_config_from("./config.yaml") {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let yaml = r#"
version: "1.0.0"
api:
  base_url: "http://localhost:5000/api/v1"
"#;
        let cfg = extract_config(Figment::new().merge(Yaml::string(yaml)))
            .expect("minimal config should parse");

        assert_eq!(cfg.api.timeout_in_ms, 10_000);
        assert!(matches!(cfg.storage, StoreConfig::Memory));
        assert_eq!(cfg.routes.login_path, "/login");
        assert_eq!(cfg.routes.default_landing, "/dashboard");
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_file_storage_config() {
        let yaml = r#"
version: "1.0.0"
api:
  base_url: "http://api.test"
  timeout_in_ms: 500
storage:
  type: file
  path: /tmp/taskflow-session.json
routes:
  public_paths: ["/", "/login"]
logging:
  level: debug
  format: json
"#;
        let cfg = extract_config(Figment::new().merge(Yaml::string(yaml)))
            .expect("config should parse");

        match cfg.storage {
            StoreConfig::File(file) => {
                assert_eq!(file.path.to_str(), Some("/tmp/taskflow-session.json"))
            }
            other => panic!("expected file storage, got {:?}", other),
        }
        assert_eq!(cfg.routes.public_paths, vec!["/", "/login"]);
        assert_eq!(cfg.logging.format, "json");
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let yaml = r#"
version: "0.9.0"
api:
  base_url: "http://api.test"
"#;
        assert!(extract_config(Figment::new().merge(Yaml::string(yaml))).is_err());
    }
}
