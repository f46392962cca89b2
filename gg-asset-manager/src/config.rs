use gg_util::eyre::{Result, WrapErr};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct AssetManagerConfig {
    /// Threads running background loads.
    pub worker_threads: usize,
    /// Prefix for the dispatcher and worker thread names.
    pub thread_name: String,
}

impl Default for AssetManagerConfig {
    fn default() -> Self {
        AssetManagerConfig {
            worker_threads: 4,
            thread_name: "assets".into(),
        }
    }
}

impl AssetManagerConfig {
    pub fn from_json(json: &str) -> Result<AssetManagerConfig> {
        serde_json::from_str(json).wrap_err("invalid asset manager config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = AssetManagerConfig::from_json(r#"{ "worker_threads": 2 }"#).unwrap();
        assert_eq!(config.worker_threads, 2);
        assert_eq!(config.thread_name, "assets");
    }

    #[test]
    fn test_invalid_config() {
        assert!(AssetManagerConfig::from_json(r#"{ "worker_threads": "many" }"#).is_err());
    }
}
