//! # Configuration
//!
//! [`AppConfig`] is assembled in three layers, later layers winning:
//!
//! 1. Built-in defaults (service API on `0.0.0.0:6000`, admin API on
//!    `127.0.0.1:6001`, in-memory storage, ephemeral signing key).
//! 2. An optional YAML file named by `CLAIMSRV_CONFIG`.
//! 3. Environment overrides:
//!
//! | Variable                   | Field             |
//! |----------------------------|-------------------|
//! | `CLAIMSRV_SERVICE_ADDR`    | `service_addr`    |
//! | `CLAIMSRV_ADMIN_ADDR`      | `admin_addr`      |
//! | `CLAIMSRV_STORAGE_PATH`    | `storage_path`    |
//! | `CLAIMSRV_SIGNING_KEY_HEX` | `signing_key_hex` |
//! | `CLAIMSRV_METRICS_ENABLED` | `metrics_enabled` |

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable naming the YAML config file.
pub const CONFIG_PATH_ENV: &str = "CLAIMSRV_CONFIG";

/// Errors while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid YAML for [`AppConfig`].
    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An environment override could not be parsed.
    #[error("invalid value for {var}: {reason}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Server configuration.
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Listen address of the public service API.
    pub service_addr: SocketAddr,
    /// Listen address of the admin API.
    pub admin_addr: SocketAddr,
    /// Directory for the claim log. In-memory storage when `None`.
    pub storage_path: Option<PathBuf>,
    /// Hex Ed25519 secret key for root signatures. Ephemeral when `None`.
    pub signing_key_hex: Option<String>,
    /// Whether `/metrics` and the metrics middleware are mounted.
    pub metrics_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_addr: SocketAddr::from(([0, 0, 0, 0], 6000)),
            admin_addr: SocketAddr::from(([127, 0, 0, 1], 6001)),
            storage_path: None,
            signing_key_hex: None,
            metrics_enabled: true,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("service_addr", &self.service_addr)
            .field("admin_addr", &self.admin_addr)
            .field("storage_path", &self.storage_path)
            .field(
                "signing_key_hex",
                &self.signing_key_hex.as_ref().map(|_| "[REDACTED]"),
            )
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl AppConfig {
    /// Load defaults, then `CLAIMSRV_CONFIG`, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Parse a YAML config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Parse YAML config text.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("CLAIMSRV_SERVICE_ADDR") {
            self.service_addr = parse_addr("CLAIMSRV_SERVICE_ADDR", &v)?;
        }
        if let Some(v) = lookup("CLAIMSRV_ADMIN_ADDR") {
            self.admin_addr = parse_addr("CLAIMSRV_ADMIN_ADDR", &v)?;
        }
        if let Some(v) = lookup("CLAIMSRV_STORAGE_PATH") {
            self.storage_path = (!v.trim().is_empty()).then(|| PathBuf::from(v));
        }
        if let Some(v) = lookup("CLAIMSRV_SIGNING_KEY_HEX") {
            self.signing_key_hex = (!v.trim().is_empty()).then(|| v.trim().to_string());
        }
        if let Some(v) = lookup("CLAIMSRV_METRICS_ENABLED") {
            self.metrics_enabled = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(ConfigError::InvalidEnv {
                        var: "CLAIMSRV_METRICS_ENABLED",
                        reason: format!("expected a boolean, got {other:?}"),
                    })
                }
            };
        }
        Ok(())
    }
}

fn parse_addr(var: &'static str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.trim().parse().map_err(|e| ConfigError::InvalidEnv {
        var,
        reason: format!("{e}: {value:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let c = AppConfig::default();
        assert_eq!(c.service_addr.port(), 6000);
        assert_eq!(c.admin_addr.to_string(), "127.0.0.1:6001");
        assert!(c.storage_path.is_none());
        assert!(c.metrics_enabled);
    }

    #[test]
    fn yaml_overrides_defaults() {
        let c = AppConfig::from_yaml(
            "service_addr: 127.0.0.1:7000\nstorage_path: /var/lib/claimsrv\n",
        )
        .unwrap();
        assert_eq!(c.service_addr.port(), 7000);
        assert_eq!(c.admin_addr.port(), 6001);
        assert_eq!(c.storage_path, Some(PathBuf::from("/var/lib/claimsrv")));
    }

    #[test]
    fn empty_yaml_is_default() {
        let c = AppConfig::from_yaml("  \n").unwrap();
        assert_eq!(c.service_addr, AppConfig::default().service_addr);
    }

    #[test]
    fn yaml_rejects_unknown_keys() {
        assert!(matches!(
            AppConfig::from_yaml("bogus: 1\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn env_overrides_yaml() {
        let mut c = AppConfig::from_yaml("metrics_enabled: true\n").unwrap();
        c.apply_env(env(&[
            ("CLAIMSRV_ADMIN_ADDR", "0.0.0.0:9001"),
            ("CLAIMSRV_METRICS_ENABLED", "false"),
            ("CLAIMSRV_SIGNING_KEY_HEX", " abcd "),
        ]))
        .unwrap();
        assert_eq!(c.admin_addr.port(), 9001);
        assert!(!c.metrics_enabled);
        assert_eq!(c.signing_key_hex.as_deref(), Some("abcd"));
    }

    #[test]
    fn invalid_env_is_reported() {
        let mut c = AppConfig::default();
        let err = c
            .apply_env(env(&[("CLAIMSRV_SERVICE_ADDR", "not-an-addr")]))
            .unwrap_err();
        assert!(err.to_string().contains("CLAIMSRV_SERVICE_ADDR"));

        let err = c
            .apply_env(env(&[("CLAIMSRV_METRICS_ENABLED", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AppConfig::from_file(Path::new("/nonexistent/claimsrv.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn debug_redacts_signing_key() {
        let c = AppConfig {
            signing_key_hex: Some("deadbeef".into()),
            ..AppConfig::default()
        };
        let dbg = format!("{c:?}");
        assert!(dbg.contains("[REDACTED]"));
        assert!(!dbg.contains("deadbeef"));
    }
}
