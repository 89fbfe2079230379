//! # Startup Bootstrap
//!
//! Turns an [`AppConfig`] into a ready [`AppState`]:
//!
//! 1. **Open the claim store**: file log under `storage_path`, or memory.
//! 2. **Load the signing key**: from `signing_key_hex`, or generate an
//!    ephemeral key and warn.
//! 3. **Replay the registry**: rebuild the accumulator from the store.
//! 4. **Build metrics** when enabled.
//! 5. **Log a startup banner** with the root and public key.

use std::sync::Arc;

use claimsrv_crypto::{CryptoError, RootSigner};
use claimsrv_registry::{
    ClaimRegistry, ClaimStore, FileClaimStore, MemoryClaimStore, RegistryError, StoreError,
};

use crate::config::AppConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Errors during startup.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The claim store could not be opened.
    #[error("cannot open claim store: {0}")]
    Store(#[from] StoreError),

    /// The configured signing key is invalid.
    #[error("signing key error: {0}")]
    SigningKey(#[from] CryptoError),

    /// Replaying the store into the registry failed.
    #[error("registry replay failed: {0}")]
    Registry(#[from] RegistryError),

    /// Metrics registration failed.
    #[error("metrics setup failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Build application state from configuration.
pub fn bootstrap(config: AppConfig) -> Result<AppState, BootstrapError> {
    let store = open_store(&config)?;
    let (signer, key_ephemeral) = load_signing_key(&config)?;
    let registry = Arc::new(ClaimRegistry::open(store, signer)?);
    let metrics = if config.metrics_enabled {
        Some(ApiMetrics::new()?)
    } else {
        None
    };
    log_banner(&config, &registry, key_ephemeral);
    Ok(AppState::new(registry, config, metrics, key_ephemeral))
}

fn open_store(config: &AppConfig) -> Result<Arc<dyn ClaimStore>, BootstrapError> {
    match &config.storage_path {
        Some(dir) => {
            let store = FileClaimStore::open(dir)?;
            tracing::info!(path = %store.path().display(), "using file claim store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("no storage path configured; claims are held in memory only");
            Ok(Arc::new(MemoryClaimStore::new()))
        }
    }
}

fn load_signing_key(config: &AppConfig) -> Result<(RootSigner, bool), BootstrapError> {
    match &config.signing_key_hex {
        Some(hex) => Ok((RootSigner::from_hex(hex)?, false)),
        None => {
            tracing::warn!(
                "no signing key configured; generated an ephemeral root signing key. \
                 Root signatures will not verify after restart."
            );
            Ok((RootSigner::generate(), true))
        }
    }
}

fn log_banner(config: &AppConfig, registry: &ClaimRegistry, key_ephemeral: bool) {
    let root = registry.root();
    tracing::info!(
        service_addr = %config.service_addr,
        admin_addr = %config.admin_addr,
        store = registry.store_kind(),
        version = root.version,
        root = %root.root,
        public_key = %registry.public_key(),
        key_ephemeral,
        metrics = config.metrics_enabled,
        "claimsrv bootstrapped"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_bootstraps_in_memory() {
        let state = bootstrap(AppConfig::default()).unwrap();
        assert!(state.key_ephemeral);
        assert!(state.metrics.is_some());
        assert_eq!(state.registry.store_kind(), "memory");
        assert_eq!(state.registry.version(), 0);
    }

    #[test]
    fn configured_key_is_not_ephemeral() {
        let config = AppConfig {
            signing_key_hex: Some("42".repeat(32)),
            metrics_enabled: false,
            ..AppConfig::default()
        };
        let state = bootstrap(config).unwrap();
        assert!(!state.key_ephemeral);
        assert!(state.metrics.is_none());
        let expected = RootSigner::from_hex(&"42".repeat(32)).unwrap().public_key();
        assert_eq!(state.registry.public_key(), expected);
    }

    #[test]
    fn bad_key_fails() {
        let config = AppConfig {
            signing_key_hex: Some("0x1234".into()),
            ..AppConfig::default()
        };
        assert!(matches!(
            bootstrap(config),
            Err(BootstrapError::SigningKey(_))
        ));
    }

    #[test]
    fn file_storage_replays() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig {
            storage_path: Some(dir.path().to_path_buf()),
            signing_key_hex: Some("01".repeat(32)),
            ..AppConfig::default()
        };
        let claim = claimsrv_core::Claim::new(b"i".to_vec(), b"d".to_vec()).unwrap();
        let root = {
            let state = bootstrap(config.clone()).unwrap();
            state.registry.insert(claim).unwrap();
            state.registry.root()
        };
        let state = bootstrap(config).unwrap();
        assert_eq!(state.registry.store_kind(), "file");
        assert_eq!(state.registry.root(), root);
    }
}
