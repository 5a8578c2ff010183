//! Application configuration management.
//!
//! This module handles loading and saving the client configuration:
//! API endpoint, transport policy, credential lifetimes and storage backend,
//! plus the last email used to sign in.
//!
//! Configuration is stored at `~/.config/videogen/config.json`.
//! `VIDEOGEN_API_URL` overrides the API base URL.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::{ClientConfig, DEFAULT_API_BASE_URL, REQUEST_TIMEOUT_SECS};
use crate::auth::credentials::{ACCESS_TOKEN_TTL_DAYS, REFRESH_TOKEN_TTL_DAYS};
use crate::auth::{CredentialBackend, CredentialStore, ExpiryPolicy, FileBackend, KeyringBackend};
use crate::studio::queue::GENERATION_DELAY_SECS;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "videogen";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "VIDEOGEN_API_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackendKind {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Refuse plain-HTTP API URLs. Turn on for production deployments.
    pub secure_transport: bool,
    pub access_token_ttl_days: i64,
    pub refresh_token_ttl_days: i64,
    pub credential_backend: CredentialBackendKind,
    pub generation_delay_secs: u64,
    pub last_email: Option<String>,
    pub log_to_file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            secure_transport: false,
            access_token_ttl_days: ACCESS_TOKEN_TTL_DAYS,
            refresh_token_ttl_days: REFRESH_TOKEN_TTL_DAYS,
            credential_backend: CredentialBackendKind::default(),
            generation_delay_secs: GENERATION_DELAY_SECS,
            last_email: None,
            log_to_file: false,
        }
    }
}

impl Config {
    /// Load from the default location; a missing file yields the defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Replace the file in one step so a crash never leaves half a config
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let staged = path.with_extension("json.tmp");
        std::fs::write(&staged, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", staged.display()))?;
        std::fs::rename(&staged, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
            .context("No per-user config directory on this platform")
    }

    /// Where credentials and logs live
    pub fn cache_dir(&self) -> Result<PathBuf> {
        dirs::cache_dir()
            .map(|dir| dir.join(APP_NAME))
            .context("No per-user cache directory on this platform")
    }

    /// Apply overrides from the environment
    pub fn apply_env(&mut self) {
        self.apply_api_url(std::env::var(API_URL_ENV).ok());
    }

    fn apply_api_url(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_base_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            secure_transport: self.secure_transport,
        }
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::from_days(self.access_token_ttl_days, self.refresh_token_ttl_days)
    }

    pub fn generation_delay(&self) -> Duration {
        Duration::from_secs(self.generation_delay_secs)
    }

    /// Build the credential store selected by `credential_backend`
    pub fn credential_store(&self) -> Result<CredentialStore> {
        let backend: Arc<dyn CredentialBackend> = match self.credential_backend {
            CredentialBackendKind::File => Arc::new(FileBackend::in_dir(&self.cache_dir()?)),
            CredentialBackendKind::Keyring => Arc::new(KeyringBackend::new()),
        };
        Ok(CredentialStore::new(backend, self.expiry_policy()))
    }
}
