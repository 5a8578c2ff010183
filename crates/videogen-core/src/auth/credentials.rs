use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Keychain service name
const SERVICE_NAME: &str = "videogen";

/// Keychain account holding the token record
const KEYRING_ACCOUNT: &str = "session-tokens";

/// Credentials file name in cache directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Access credentials are short-lived.
pub const ACCESS_TOKEN_TTL_DAYS: i64 = 7;

/// Refresh credentials outlive access credentials so a returning user
/// can be silently re-issued an access token.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 30;

/// Configured lifetimes are capped here (ten years)
const MAX_TOKEN_TTL_DAYS: i64 = 3650;

/// Access and refresh credentials. Always written and cleared together.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens must never end up in logs
impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .finish()
    }
}

/// How long each credential stays usable after it is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl ExpiryPolicy {
    /// The access TTL is clamped to the refresh TTL, so a usable access
    /// token always comes with a usable refresh token.
    pub fn new(access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            access_ttl: access_ttl.min(refresh_ttl),
            refresh_ttl,
        }
    }

    /// Day counts are clamped to `0..=MAX_TOKEN_TTL_DAYS`
    pub fn from_days(access_days: i64, refresh_days: i64) -> Self {
        let days = |n: i64| Duration::days(n.clamp(0, MAX_TOKEN_TTL_DAYS));
        Self::new(days(access_days), days(refresh_days))
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::from_days(ACCESS_TOKEN_TTL_DAYS, REFRESH_TOKEN_TTL_DAYS)
    }
}

/// On-disk representation of a credential pair with per-token expiry
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl StoredCredentials {
    pub fn issue(pair: &CredentialPair, policy: &ExpiryPolicy, now: DateTime<Utc>) -> Self {
        Self {
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
            access_expires_at: expiry(now, policy.access_ttl),
            refresh_expires_at: expiry(now, policy.refresh_ttl),
        }
    }

    pub fn access_token_at(&self, now: DateTime<Utc>) -> Option<&str> {
        (now < self.access_expires_at).then_some(self.access_token.as_str())
    }

    pub fn refresh_token_at(&self, now: DateTime<Utc>) -> Option<&str> {
        (now < self.refresh_expires_at).then_some(self.refresh_token.as_str())
    }

    /// The full pair, only while both halves are still live
    pub fn pair_at(&self, now: DateTime<Utc>) -> Option<CredentialPair> {
        match (self.access_token_at(now), self.refresh_token_at(now)) {
            (Some(access), Some(refresh)) => Some(CredentialPair::new(access, refresh)),
            _ => None,
        }
    }

    pub fn is_dead_at(&self, now: DateTime<Utc>) -> bool {
        self.access_token_at(now).is_none() && self.refresh_token_at(now).is_none()
    }
}

/// `now + ttl`, saturating at the latest representable instant
fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl std::fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish_non_exhaustive()
    }
}

/// Durable storage for a single `StoredCredentials` record.
///
/// Every write replaces the whole record so both tokens always change together.
pub trait CredentialBackend: Send + Sync {
    fn load(&self) -> Result<Option<StoredCredentials>>;
    fn save(&self, credentials: &StoredCredentials) -> Result<()>;
    fn delete(&self) -> Result<()>;
}

/// JSON file in the cache directory, readable only by the current user
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_dir(cache_dir: &Path) -> Self {
        Self::new(cache_dir.join(CREDENTIALS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    fn write_private(path: &Path, contents: &str) -> Result<()> {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .context("Failed to open credentials file")?;
        file.write_all(contents.as_bytes())
            .context("Failed to write credentials file")?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn write_private(path: &Path, contents: &str) -> Result<()> {
        std::fs::write(path, contents).context("Failed to write credentials file")
    }
}

impl CredentialBackend for FileBackend {
    fn load(&self) -> Result<Option<StoredCredentials>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read credentials file")?;
        let credentials = serde_json::from_str(&contents)
            .context("Failed to parse credentials file")?;
        Ok(Some(credentials))
    }

    fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(credentials)?;

        // Write then rename so readers never see half a record
        let tmp = self.path.with_extension("json.tmp");
        Self::write_private(&tmp, &contents)?;
        std::fs::rename(&tmp, &self.path).context("Failed to replace credentials file")?;
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to delete credentials file")?;
        }
        Ok(())
    }
}

/// OS keychain. The record is stored as one JSON secret.
pub struct KeyringBackend {
    service: String,
    account: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self::with_names(SERVICE_NAME, KEYRING_ACCOUNT)
    }

    pub fn with_names(service: &str, account: &str) -> Self {
        Self {
            service: service.to_string(),
            account: account.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, &self.account).context("Failed to create keyring entry")
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialBackend for KeyringBackend {
    fn load(&self) -> Result<Option<StoredCredentials>> {
        match self.entry()?.get_password() {
            Ok(secret) => {
                let credentials = serde_json::from_str(&secret)
                    .context("Failed to parse credentials from keychain")?;
                Ok(Some(credentials))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve credentials from keychain"),
        }
    }

    fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        let secret = serde_json::to_string(credentials)?;
        self.entry()?
            .set_password(&secret)
            .context("Failed to store credentials in keychain")?;
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credentials from keychain"),
        }
    }
}

/// Process-local storage for tests and `--ephemeral` runs
#[derive(Default)]
pub struct MemoryBackend {
    slot: Mutex<Option<StoredCredentials>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<StoredCredentials>>> {
        self.slot
            .lock()
            .map_err(|_| anyhow::anyhow!("Credential memory slot poisoned"))
    }
}

impl CredentialBackend for MemoryBackend {
    fn load(&self) -> Result<Option<StoredCredentials>> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        *self.lock()? = Some(credentials.clone());
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}

/// Best-effort credential store.
///
/// Storage failures are logged and otherwise invisible: a credential that
/// cannot be read is treated as absent.
pub struct CredentialStore {
    backend: Arc<dyn CredentialBackend>,
    policy: ExpiryPolicy,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn CredentialBackend>, policy: ExpiryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), ExpiryPolicy::default())
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    fn read(&self) -> Option<StoredCredentials> {
        match self.backend.load() {
            Ok(Some(stored)) => {
                if stored.is_dead_at(Utc::now()) {
                    debug!("Stored credentials fully expired, removing");
                    self.clear();
                    None
                } else {
                    Some(stored)
                }
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored credentials");
                None
            }
        }
    }

    /// The stored pair, if both credentials are still live
    pub fn get(&self) -> Option<CredentialPair> {
        self.read().and_then(|s| s.pair_at(Utc::now()))
    }

    pub fn access_token(&self) -> Option<String> {
        self.read()
            .and_then(|s| s.access_token_at(Utc::now()).map(str::to_string))
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read()
            .and_then(|s| s.refresh_token_at(Utc::now()).map(str::to_string))
    }

    pub fn has_credentials(&self) -> bool {
        self.get().is_some()
    }

    pub fn set(&self, pair: &CredentialPair) {
        let stored = StoredCredentials::issue(pair, &self.policy, Utc::now());
        if let Err(e) = self.backend.save(&stored) {
            warn!(error = %e, "Failed to persist credentials");
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.backend.delete() {
            warn!(error = %e, "Failed to clear credentials");
        }
    }
}
