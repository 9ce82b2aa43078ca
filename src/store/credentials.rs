//! Credential stores: OS keychain and environment variables.

use super::{CredentialStore, StoreError};

/// Keychain service name for every scout credential.
pub const SERVICE_NAME: &str = "scout";

/// Credentials in the platform keychain (Secret Service, macOS Keychain,
/// Windows Credential Manager) via `keyring`, one entry per provider.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringCredentialStore {
    /// Store under the [`SERVICE_NAME`] service.
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Store under a custom service name.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, provider: &str) -> Result<keyring::Entry, StoreError> {
        keyring::Entry::new(&self.service, provider)
            .map_err(|e| StoreError::Keyring(format!("failed to open keyring entry: {e}")))
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get(&self, provider: &str) -> Option<String> {
        let entry = self.entry(provider).ok()?;
        match entry.get_password() {
            Ok(key) => Some(key),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                tracing::warn!(provider, error = %e, "failed to read credential from keyring");
                None
            }
        }
    }

    fn set(&self, provider: &str, key: &str) -> Result<(), StoreError> {
        self.entry(provider)?
            .set_password(key)
            .map_err(|e| StoreError::Keyring(format!("failed to store credential: {e}")))
    }

    fn remove(&self, provider: &str) -> Result<(), StoreError> {
        match self.entry(provider)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::Keyring(format!(
                "failed to delete credential: {e}"
            ))),
        }
    }
}

/// Read-only credentials from `<PROVIDER>_API_KEY` environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentialStore;

impl EnvCredentialStore {
    /// Variable consulted for `provider`, e.g. `OPENAI_API_KEY`.
    pub fn var_name(provider: &str) -> String {
        let name: String = provider
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{name}_API_KEY")
    }
}

impl CredentialStore for EnvCredentialStore {
    fn get(&self, provider: &str) -> Option<String> {
        std::env::var(Self::var_name(provider))
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    fn set(&self, _provider: &str, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly("environment credential store"))
    }

    fn remove(&self, _provider: &str) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly("environment credential store"))
    }
}
