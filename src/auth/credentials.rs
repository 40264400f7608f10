//! Credential storage for the session manager
//!
//! A [`CredentialStore`] holds the current access credential and, in the
//! dual-durable persistence mode, the refresh credential. Stores never
//! perform network I/O; every mutation comes from the identity gateway.
//!
//! Three implementations are provided:
//!
//! - [`MemoryCredentialStore`] -- process memory only. Used by the
//!   cookie-refresh mode, where the refresh credential lives in the HTTP
//!   client's cookie jar and never reaches application code.
//! - [`KeyringCredentialStore`] -- the OS native credential store (Keychain,
//!   Secret Service, Windows Credential Manager).
//! - [`FileCredentialStore`] -- a JSON file in the platform data directory,
//!   for hosts without a keyring daemon.
//!
//! The durable stores cache the record in memory, load it once on
//! construction, and write through synchronously on every `set`/`clear`.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{MeetspaceError, Result};

// ---------------------------------------------------------------------------
// CredentialPersistence
// ---------------------------------------------------------------------------

/// Where the refresh credential lives.
///
/// Selected once at startup; immutable for the lifetime of a session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialPersistence {
    /// Access credential in memory; refresh credential in a server-set
    /// cookie that application code never reads.
    MemoryWithCookieRefresh,
    /// Both credentials in client-readable durable storage.
    #[default]
    DualDurable,
}

impl CredentialPersistence {
    /// Returns `true` when the refresh credential is held by application code.
    pub fn exposes_refresh(self) -> bool {
        matches!(self, CredentialPersistence::DualDurable)
    }
}

impl std::str::FromStr for CredentialPersistence {
    type Err = MeetspaceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "memory_with_cookie_refresh" | "cookie" | "memory" => {
                Ok(CredentialPersistence::MemoryWithCookieRefresh)
            }
            "dual_durable" | "durable" => Ok(CredentialPersistence::DualDurable),
            other => Err(MeetspaceError::Config(format!(
                "Invalid session persistence: {}. Must be one of: dual_durable, memory_with_cookie_refresh",
                other
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// StoredCredentials
// ---------------------------------------------------------------------------

/// The credential pair persisted by a [`CredentialStore`].
///
/// Both values are opaque strings; they are never decoded on the client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    /// Short-lived access credential sent as a bearer token.
    pub access: String,

    /// Longer-lived refresh credential. Always `None` in cookie mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

impl StoredCredentials {
    /// Builds a credential pair.
    pub fn new(access: impl Into<String>, refresh: Option<String>) -> Self {
        Self {
            access: access.into(),
            refresh,
        }
    }
}

impl std::fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("access", &"<redacted>")
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

/// Storage strategy for session credentials.
///
/// Chosen once at construction time and injected into the session manager as
/// `Arc<dyn CredentialStore>`.
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    /// Returns the current access credential, if any.
    fn access(&self) -> Option<String>;

    /// Returns the stored refresh credential, if any.
    fn refresh(&self) -> Option<String>;

    /// Replaces both credentials.
    fn set(&self, credentials: StoredCredentials) -> Result<()>;

    /// Replaces only the access credential, keeping the refresh credential.
    ///
    /// Used after a silent refresh that did not rotate the refresh credential.
    fn set_access(&self, access: &str) -> Result<()>;

    /// Removes all credentials.
    fn clear(&self) -> Result<()>;
}

/// Shared in-memory cell used by all stores as their read cache.
#[derive(Debug, Default)]
struct CredentialCell {
    inner: RwLock<Option<StoredCredentials>>,
}

impl CredentialCell {
    fn with(initial: Option<StoredCredentials>) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    fn get(&self) -> Option<StoredCredentials> {
        self.inner.read().ok().and_then(|guard| guard.clone())
    }

    fn replace(&self, value: Option<StoredCredentials>) -> Result<()> {
        let mut guard = self.inner.write().map_err(|_| {
            MeetspaceError::Storage("Failed to acquire write lock on credentials".to_string())
        })?;
        *guard = value;
        Ok(())
    }

    /// Computes the record that `set_access` would produce.
    fn with_access(&self, access: &str) -> StoredCredentials {
        let refresh = self.get().and_then(|c| c.refresh);
        StoredCredentials::new(access, refresh)
    }
}

// ---------------------------------------------------------------------------
// MemoryCredentialStore
// ---------------------------------------------------------------------------

/// Credential store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    cell: CredentialCell,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `credentials`.
    ///
    /// # Examples
    ///
    /// ```
    /// use meetspace::auth::credentials::{CredentialStore, MemoryCredentialStore, StoredCredentials};
    ///
    /// let store = MemoryCredentialStore::with_credentials(StoredCredentials::new(
    ///     "T1",
    ///     Some("R1".to_string()),
    /// ));
    /// assert_eq!(store.access().as_deref(), Some("T1"));
    /// assert_eq!(store.refresh().as_deref(), Some("R1"));
    /// ```
    pub fn with_credentials(credentials: StoredCredentials) -> Self {
        Self {
            cell: CredentialCell::with(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn access(&self) -> Option<String> {
        self.cell.get().map(|c| c.access)
    }

    fn refresh(&self) -> Option<String> {
        self.cell.get().and_then(|c| c.refresh)
    }

    fn set(&self, credentials: StoredCredentials) -> Result<()> {
        self.cell.replace(Some(credentials))
    }

    fn set_access(&self, access: &str) -> Result<()> {
        let updated = self.cell.with_access(access);
        self.cell.replace(Some(updated))
    }

    fn clear(&self) -> Result<()> {
        self.cell.replace(None)
    }
}

// ---------------------------------------------------------------------------
// KeyringCredentialStore
// ---------------------------------------------------------------------------

/// Credential store backed by the OS native keyring.
///
/// The credential pair is serialized to JSON and stored as a single keyring
/// entry under `service`/`account`.
#[derive(Debug)]
pub struct KeyringCredentialStore {
    service: String,
    account: String,
    cell: CredentialCell,
}

impl KeyringCredentialStore {
    /// Builds the keyring service name for an API base URL.
    ///
    /// Prefixing with `meetspace-` avoids collisions with other applications,
    /// and keying by host keeps sessions for different deployments apart.
    pub fn service_name(host: &str) -> String {
        format!("meetspace-{}", host)
    }

    /// Opens the keyring entry and loads any stored credentials.
    ///
    /// # Errors
    ///
    /// Returns [`MeetspaceError::Keyring`] if the OS credential store fails or
    /// [`MeetspaceError::Serialization`] if the stored record is malformed.
    pub fn open(service: impl Into<String>, account: impl Into<String>) -> Result<Self> {
        let service = service.into();
        let account = account.into();
        let entry = keyring::Entry::new(&service, &account).map_err(MeetspaceError::Keyring)?;

        let initial = match entry.get_password() {
            Ok(json_str) if json_str.is_empty() => None,
            Ok(json_str) => Some(serde_json::from_str::<StoredCredentials>(&json_str)?),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => return Err(MeetspaceError::Keyring(e).into()),
        };

        tracing::debug!(
            service = %service,
            restored = initial.is_some(),
            "Opened keyring credential store"
        );

        Ok(Self {
            service,
            account,
            cell: CredentialCell::with(initial),
        })
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| MeetspaceError::Keyring(e).into())
    }

    fn persist(&self, credentials: &StoredCredentials) -> Result<()> {
        let json_str = serde_json::to_string(credentials)?;
        self.entry()?
            .set_password(&json_str)
            .map_err(MeetspaceError::Keyring)?;
        Ok(())
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn access(&self) -> Option<String> {
        self.cell.get().map(|c| c.access)
    }

    fn refresh(&self) -> Option<String> {
        self.cell.get().and_then(|c| c.refresh)
    }

    fn set(&self, credentials: StoredCredentials) -> Result<()> {
        self.persist(&credentials)?;
        self.cell.replace(Some(credentials))
    }

    fn set_access(&self, access: &str) -> Result<()> {
        let updated = self.cell.with_access(access);
        self.persist(&updated)?;
        self.cell.replace(Some(updated))
    }

    fn clear(&self) -> Result<()> {
        self.cell.replace(None)?;
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(MeetspaceError::Keyring(e).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// FileCredentialStore
// ---------------------------------------------------------------------------

/// Credential store backed by a JSON file.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    cell: CredentialCell,
}

impl FileCredentialStore {
    /// Default credentials file inside the user's data directory.
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "meetspace", "meetspace").ok_or_else(|| {
            MeetspaceError::Storage("Could not determine data directory".to_string())
        })?;
        Ok(proj_dirs.data_dir().join("credentials.json"))
    }

    /// Opens (or lazily creates) the credentials file at `path`.
    ///
    /// A missing file means "no stored session". An empty or unparsable file
    /// is reported as an error rather than silently discarded.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let initial = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read credentials file {}", path.display()))
                .map_err(|e| MeetspaceError::Storage(e.to_string()))?;
            if contents.trim().is_empty() {
                None
            } else {
                Some(serde_json::from_str::<StoredCredentials>(&contents)?)
            }
        } else {
            None
        };

        tracing::debug!(
            path = %path.display(),
            restored = initial.is_some(),
            "Opened file credential store"
        );

        Ok(Self {
            path,
            cell: CredentialCell::with(initial),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, credentials: &StoredCredentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create credentials directory")
                .map_err(|e| MeetspaceError::Storage(e.to_string()))?;
        }
        let json_str = serde_json::to_string_pretty(credentials)?;
        std::fs::write(&self.path, json_str)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn access(&self) -> Option<String> {
        self.cell.get().map(|c| c.access)
    }

    fn refresh(&self) -> Option<String> {
        self.cell.get().and_then(|c| c.refresh)
    }

    fn set(&self, credentials: StoredCredentials) -> Result<()> {
        self.persist(&credentials)?;
        self.cell.replace(Some(credentials))
    }

    fn set_access(&self, access: &str) -> Result<()> {
        let updated = self.cell.with_access(access);
        self.persist(&updated)?;
        self.cell.replace(Some(updated))
    }

    fn clear(&self) -> Result<()> {
        self.cell.replace(None)?;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MeetspaceError::Io(e).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
