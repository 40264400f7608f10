//! Session state: identity, phase, and the derived authorization view
//!
//! [`SessionState`] is the in-process half of a session. The credential
//! half lives in a [`CredentialStore`](super::credentials::CredentialStore);
//! the two are only ever changed together, under this state's write lock, so
//! that a reader never sees a credential without an identity or the reverse.

use std::collections::BTreeSet;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{MeetspaceError, Result};

/// Role name that grants administrative access.
pub const ADMIN_ROLE: &str = "admin";

/// Snapshot of the authenticated user as returned by the identity endpoint.
///
/// Replaced wholesale on every fetch; never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Server-side user id
    pub id: i64,
    /// Login email
    pub email: String,
    /// Given name
    #[serde(default)]
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Role names, e.g. `["user"]` or `["admin"]`
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Identity {
    /// Returns `true` if the identity carries `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Returns `true` if the identity carries the admin role.
    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    /// Full name, falling back to the email when no name is set.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

/// Lifecycle phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No identity; initial phase and the phase after any termination.
    Unauthenticated,
    /// Restoring a session from persisted or cookie-held credentials.
    Bootstrapping,
    /// Identity known and credentials held.
    Authenticated,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Unauthenticated => "unauthenticated",
            SessionPhase::Bootstrapping => "bootstrapping",
            SessionPhase::Authenticated => "authenticated",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct StateInner {
    phase: SessionPhase,
    identity: Option<Identity>,
    /// Incremented on every reset.
    epoch: u64,
}

/// Thread-safe session state shared by the gateway and the session manager.
#[derive(Debug)]
pub struct SessionState {
    inner: RwLock<StateInner>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Creates an unauthenticated state.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StateInner {
                phase: SessionPhase::Unauthenticated,
                identity: None,
                epoch: 0,
            }),
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.inner
            .read()
            .map(|s| s.phase)
            .unwrap_or(SessionPhase::Unauthenticated)
    }

    /// Current identity, if authenticated.
    pub fn identity(&self) -> Option<Identity> {
        self.inner.read().ok().and_then(|s| s.identity.clone())
    }

    /// `true` while an identity is held.
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .read()
            .map(|s| s.identity.is_some())
            .unwrap_or(false)
    }

    /// `true` when the held identity carries the admin role.
    pub fn is_admin(&self) -> bool {
        self.inner
            .read()
            .map(|s| s.identity.as_ref().is_some_and(Identity::is_admin))
            .unwrap_or(false)
    }

    /// Role set of the held identity; empty when unauthenticated.
    pub fn roles(&self) -> BTreeSet<String> {
        self.identity()
            .map(|i| i.roles.into_iter().collect())
            .unwrap_or_default()
    }

    /// Enters [`SessionPhase::Bootstrapping`] unless already authenticated.
    ///
    /// Returns `false` if the state was already authenticated.
    pub(crate) fn begin_bootstrap(&self) -> bool {
        match self.inner.write() {
            Ok(mut s) if s.identity.is_none() => {
                s.phase = SessionPhase::Bootstrapping;
                true
            }
            _ => false,
        }
    }

    /// Runs `persist` and, if it succeeds, installs `identity`.
    ///
    /// The write lock is held across both steps so no reader observes
    /// credentials without the matching identity.
    pub(crate) fn establish_with<F>(&self, identity: Identity, persist: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut guard = self.inner.write().map_err(|_| {
            MeetspaceError::Storage("Failed to acquire write lock on session".to_string())
        })?;
        persist()?;
        guard.identity = Some(identity);
        guard.phase = SessionPhase::Authenticated;
        Ok(())
    }

    /// Reset counter, captured before work that must not outlive a reset.
    pub(crate) fn epoch(&self) -> u64 {
        match self.inner.read() {
            Ok(guard) => guard.epoch,
            Err(poisoned) => poisoned.into_inner().epoch,
        }
    }

    /// Runs `persist` under the write lock if no reset happened since
    /// `epoch` was captured.
    ///
    /// Returns `Ok(false)` without calling `persist` when the session was
    /// reset in between.
    pub(crate) fn persist_if_current<F>(&self, epoch: u64, persist: F) -> Result<bool>
    where
        F: FnOnce() -> Result<()>,
    {
        let guard = self.inner.write().map_err(|_| {
            MeetspaceError::Storage("Failed to acquire write lock on session".to_string())
        })?;
        if guard.epoch != epoch {
            return Ok(false);
        }
        persist()?;
        Ok(true)
    }

    /// Installs `identity` without touching credentials.
    pub(crate) fn establish(&self, identity: Identity) -> Result<()> {
        self.establish_with(identity, || Ok(()))
    }

    /// Drops the identity and runs `clear` under the write lock.
    ///
    /// `clear` receives whether an identity was held and returns whether the
    /// session was live before this call. The returned flag is passed back to
    /// the caller.
    pub(crate) fn reset_with<F>(&self, clear: F) -> bool
    where
        F: FnOnce(bool) -> bool,
    {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let had_identity = guard.identity.take().is_some();
        guard.phase = SessionPhase::Unauthenticated;
        guard.epoch = guard.epoch.wrapping_add(1);
        clear(had_identity)
    }
}
