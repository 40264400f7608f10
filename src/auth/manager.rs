//! Session manager façade
//!
//! [`SessionManager`] is the handle the rest of the client holds. It owns
//! the credential store, the session state, the identity gateway and the
//! termination broadcast, and exposes the read-only authorization view used
//! by the navigation guard.
//!
//! The handle is cheap to clone; clones share one session.
//!
//! # Examples
//!
//! ```no_run
//! use meetspace::auth::manager::SessionManager;
//! use meetspace::config::Config;
//!
//! # async fn example() -> meetspace::error::Result<()> {
//! let session = SessionManager::from_config(&Config::default())?;
//! let mut ended = session.subscribe();
//!
//! session.ensure_bootstrapped().await;
//! if !session.is_authenticated() {
//!     session.login("jan@example.com", "secret").await?;
//! }
//! # drop(ended.try_recv());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::api::client::build_http_client;
use crate::api::endpoint::ApiBase;
use crate::auth::credentials::{
    CredentialPersistence, CredentialStore, FileCredentialStore, KeyringCredentialStore,
    MemoryCredentialStore,
};
use crate::auth::gateway::{IdentityGateway, LoginRequest, RegisterRequest};
use crate::auth::session::{Identity, SessionPhase, SessionState};
use crate::auth::termination::{TerminationBroadcast, TerminationSubscription};
use crate::config::{Config, StorageBackend};
use crate::error::{MeetspaceError, Result};

/// Keyring account name under which credentials are stored.
pub const KEYRING_ACCOUNT: &str = "session";

struct Inner {
    http: reqwest::Client,
    base: ApiBase,
    persistence: CredentialPersistence,
    store: Arc<dyn CredentialStore>,
    state: Arc<SessionState>,
    termination: TerminationBroadcast,
    gateway: IdentityGateway,
    bootstrap: OnceCell<()>,
}

/// Handle to the client's single authentication session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("base", &self.inner.base)
            .field("persistence", &self.inner.persistence)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a session manager over an injected store.
    ///
    /// In cookie mode `http` must have a cookie store enabled, see
    /// [`build_http_client`].
    pub fn new(
        http: reqwest::Client,
        base: ApiBase,
        persistence: CredentialPersistence,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let state = Arc::new(SessionState::new());
        let termination = TerminationBroadcast::new();
        let gateway = IdentityGateway::new(
            http.clone(),
            base.clone(),
            persistence,
            Arc::clone(&store),
            Arc::clone(&state),
            termination.clone(),
        );

        Self {
            inner: Arc::new(Inner {
                http,
                base,
                persistence,
                store,
                state,
                termination,
                gateway,
                bootstrap: OnceCell::new(),
            }),
        }
    }

    /// Creates a session manager from configuration.
    ///
    /// Cookie mode always uses an in-memory store. Dual-durable mode opens
    /// the configured file or keyring store, loading any saved credentials.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid, the HTTP client cannot be
    /// built, or the durable store cannot be opened
    pub fn from_config(config: &Config) -> Result<Self> {
        let base = ApiBase::parse(&config.api.base_url)?;
        let persistence = config.session.persistence;
        let http = build_http_client(&config.api, persistence)?;

        let store: Arc<dyn CredentialStore> = match persistence {
            CredentialPersistence::MemoryWithCookieRefresh => {
                Arc::new(MemoryCredentialStore::new())
            }
            CredentialPersistence::DualDurable => match config.session.storage {
                StorageBackend::Keyring => Arc::new(KeyringCredentialStore::open(
                    KeyringCredentialStore::service_name(base.host()),
                    KEYRING_ACCOUNT,
                )?),
                StorageBackend::File => {
                    let path = match &config.session.credentials_path {
                        Some(path) => path.clone(),
                        None => FileCredentialStore::default_path()?,
                    };
                    Arc::new(FileCredentialStore::open(path)?)
                }
            },
        };

        tracing::debug!(base = %base, ?persistence, "Session manager initialized");
        Ok(Self::new(http, base, persistence, store))
    }

    // -----------------------------------------------------------------------
    // Session operations
    // -----------------------------------------------------------------------

    /// Logs in with `email` and `password`.
    ///
    /// # Errors
    ///
    /// [`MeetspaceError::InvalidCredentials`] on rejected credentials,
    /// [`MeetspaceError::Api`] otherwise
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        self.authenticate(&LoginRequest::new(email, password)).await
    }

    /// Logs in with a prepared request.
    pub async fn authenticate(&self, request: &LoginRequest) -> Result<Identity> {
        self.inner.gateway.authenticate(request).await
    }

    /// Registers a new account and logs it in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Identity> {
        self.inner.gateway.register(request).await
    }

    /// Ends the session. Never fails; see [`IdentityGateway::end_session`].
    pub async fn logout(&self) {
        self.inner.gateway.end_session().await;
    }

    /// Obtains a new access credential.
    pub async fn refresh(&self) -> Result<String> {
        self.inner.gateway.refresh().await
    }

    /// Re-fetches the identity and replaces the held snapshot.
    ///
    /// # Errors
    ///
    /// Returns the identity endpoint's error; the held identity is left
    /// untouched on failure.
    pub async fn reload_identity(&self) -> Result<Identity> {
        let identity = self.inner.gateway.fetch_identity().await?;
        self.inner.state.establish(identity.clone())?;
        Ok(identity)
    }

    /// Restores a session from saved or cookie-held credentials, once.
    ///
    /// Runs at most once per manager; concurrent callers await the same
    /// attempt. A failed restore clears credentials silently (no
    /// termination broadcast, since no session was live). Returns the phase
    /// after bootstrap.
    pub async fn ensure_bootstrapped(&self) -> SessionPhase {
        self.inner
            .bootstrap
            .get_or_init(|| async { self.bootstrap().await })
            .await;
        self.phase()
    }

    /// Releases in-process session resources.
    ///
    /// Durable credentials are kept so the next process can bootstrap from
    /// them. Subscribers see the end of the broadcast stream.
    pub fn teardown(&self) {
        self.inner.state.reset_with(|had_identity| had_identity);
        self.inner.termination.close();
        tracing::debug!("Session manager torn down");
    }

    // -----------------------------------------------------------------------
    // Authorization view
    // -----------------------------------------------------------------------

    /// `true` while an identity is held.
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.is_authenticated()
    }

    /// `true` when the held identity has the admin role.
    pub fn is_admin(&self) -> bool {
        self.inner.state.is_admin()
    }

    /// Role set of the held identity.
    pub fn roles(&self) -> BTreeSet<String> {
        self.inner.state.roles()
    }

    /// Snapshot of the held identity.
    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.state.identity()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.inner.state.phase()
    }

    /// Subscribes to session termination.
    pub fn subscribe(&self) -> TerminationSubscription {
        self.inner.termination.subscribe()
    }

    /// `true` while the store holds an access credential, whether or not
    /// the session has been bootstrapped.
    pub fn has_stored_credentials(&self) -> bool {
        self.inner.store.access().is_some()
    }

    /// Configured persistence mode.
    pub fn persistence(&self) -> CredentialPersistence {
        self.inner.persistence
    }

    // -----------------------------------------------------------------------
    // Collaborators for the request pipeline
    // -----------------------------------------------------------------------

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub(crate) fn base(&self) -> &ApiBase {
        &self.inner.base
    }

    pub(crate) fn gateway(&self) -> &IdentityGateway {
        &self.inner.gateway
    }

    // -----------------------------------------------------------------------
    // Bootstrap
    // -----------------------------------------------------------------------

    async fn bootstrap(&self) {
        let has_source = match self.inner.persistence {
            CredentialPersistence::DualDurable => self.inner.store.access().is_some(),
            CredentialPersistence::MemoryWithCookieRefresh => true,
        };
        if !has_source || !self.inner.state.begin_bootstrap() {
            return;
        }

        tracing::debug!("Restoring session");
        match self.restore_identity().await {
            Ok(identity) => match self.inner.state.establish(identity) {
                Ok(()) => tracing::debug!("Session restored"),
                Err(e) => {
                    tracing::warn!("Failed to install restored identity: {}", e);
                    self.discard_restore();
                }
            },
            Err(e) => {
                tracing::debug!("No session restored: {}", e);
                self.discard_restore();
            }
        }
    }

    async fn restore_identity(&self) -> Result<Identity> {
        let gateway = &self.inner.gateway;
        match gateway.fetch_identity().await {
            Ok(identity) => Ok(identity),
            Err(e)
                if matches!(
                    e.downcast_ref::<MeetspaceError>(),
                    Some(MeetspaceError::AuthorizationFailure(_))
                ) =>
            {
                gateway.refresh().await?;
                gateway.fetch_identity().await
            }
            Err(e) => Err(e),
        }
    }

    fn discard_restore(&self) {
        let store = Arc::clone(&self.inner.store);
        self.inner.state.reset_with(move |_| {
            if let Err(e) = store.clear() {
                tracing::warn!("Failed to clear stored credentials: {}", e);
            }
            false
        });
    }
}
