//! Identity gateway: the only caller of the authentication endpoints
//!
//! [`IdentityGateway`] performs login, registration, credential refresh,
//! logout and identity lookup. It talks to the authentication endpoints
//! directly rather than through the request pipeline, so a `401` from one
//! of them is always terminal and can never trigger another refresh.
//!
//! # Refresh coordination
//!
//! At most one refresh exchange is in flight at a time. The first caller
//! starts the exchange and parks a shared future in `in_flight`; callers
//! arriving while it runs await that same future and observe the same
//! outcome. The slot is emptied once the exchange finishes, so the next
//! expiry starts a fresh exchange.

use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::endpoint::{
    ApiBase, IDENTITY_PATH, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, REGISTER_PATH,
};
use crate::api::normalize;
use crate::auth::credentials::{CredentialPersistence, CredentialStore, StoredCredentials};
use crate::auth::session::{Identity, SessionState};
use crate::auth::termination::TerminationBroadcast;
use crate::error::{MeetspaceError, Result};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Login request body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

impl LoginRequest {
    /// Builds a login request.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Registration request body.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    /// Account email
    pub email: String,
    /// Chosen password
    pub password: String,
    /// Password repeated for server-side confirmation
    pub password_confirm: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
}

/// Response of the login and registration endpoints.
#[derive(Deserialize)]
struct SessionGrant {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
    user: Identity,
}

/// Response of the refresh endpoint. `refresh` is present when the server
/// rotates refresh credentials.
#[derive(Deserialize)]
struct RefreshGrant {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

// ---------------------------------------------------------------------------
// Refresh outcome
// ---------------------------------------------------------------------------

/// Cloneable failure of a refresh exchange, shared between all callers
/// awaiting the same exchange.
#[derive(Debug, Clone)]
enum RefreshFailure {
    Unavailable,
    Rejected(String),
    Failed {
        message: String,
        status: Option<u16>,
        payload: Option<Value>,
    },
}

impl From<RefreshFailure> for MeetspaceError {
    fn from(failure: RefreshFailure) -> Self {
        match failure {
            RefreshFailure::Unavailable => MeetspaceError::NoRefreshAvailable,
            RefreshFailure::Rejected(message) => MeetspaceError::RefreshRejected(message),
            RefreshFailure::Failed {
                message,
                status,
                payload,
            } => MeetspaceError::Api {
                message,
                status,
                payload,
            },
        }
    }
}

impl From<MeetspaceError> for RefreshFailure {
    fn from(err: MeetspaceError) -> Self {
        match err {
            MeetspaceError::Api {
                message,
                status,
                payload,
            } => RefreshFailure::Failed {
                message,
                status,
                payload,
            },
            other => RefreshFailure::Failed {
                message: other.to_string(),
                status: None,
                payload: None,
            },
        }
    }
}

type RefreshOutcome = std::result::Result<String, RefreshFailure>;
type RefreshAttempt = Shared<BoxFuture<'static, RefreshOutcome>>;

// ---------------------------------------------------------------------------
// IdentityGateway
// ---------------------------------------------------------------------------

/// Performs every exchange with the authentication endpoints and keeps the
/// credential store and session state in step.
#[derive(Clone)]
pub struct IdentityGateway {
    http: reqwest::Client,
    base: ApiBase,
    persistence: CredentialPersistence,
    store: Arc<dyn CredentialStore>,
    state: Arc<SessionState>,
    termination: TerminationBroadcast,
    in_flight: Arc<Mutex<Option<RefreshAttempt>>>,
}

impl std::fmt::Debug for IdentityGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityGateway")
            .field("base", &self.base)
            .field("persistence", &self.persistence)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl IdentityGateway {
    /// Creates a gateway over the given collaborators.
    pub fn new(
        http: reqwest::Client,
        base: ApiBase,
        persistence: CredentialPersistence,
        store: Arc<dyn CredentialStore>,
        state: Arc<SessionState>,
        termination: TerminationBroadcast,
    ) -> Self {
        Self {
            http,
            base,
            persistence,
            store,
            state,
            termination,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Logs in and commits the returned credentials and identity.
    ///
    /// # Errors
    ///
    /// [`MeetspaceError::InvalidCredentials`] when the server rejects the
    /// credentials (HTTP 400 or 401); a normalized [`MeetspaceError::Api`]
    /// for any other failure. Nothing is committed on failure.
    pub async fn authenticate(&self, request: &LoginRequest) -> Result<Identity> {
        let grant = self.request_grant(LOGIN_PATH, request).await?;
        let identity = self.commit(grant)?;
        tracing::info!(user_id = identity.id, "Logged in");
        Ok(identity)
    }

    /// Registers a new account and commits the returned session.
    ///
    /// Same contract as [`authenticate`](Self::authenticate).
    pub async fn register(&self, request: &RegisterRequest) -> Result<Identity> {
        let grant = self.request_grant(REGISTER_PATH, request).await?;
        let identity = self.commit(grant)?;
        tracing::info!(user_id = identity.id, "Registered and logged in");
        Ok(identity)
    }

    /// Obtains a new access credential.
    ///
    /// Concurrent callers share one exchange with the server.
    ///
    /// # Errors
    ///
    /// - [`MeetspaceError::NoRefreshAvailable`] if no refresh credential is
    ///   stored (durable mode only).
    /// - [`MeetspaceError::RefreshRejected`] if the server declines.
    /// - [`MeetspaceError::Api`] for transport or unexpected server failures.
    pub async fn refresh(&self) -> Result<String> {
        let attempt = self.join_or_start_refresh()?;
        let outcome = attempt.clone().await;
        self.finish_refresh(&attempt);
        outcome.map_err(|failure| MeetspaceError::from(failure).into())
    }

    /// Fetches the identity for the current access credential.
    ///
    /// Does not touch credentials or session state.
    ///
    /// # Errors
    ///
    /// [`MeetspaceError::AuthorizationFailure`] on HTTP 401, a normalized
    /// [`MeetspaceError::Api`] otherwise.
    pub async fn fetch_identity(&self) -> Result<Identity> {
        let url = self.base.join(IDENTITY_PATH)?;
        let mut request = self.http.get(url);
        if let Some(access) = self.store.access() {
            request = request.bearer_auth(access);
        }

        let response = request.send().await.map_err(normalize::from_transport)?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            let err = normalize::from_response(response).await;
            return Err(MeetspaceError::AuthorizationFailure(message_of(&err)).into());
        }
        if !status.is_success() {
            return Err(normalize::from_response(response).await.into());
        }

        Ok(response.json::<Identity>().await.map_err(normalize::from_transport)?)
    }

    /// Ends the session.
    ///
    /// Notifies the server on a best-effort basis (failures are logged, never
    /// returned), then clears credentials and identity and fires the
    /// termination broadcast exactly once.
    pub async fn end_session(&self) {
        self.notify_logout().await;
        self.clear_session();
        self.termination.fire();
        tracing::info!("Logged out");
    }

    /// Tears down a session that can no longer be renewed.
    ///
    /// Fires the termination broadcast only if a session was live, so
    /// concurrent callers that lose the same refresh race report a single
    /// termination. Returns whether the broadcast fired.
    pub fn expire_session(&self) -> bool {
        let was_live = self.clear_session();
        if was_live {
            tracing::warn!("Session expired; credentials cleared");
            self.termination.fire();
        }
        was_live
    }

    /// Current access credential.
    pub fn access_credential(&self) -> Option<String> {
        self.store.access()
    }

    /// Configured persistence mode.
    pub fn persistence(&self) -> CredentialPersistence {
        self.persistence
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// POSTs a login/registration body and parses the session grant.
    async fn request_grant<B: Serialize>(&self, path: &str, body: &B) -> Result<SessionGrant> {
        let url = self.base.join(path)?;
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(normalize::from_transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED
        {
            let err = normalize::from_response(response).await;
            return Err(MeetspaceError::InvalidCredentials(message_of(&err)).into());
        }
        if !status.is_success() {
            return Err(normalize::from_response(response).await.into());
        }

        Ok(response
            .json::<SessionGrant>()
            .await
            .map_err(normalize::from_transport)?)
    }

    /// Stores the grant's credentials and identity as one step.
    fn commit(&self, grant: SessionGrant) -> Result<Identity> {
        let refresh = if self.persistence.exposes_refresh() {
            grant.refresh
        } else {
            None
        };
        let credentials = StoredCredentials::new(grant.access, refresh);
        let identity = grant.user;
        let store = Arc::clone(&self.store);
        self.state
            .establish_with(identity.clone(), move || store.set(credentials))?;
        Ok(identity)
    }

    /// Clears identity and credentials together. Returns whether anything was
    /// held before.
    fn clear_session(&self) -> bool {
        let store = Arc::clone(&self.store);
        self.state.reset_with(move |had_identity| {
            let had_access = store.access().is_some();
            if let Err(e) = store.clear() {
                tracing::warn!("Failed to clear stored credentials: {}", e);
            }
            had_identity || had_access
        })
    }

    fn join_or_start_refresh(&self) -> Result<RefreshAttempt> {
        let mut slot = self.in_flight.lock().map_err(|_| {
            MeetspaceError::Storage("Failed to acquire refresh lock".to_string())
        })?;

        if let Some(existing) = slot.as_ref() {
            tracing::debug!("Joining in-flight credential refresh");
            return Ok(existing.clone());
        }

        tracing::debug!("Starting credential refresh");
        let exchange = RefreshExchange {
            http: self.http.clone(),
            base: self.base.clone(),
            persistence: self.persistence,
            store: Arc::clone(&self.store),
            state: Arc::clone(&self.state),
            epoch: self.state.epoch(),
        };
        let attempt = async move { exchange.run().await }.boxed().shared();
        *slot = Some(attempt.clone());
        Ok(attempt)
    }

    fn finish_refresh(&self, attempt: &RefreshAttempt) {
        if let Ok(mut slot) = self.in_flight.lock() {
            if slot.as_ref().is_some_and(|current| current.ptr_eq(attempt)) {
                *slot = None;
            }
        }
    }

    async fn notify_logout(&self) {
        let body = if self.persistence.exposes_refresh() {
            match self.store.refresh() {
                Some(refresh) => serde_json::json!({ "refresh": refresh }),
                // Nothing to revoke server-side.
                None => return,
            }
        } else {
            serde_json::json!({})
        };

        let url = match self.base.join(LOGOUT_PATH) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping logout notification: {}", e);
                return;
            }
        };

        let mut request = self.http.post(url).json(&body);
        if let Some(access) = self.store.access() {
            request = request.bearer_auth(access);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Server acknowledged logout");
            }
            Ok(response) => {
                tracing::warn!(
                    status = response.status().as_u16(),
                    "Logout notification rejected; clearing session anyway"
                );
            }
            Err(e) => {
                tracing::warn!("Logout notification failed: {}; clearing session anyway", e);
            }
        }
    }
}

/// Owned state for one refresh exchange, detached from the gateway so the
/// shared future does not keep the in-flight slot alive.
struct RefreshExchange {
    http: reqwest::Client,
    base: ApiBase,
    persistence: CredentialPersistence,
    store: Arc<dyn CredentialStore>,
    state: Arc<SessionState>,
    /// Session epoch when the exchange started.
    epoch: u64,
}

impl RefreshExchange {
    async fn run(self) -> RefreshOutcome {
        let body = if self.persistence.exposes_refresh() {
            let refresh = self.store.refresh().ok_or(RefreshFailure::Unavailable)?;
            serde_json::json!({ "refresh": refresh })
        } else {
            // The refresh cookie rides along in the client's cookie jar.
            serde_json::json!({})
        };

        let url = self.base.join(REFRESH_PATH).map_err(to_failure)?;
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RefreshFailure::from(normalize::from_transport(e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::BAD_REQUEST
        {
            let err = normalize::from_response(response).await;
            tracing::debug!(status = status.as_u16(), "Refresh rejected by server");
            return Err(RefreshFailure::Rejected(message_of(&err)));
        }
        if !status.is_success() {
            return Err(normalize::from_response(response).await.into());
        }

        let grant = response
            .json::<RefreshGrant>()
            .await
            .map_err(|e| RefreshFailure::from(normalize::from_transport(e)))?;

        let store = Arc::clone(&self.store);
        let rotated = grant.refresh.filter(|_| self.persistence.exposes_refresh());
        let access = grant.access.clone();
        let committed = self
            .state
            .persist_if_current(self.epoch, move || match rotated {
                Some(rotated) => store.set(StoredCredentials::new(access, Some(rotated))),
                None => store.set_access(&access),
            })
            .map_err(to_failure)?;
        if !committed {
            tracing::debug!("Session ended during refresh; discarding new credential");
            return Err(RefreshFailure::Rejected(
                "Session ended while refreshing".to_string(),
            ));
        }

        tracing::debug!("Access credential refreshed");
        Ok(grant.access)
    }
}

fn to_failure(err: anyhow::Error) -> RefreshFailure {
    match err.downcast::<MeetspaceError>() {
        Ok(e) => e.into(),
        Err(other) => RefreshFailure::Failed {
            message: other.to_string(),
            status: None,
            payload: None,
        },
    }
}

/// Message carried by a normalized error.
fn message_of(err: &MeetspaceError) -> String {
    match err {
        MeetspaceError::Api { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
