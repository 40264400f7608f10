//! Session manager integration tests
//!
//! Drives login, registration, logout and bootstrap against a `wiremock`
//! server standing in for the booking API.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use meetspace::auth::credentials::{
    CredentialPersistence, CredentialStore, FileCredentialStore, MemoryCredentialStore,
    StoredCredentials,
};
use meetspace::auth::gateway::RegisterRequest;
use meetspace::auth::guard::{self, GuardDecision, RouteAccess};
use meetspace::auth::{SessionManager, SessionPhase};
use meetspace::error::MeetspaceError;

use common::{
    api_base, drain, fresh_session, identity_json, logged_in_session, mount_login,
    session_with_store,
};

fn assert_error<F>(err: &anyhow::Error, check: F)
where
    F: FnOnce(&MeetspaceError) -> bool,
{
    let inner = err
        .downcast_ref::<MeetspaceError>()
        .unwrap_or_else(|| panic!("expected MeetspaceError, got {err:?}"));
    assert!(check(inner), "unexpected error: {inner:?}");
}

// ---------------------------------------------------------------------------
// Fresh state and login
// ---------------------------------------------------------------------------

/// A new manager holds no session.
#[tokio::test]
async fn test_fresh_manager_is_unauthenticated() {
    let server = MockServer::start().await;
    let (session, store) = fresh_session(&server);

    assert_eq!(session.phase(), SessionPhase::Unauthenticated);
    assert!(!session.is_authenticated());
    assert!(!session.is_admin());
    assert!(session.current_identity().is_none());
    assert!(store.access().is_none());
}

/// Logging in as a plain user yields an authenticated, non-admin session
/// with the returned identity and both credentials stored.
#[tokio::test]
async fn test_login_as_user_is_not_admin() {
    let server = MockServer::start().await;
    let (session, store) = logged_in_session(&server).await;

    assert!(session.is_authenticated());
    assert!(!session.is_admin());
    assert_eq!(session.phase(), SessionPhase::Authenticated);

    let identity = session.current_identity().expect("identity");
    assert_eq!(identity.id, 1);
    assert_eq!(identity.roles, vec!["user".to_string()]);
    assert!(session.roles().contains("user"));

    assert_eq!(store.access().as_deref(), Some("T1"));
    assert_eq!(store.refresh().as_deref(), Some("R1"));
}

#[tokio::test]
async fn test_login_as_admin() {
    let server = MockServer::start().await;
    mount_login(&server, "T1", "R1", &["admin"]).await;
    let (session, _store) = fresh_session(&server);

    session.login("admin@example.com", "secret").await.unwrap();
    assert!(session.is_admin());
}

/// Rejected credentials surface the server's message and never trigger a
/// refresh.
#[tokio::test]
async fn test_rejected_login_reports_message_without_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "email": ["Invalid email or password."]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "X"})))
        .expect(0)
        .mount(&server)
        .await;

    let (session, store) = fresh_session(&server);
    let err = session.login("a@b.com", "wrong").await.unwrap_err();

    assert_error(&err, |e| {
        matches!(e, MeetspaceError::InvalidCredentials(m) if m == "Invalid email or password.")
    });
    assert!(!session.is_authenticated());
    assert!(store.access().is_none());
}

/// A 401 from the login endpoint is also an inline credential error.
#[tokio::test]
async fn test_login_401_is_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "No active account"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (session, _store) = fresh_session(&server);
    let mut ended = session.subscribe();
    let err = session.login("a@b.com", "wrong").await.unwrap_err();

    assert_error(&err, |e| matches!(e, MeetspaceError::InvalidCredentials(_)));
    assert_eq!(drain(&mut ended), 0);
}

/// Server errors during login are normalized, not reported as bad
/// credentials.
#[tokio::test]
async fn test_login_server_error_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let (session, _store) = fresh_session(&server);
    let err = session.login("a@b.com", "pw").await.unwrap_err();

    assert_error(&err, |e| {
        matches!(e, MeetspaceError::Api { status: Some(503), message, .. }
            if message == "Request failed with status code 503")
    });
}

#[tokio::test]
async fn test_register_establishes_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(body_json(json!({
            "email": "new@example.com",
            "password": "Secure123!",
            "password_confirm": "Secure123!",
            "first_name": "Anna",
            "last_name": "Nowak"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "access": "T1",
            "refresh": "R1",
            "user": identity_json(7, &["user"]),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (session, store) = fresh_session(&server);
    let identity = session
        .register(&RegisterRequest {
            email: "new@example.com".to_string(),
            password: "Secure123!".to_string(),
            password_confirm: "Secure123!".to_string(),
            first_name: "Anna".to_string(),
            last_name: "Nowak".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(identity.id, 7);
    assert!(session.is_authenticated());
    assert_eq!(store.refresh().as_deref(), Some("R1"));
}

#[tokio::test]
async fn test_register_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "password_confirm": ["Passwords do not match."]
        })))
        .mount(&server)
        .await;

    let (session, _store) = fresh_session(&server);
    let err = session
        .register(&RegisterRequest {
            email: "new@example.com".to_string(),
            password: "a".to_string(),
            password_confirm: "b".to_string(),
            first_name: String::new(),
            last_name: String::new(),
        })
        .await
        .unwrap_err();

    assert_error(&err, |e| {
        matches!(e, MeetspaceError::InvalidCredentials(m) if m == "Passwords do not match.")
    });
    assert!(!session.is_authenticated());
}

// ---------------------------------------------------------------------------
// Logout
// ---------------------------------------------------------------------------

/// Logout revokes the refresh credential, clears everything and fires once.
#[tokio::test]
async fn test_logout_clears_session_and_fires_once() {
    let server = MockServer::start().await;
    let (session, store) = logged_in_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut ended = session.subscribe();
    session.logout().await;

    assert!(!session.is_authenticated());
    assert_eq!(session.phase(), SessionPhase::Unauthenticated);
    assert!(store.access().is_none());
    assert!(store.refresh().is_none());
    assert_eq!(drain(&mut ended), 1);
}

/// A failing server notification does not stop local cleanup.
#[tokio::test]
async fn test_logout_survives_server_failure() {
    let server = MockServer::start().await;
    let (session, store) = logged_in_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let mut first = session.subscribe();
    let mut second = session.subscribe();
    session.logout().await;

    assert!(!session.is_authenticated());
    assert!(store.access().is_none());
    assert_eq!(drain(&mut first), 1);
    assert_eq!(drain(&mut second), 1);
}

/// Logging out of an empty session still broadcasts, and skips the server.
#[tokio::test]
async fn test_logout_without_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (session, _store) = fresh_session(&server);
    let mut ended = session.subscribe();
    session.logout().await;

    assert_eq!(drain(&mut ended), 1);
}

/// Dropped subscriptions no longer receive events.
#[tokio::test]
async fn test_dropped_subscription_is_not_notified() {
    let server = MockServer::start().await;
    let (session, _store) = fresh_session(&server);

    let dropped = session.subscribe();
    drop(dropped);
    let mut kept = session.subscribe();

    session.logout().await;
    assert_eq!(drain(&mut kept), 1);
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

/// A rotated refresh credential replaces the stored one.
#[tokio::test]
async fn test_refresh_rotates_refresh_credential() {
    let server = MockServer::start().await;
    let (session, store) = logged_in_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "T2", "refresh": "R2"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(session.refresh().await.unwrap(), "T2");
    assert_eq!(store.access().as_deref(), Some("T2"));
    assert_eq!(store.refresh().as_deref(), Some("R2"));
    assert_eq!(session.phase(), SessionPhase::Authenticated);
}

/// Without rotation only the access credential changes.
#[tokio::test]
async fn test_refresh_keeps_refresh_credential() {
    let server = MockServer::start().await;
    let (session, store) = logged_in_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "T2"})))
        .mount(&server)
        .await;

    session.refresh().await.unwrap();
    assert_eq!(store.access().as_deref(), Some("T2"));
    assert_eq!(store.refresh().as_deref(), Some("R1"));
}

/// A 401 from the refresh endpoint is a rejection, never another refresh.
#[tokio::test]
async fn test_refresh_401_is_rejected_once() {
    let server = MockServer::start().await;
    let (session, _store) = logged_in_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token is invalid or expired",
            "code": "token_not_valid"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = session.refresh().await.unwrap_err();
    assert_error(&err, |e| {
        matches!(e, MeetspaceError::RefreshRejected(m) if m == "Token is invalid or expired")
    });
}

/// Durable mode without a refresh credential does not call the server.
#[tokio::test]
async fn test_refresh_without_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (session, _store) = fresh_session(&server);
    let err = session.refresh().await.unwrap_err();
    assert_error(&err, |e| matches!(e, MeetspaceError::NoRefreshAvailable));
}

/// A refresh that completes after logout must not bring credentials back.
#[tokio::test]
async fn test_refresh_finishing_after_logout_is_discarded() {
    let server = MockServer::start().await;
    let (session, store) = logged_in_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "T2", "refresh": "R2"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let refreshing = {
        let session = session.clone();
        tokio::spawn(async move { session.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.logout().await;
    assert!(store.access().is_none());

    let err = refreshing.await.unwrap().unwrap_err();
    assert_error(&err, |e| matches!(e, MeetspaceError::RefreshRejected(_)));
    assert!(store.access().is_none());
    assert!(store.refresh().is_none());
    assert!(!session.is_authenticated());
    assert_eq!(session.phase(), SessionPhase::Unauthenticated);
}

// ---------------------------------------------------------------------------
// Cookie mode
// ---------------------------------------------------------------------------

/// In cookie mode the refresh credential stays in the cookie jar: it is
/// never stored, refresh posts an empty body, and the cookie rides along.
#[tokio::test]
async fn test_cookie_mode_refresh_uses_cookie_jar() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "refresh_token=R1; Path=/; HttpOnly")
                .set_body_json(json!({
                    "access": "T1",
                    "refresh": "R1",
                    "user": identity_json(1, &["user"]),
                })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(header("cookie", "refresh_token=R1"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "T2"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let session = session_with_store(
        &server,
        CredentialPersistence::MemoryWithCookieRefresh,
        Arc::clone(&store),
    );

    session.login("user1@example.com", "secret").await.unwrap();
    assert!(store.refresh().is_none());

    assert_eq!(session.refresh().await.unwrap(), "T2");
    assert_eq!(store.access().as_deref(), Some("T2"));
}

#[tokio::test]
async fn test_cookie_mode_logout_posts_empty_body() {
    let server = MockServer::start().await;
    mount_login(&server, "T1", "R1", &["user"]).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let session = session_with_store(
        &server,
        CredentialPersistence::MemoryWithCookieRefresh,
        Arc::clone(&store),
    );
    session.login("user1@example.com", "secret").await.unwrap();
    session.logout().await;

    assert!(store.access().is_none());
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// Saved credentials restore the session through the identity endpoint.
#[tokio::test]
async fn test_bootstrap_restores_saved_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(identity_json(1, &["admin"])))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_credentials(
        StoredCredentials::new("T1", Some("R1".to_string())),
    ));
    let session = session_with_store(
        &server,
        CredentialPersistence::DualDurable,
        Arc::clone(&store),
    );

    assert_eq!(session.phase(), SessionPhase::Unauthenticated);
    let (a, b) = tokio::join!(session.ensure_bootstrapped(), session.ensure_bootstrapped());
    assert_eq!(a, SessionPhase::Authenticated);
    assert_eq!(b, SessionPhase::Authenticated);
    assert!(session.is_admin());

    // Runs once.
    session.ensure_bootstrapped().await;
}

/// An expired saved access credential is refreshed during bootstrap.
#[tokio::test]
async fn test_bootstrap_refreshes_expired_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(identity_json(1, &["user"])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "T2"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_credentials(
        StoredCredentials::new("T1", Some("R1".to_string())),
    ));
    let session = session_with_store(
        &server,
        CredentialPersistence::DualDurable,
        Arc::clone(&store),
    );

    assert_eq!(
        session.ensure_bootstrapped().await,
        SessionPhase::Authenticated
    );
    assert_eq!(store.access().as_deref(), Some("T2"));
}

/// A failed restore clears credentials quietly.
#[tokio::test]
async fn test_bootstrap_failure_clears_without_broadcast() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_credentials(
        StoredCredentials::new("T1", Some("R1".to_string())),
    ));
    let session = session_with_store(
        &server,
        CredentialPersistence::DualDurable,
        Arc::clone(&store),
    );
    let mut ended = session.subscribe();

    assert_eq!(
        session.ensure_bootstrapped().await,
        SessionPhase::Unauthenticated
    );
    assert!(store.access().is_none());
    assert!(store.refresh().is_none());
    assert_eq!(drain(&mut ended), 0);
}

/// Without saved credentials, durable mode does not contact the server.
#[tokio::test]
async fn test_bootstrap_skipped_without_saved_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (session, _store) = fresh_session(&server);
    assert_eq!(
        session.ensure_bootstrapped().await,
        SessionPhase::Unauthenticated
    );
}

/// Cookie mode always attempts a restore through the cookie.
#[tokio::test]
async fn test_cookie_mode_bootstrap_without_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let session = session_with_store(
        &server,
        CredentialPersistence::MemoryWithCookieRefresh,
        store,
    );

    assert_eq!(
        session.ensure_bootstrapped().await,
        SessionPhase::Unauthenticated
    );
}

/// Credentials written by one process are picked up by the next.
#[tokio::test]
async fn test_file_store_survives_restart() {
    let server = MockServer::start().await;
    mount_login(&server, "T1", "R1", &["user"]).await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(identity_json(1, &["user"])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("credentials.json");
    let base = meetspace::api::endpoint::ApiBase::parse(&api_base(&server)).unwrap();

    let first = SessionManager::new(
        reqwest::Client::new(),
        base.clone(),
        CredentialPersistence::DualDurable,
        Arc::new(FileCredentialStore::open(&file).unwrap()),
    );
    first.login("user1@example.com", "secret").await.unwrap();
    first.teardown();
    drop(first);

    let second = SessionManager::new(
        reqwest::Client::new(),
        base,
        CredentialPersistence::DualDurable,
        Arc::new(FileCredentialStore::open(&file).unwrap()),
    );
    assert_eq!(
        second.ensure_bootstrapped().await,
        SessionPhase::Authenticated
    );
    assert_eq!(second.current_identity().unwrap().id, 1);
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_guard_follows_session() {
    let server = MockServer::start().await;
    let (session, _store) = fresh_session(&server);

    assert_eq!(
        guard::evaluate(&session, RouteAccess::RequiresAuth).await,
        GuardDecision::RedirectToLogin
    );
    assert_eq!(
        guard::evaluate(&session, RouteAccess::Guest).await,
        GuardDecision::Proceed
    );

    mount_login(&server, "T1", "R1", &["user"]).await;
    session.login("user1@example.com", "secret").await.unwrap();

    assert_eq!(
        guard::evaluate(&session, RouteAccess::RequiresAuth).await,
        GuardDecision::Proceed
    );
    assert_eq!(
        guard::evaluate(&session, RouteAccess::RequiresAdmin).await,
        GuardDecision::RedirectToLogin
    );
    assert_eq!(
        guard::evaluate(&session, RouteAccess::Guest).await,
        GuardDecision::RedirectHome
    );
}

/// Public commands do not bootstrap, so logout can still revoke a saved
/// refresh credential when the identity endpoint is down.
#[tokio::test]
async fn test_public_command_keeps_saved_credentials_for_logout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(503))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_credentials(
        StoredCredentials::new("T1", Some("R1".to_string())),
    ));
    let session = session_with_store(
        &server,
        CredentialPersistence::DualDurable,
        Arc::clone(&store),
    );

    assert_eq!(
        guard::evaluate(&session, RouteAccess::Public).await,
        GuardDecision::Proceed
    );
    assert_eq!(session.phase(), SessionPhase::Unauthenticated);
    assert!(session.has_stored_credentials());

    session.logout().await;
    assert!(store.access().is_none());
    assert!(store.refresh().is_none());
}
