use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use meetspace::api::client::build_http_client;
use meetspace::api::endpoint::ApiBase;
use meetspace::auth::credentials::{CredentialPersistence, MemoryCredentialStore};
use meetspace::auth::termination::TerminationSubscription;
use meetspace::auth::SessionManager;
use meetspace::config::ApiConfig;

/// API base for a mock server.
#[allow(dead_code)]
pub fn api_base(server: &MockServer) -> String {
    format!("{}/api", server.uri())
}

/// Identity payload as returned by the server.
#[allow(dead_code)]
pub fn identity_json(id: i64, roles: &[&str]) -> Value {
    json!({
        "id": id,
        "email": format!("user{}@example.com", id),
        "first_name": "Jan",
        "last_name": "Kowalski",
        "roles": roles,
    })
}

/// Session manager over a shared in-memory store the test can inspect.
#[allow(dead_code)]
pub fn session_with_store(
    server: &MockServer,
    persistence: CredentialPersistence,
    store: Arc<MemoryCredentialStore>,
) -> SessionManager {
    let http = build_http_client(&ApiConfig::default(), persistence).expect("http client");
    let base = ApiBase::parse(&api_base(server)).expect("valid base");
    SessionManager::new(http, base, persistence, store)
}

/// Fresh dual-durable session manager with an empty in-memory store.
#[allow(dead_code)]
pub fn fresh_session(server: &MockServer) -> (SessionManager, Arc<MemoryCredentialStore>) {
    let store = Arc::new(MemoryCredentialStore::new());
    let session = session_with_store(
        server,
        CredentialPersistence::DualDurable,
        Arc::clone(&store),
    );
    (session, store)
}

/// Mounts a login endpoint that issues `access`/`refresh` for a user with
/// `roles`.
#[allow(dead_code)]
pub async fn mount_login(server: &MockServer, access: &str, refresh: &str, roles: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": access,
            "refresh": refresh,
            "user": identity_json(1, roles),
        })))
        .mount(server)
        .await;
}

/// Dual-durable session already logged in with access `T1` and refresh `R1`.
#[allow(dead_code)]
pub async fn logged_in_session(
    server: &MockServer,
) -> (SessionManager, Arc<MemoryCredentialStore>) {
    mount_login(server, "T1", "R1", &["user"]).await;
    let (session, store) = fresh_session(server);
    session
        .login("user1@example.com", "secret")
        .await
        .expect("login should succeed");
    (session, store)
}

/// Counts the terminations delivered so far without waiting.
#[allow(dead_code)]
pub fn drain(subscription: &mut TerminationSubscription) -> usize {
    let mut count = 0;
    while subscription.try_recv().is_some() {
        count += 1;
    }
    count
}

/// Room payload as returned by the server.
#[allow(dead_code)]
pub fn room_json(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "capacity": 10,
        "location": "1st floor",
        "equipment": [{"id": 1, "name": "Projector", "qty": 1}],
        "created_at": "2026-01-10T08:00:00Z",
        "updated_at": "2026-01-10T08:00:00Z",
    })
}
