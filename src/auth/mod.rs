//! Authentication session management
//!
//! - [`credentials`]: credential storage strategies
//! - [`session`]: identity and lifecycle phase
//! - [`gateway`]: login, registration, refresh and logout exchanges
//! - [`termination`]: "session ended" broadcast
//! - [`manager`]: the [`SessionManager`] façade
//! - [`guard`]: access checks for commands

pub mod credentials;
pub mod gateway;
pub mod guard;
pub mod manager;
pub mod session;
pub mod termination;

pub use credentials::{
    CredentialPersistence, CredentialStore, FileCredentialStore, KeyringCredentialStore,
    MemoryCredentialStore, StoredCredentials,
};
pub use gateway::{IdentityGateway, LoginRequest, RegisterRequest};
pub use guard::{GuardDecision, RouteAccess};
pub use manager::SessionManager;
pub use session::{Identity, SessionPhase};
pub use termination::{SessionEnded, TerminationSubscription};
