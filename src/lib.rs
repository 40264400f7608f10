//! MeetSpace - room booking client library
//!
//! This library provides the client side of the MeetSpace booking service:
//! an authentication session manager, a request pipeline with silent
//! re-authentication, and typed clients for the booking resources.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: credential storage, session state, identity gateway,
//!   termination broadcast, and the `SessionManager` façade
//! - `api`: request pipeline, error normalization, and resource clients
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: CLI command handlers
//!
//! # Example
//!
//! ```no_run
//! use meetspace::api::{ApiClient, RoomsApi};
//! use meetspace::{Config, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let session = SessionManager::from_config(&config)?;
//!     session.ensure_bootstrapped().await;
//!
//!     let rooms = RoomsApi::new(ApiClient::new(&session)).list().await?;
//!     println!("{} rooms", rooms.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use auth::{CredentialPersistence, Identity, SessionManager, SessionPhase};
pub use config::Config;
pub use error::{MeetspaceError, Result};
