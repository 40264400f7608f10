//! Command handlers for the CLI
//!
//! [`execute`] runs the navigation guard for a command and then hands it to
//! the matching handler module.

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::api::ApiClient;
use crate::auth::guard::{self, GuardDecision};
use crate::auth::SessionManager;
use crate::cli::Commands;
use crate::error::{MeetspaceError, Result};

pub mod auth;
pub mod equipment;
pub mod reservations;
pub mod rooms;
pub mod users;

/// Checks access for `command` and runs it.
///
/// # Errors
///
/// Returns [`MeetspaceError::AuthorizationFailure`] when the guard sends the
/// user to log in, or the handler's error
pub async fn execute(session: &SessionManager, command: Commands) -> Result<()> {
    match guard::evaluate(session, command.access()).await {
        GuardDecision::Proceed => {}
        GuardDecision::RedirectHome => {
            let who = session
                .current_identity()
                .map(|i| i.email)
                .unwrap_or_default();
            println!(
                "{} Run {} first to switch accounts.",
                format!("Already logged in as {}.", who).yellow(),
                "meetspace logout".cyan()
            );
            return Ok(());
        }
        GuardDecision::RedirectToLogin => {
            let reason = if session.is_authenticated() {
                "This command requires the admin role"
            } else {
                "Not logged in. Run `meetspace login` first"
            };
            return Err(MeetspaceError::AuthorizationFailure(reason.to_string()).into());
        }
    }

    let client = ApiClient::new(session);
    match command {
        Commands::Login { email, password } => auth::login(session, &email, &password).await,
        Commands::Register {
            email,
            password,
            password_confirm,
            first_name,
            last_name,
        } => {
            let request = crate::auth::RegisterRequest {
                password_confirm: password_confirm.unwrap_or_else(|| password.clone()),
                email,
                password,
                first_name,
                last_name,
            };
            auth::register(session, &request).await
        }
        Commands::Logout => auth::logout(session).await,
        Commands::Whoami => auth::whoami(session),
        Commands::Rooms { command } => rooms::handle_rooms(client, command).await,
        Commands::Equipment { command } => equipment::handle_equipment(client, command).await,
        Commands::Reservations { command } => {
            reservations::handle_reservations(client, command).await
        }
        Commands::Users { command } => users::handle_users(client, command).await,
    }
}

/// Prints `value` as pretty JSON.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(MeetspaceError::Serialization)?;
    println!("{}", json);
    Ok(())
}

/// Parses an RFC 3339 timestamp given on the command line.
pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            MeetspaceError::Config(format!(
                "Invalid timestamp {}: {}. Expected RFC 3339, e.g. 2026-03-01T09:00:00Z",
                raw, e
            ))
            .into()
        })
}

/// Formats a timestamp for tables, in local time.
pub(crate) fn format_instant(instant: &DateTime<Utc>) -> String {
    instant
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}
