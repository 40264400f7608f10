//! Session commands: login, register, logout, whoami

use colored::Colorize;

use crate::auth::{Identity, RegisterRequest, SessionManager};
use crate::error::Result;

/// Logs in and reports who is now logged in.
pub async fn login(session: &SessionManager, email: &str, password: &str) -> Result<()> {
    let identity = session.login(email, password).await?;
    println!(
        "{}",
        format!("Logged in as {}", identity.display_name()).green()
    );
    Ok(())
}

/// Registers a new account and logs it in.
pub async fn register(session: &SessionManager, request: &RegisterRequest) -> Result<()> {
    let identity = session.register(request).await?;
    println!(
        "{}",
        format!("Account created. Logged in as {}", identity.display_name()).green()
    );
    Ok(())
}

/// Ends the session. Succeeds even if the server cannot be reached.
pub async fn logout(session: &SessionManager) -> Result<()> {
    let had_session = session.is_authenticated() || session.has_stored_credentials();
    session.logout().await;
    if had_session {
        println!("{}", "Logged out.".green());
    } else {
        println!("{}", "No active session; local credentials cleared.".yellow());
    }
    Ok(())
}

/// Prints the current identity.
pub fn whoami(session: &SessionManager) -> Result<()> {
    if let Some(identity) = session.current_identity() {
        print_identity(&identity);
    }
    Ok(())
}

fn print_identity(identity: &Identity) {
    let roles = if identity.roles.is_empty() {
        "-".to_string()
    } else {
        identity.roles.join(", ")
    };
    println!();
    println!("Name:   {}", identity.display_name().bold());
    println!("Email:  {}", identity.email);
    println!("Id:     {}", identity.id);
    println!("Roles:  {}", roles.cyan());
    println!();
}
