//! Navigation guard
//!
//! Decides whether a command may run for the current session. The guard
//! bootstraps the session first, then applies [`decide`]. Public commands
//! skip bootstrap and see the stored credentials as loaded.

use crate::auth::manager::SessionManager;

/// Access level a command declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Always allowed
    Public,
    /// Only for visitors without a session (login, register)
    Guest,
    /// Requires a session
    RequiresAuth,
    /// Requires a session with the admin role
    RequiresAdmin,
}

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    RedirectToLogin,
    RedirectHome,
}

/// Pure decision table.
///
/// ```
/// use meetspace::auth::guard::{decide, GuardDecision, RouteAccess};
///
/// assert_eq!(decide(RouteAccess::Guest, true, false), GuardDecision::RedirectHome);
/// assert_eq!(decide(RouteAccess::RequiresAdmin, true, false), GuardDecision::RedirectToLogin);
/// ```
pub fn decide(access: RouteAccess, authenticated: bool, admin: bool) -> GuardDecision {
    match access {
        RouteAccess::Public => GuardDecision::Proceed,
        RouteAccess::Guest if authenticated => GuardDecision::RedirectHome,
        RouteAccess::Guest => GuardDecision::Proceed,
        RouteAccess::RequiresAuth if !authenticated => GuardDecision::RedirectToLogin,
        RouteAccess::RequiresAuth => GuardDecision::Proceed,
        RouteAccess::RequiresAdmin if !authenticated || !admin => GuardDecision::RedirectToLogin,
        RouteAccess::RequiresAdmin => GuardDecision::Proceed,
    }
}

/// Bootstraps `session` if needed and evaluates `access` against it.
///
/// [`RouteAccess::Public`] proceeds without bootstrapping, so a failed
/// restore cannot discard credentials the command still needs.
pub async fn evaluate(session: &SessionManager, access: RouteAccess) -> GuardDecision {
    if access == RouteAccess::Public {
        return GuardDecision::Proceed;
    }
    session.ensure_bootstrapped().await;
    let decision = decide(access, session.is_authenticated(), session.is_admin());
    tracing::debug!(?access, ?decision, "Guard evaluated");
    decision
}
