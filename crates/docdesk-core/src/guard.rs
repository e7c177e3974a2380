//! Role-based access decisions over the stored session.

use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(String),
}

/// Home page for a known role.
pub fn landing_path(role: &str) -> Option<&'static str> {
    match role {
        "admin" => Some("/a/acceuil"),
        "validator" => Some("/v/acceuil"),
        "user" => Some("/u/acceuil"),
        _ => None,
    }
}

/// Decides whether the current session may open a route restricted to
/// `allowed_roles`.
///
/// An empty list means "no role restriction" and admits any signed-in user.
/// It is not read as "no role matches", which would bounce every user to
/// their landing page.
///
/// Signed-in users without the right role are sent to their own landing
/// page instead of `redirect_path`.
pub fn authorize(store: &SessionStore, allowed_roles: &[&str], redirect_path: &str) -> RouteDecision {
    if store.token().is_none() {
        tracing::debug!(redirect = redirect_path, "no session, redirecting");
        return RouteDecision::Redirect(redirect_path.to_string());
    }
    if allowed_roles.is_empty() {
        return RouteDecision::Allow;
    }

    let role = store.role().unwrap_or_default();
    if allowed_roles.contains(&role.as_str()) {
        return RouteDecision::Allow;
    }

    let target = landing_path(&role).unwrap_or(redirect_path);
    tracing::debug!(role = %role, redirect = target, "role not allowed");
    RouteDecision::Redirect(target.to_string())
}
