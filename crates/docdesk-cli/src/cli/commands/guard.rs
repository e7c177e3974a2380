use docdesk_core::guard::{self, RouteDecision};
use docdesk_core::session::SessionStore;

pub fn run(session: &SessionStore, roles: &[String], redirect: &str) {
    let roles: Vec<&str> = roles
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect();

    match guard::authorize(session, &roles, redirect) {
        RouteDecision::Allow => println!("allow"),
        RouteDecision::Redirect(path) => println!("redirect {path}"),
    }
}
