/// Host callback run after a 401 cleared the session.
///
/// A browser host would navigate to `login_path`; other hosts tell the user
/// to sign in again. Must be idempotent: concurrent 401s may call it twice.
pub trait InvalidationHook: Send + Sync {
    fn on_session_invalidated(&self, login_path: &str);
}

impl<F> InvalidationHook for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_session_invalidated(&self, login_path: &str) {
        self(login_path);
    }
}
