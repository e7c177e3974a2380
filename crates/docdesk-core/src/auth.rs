//! Login, logout and current-user calls.
//!
//! Login response shape: `{ "success", "message", "token", "data" }` where
//! `data` is the user object.

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiClient, ApiError, read_json};
use crate::session::{AccountData, SessionError, UserData};

pub const LOGIN_PATH: &str = "/auth/login/";
pub const LOGOUT_PATH: &str = "/users/logout";
pub const ME_PATH: &str = "/api/me/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    LoginFailed,
    LogoutFailed,
}

/// Login/logout failure with the message to show the user.
#[derive(Debug)]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AuthError {
    const LOGIN_FAILED: &str = "Login failed.";
    const LOGOUT_FAILED: &str = "Logout failed.";

    fn login(
        message: Option<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind: AuthErrorKind::LoginFailed,
            message: message.unwrap_or_else(|| Self::LOGIN_FAILED.to_string()),
            source,
        }
    }

    fn logout(err: ApiError) -> Self {
        Self {
            kind: AuthErrorKind::LogoutFailed,
            message: err
                .server_message()
                .unwrap_or_else(|| Self::LOGOUT_FAILED.to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        Self::login(err.server_message(), Some(Box::new(err)))
    }
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        Self::login(None, Some(Box::new(err)))
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

impl fmt::Debug for LoginRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// Logs in and persists the new session.
///
/// The account is `data.account` when the backend sends one, otherwise an
/// account keyed by the user id.
///
/// # Errors
/// Returns `LoginFailed` with the backend message when it sent one.
pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<UserData, AuthError> {
    let response = client
        .post_json(
            LOGIN_PATH,
            &LoginRequest {
                username: email,
                password,
            },
        )
        .await?;
    let body: LoginResponse = read_json(response).await?;

    if body.success == Some(false) {
        return Err(AuthError::login(body.message, None));
    }

    let token = body
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AuthError::login(body.message.clone(), None))?;
    let data = body.data.unwrap_or(Value::Null);

    let user: UserData = serde_json::from_value(data.clone())
        .map_err(|e| AuthError::login(None, Some(Box::new(e))))?;
    let account = match data.get("account") {
        Some(account @ Value::Object(_)) => serde_json::from_value(account.clone())
            .map_err(|e| AuthError::login(None, Some(Box::new(e))))?,
        _ => AccountData::new(user.id.clone()),
    };
    let role = user.role_name().unwrap_or_default().to_string();

    client
        .session()
        .store_auth_data(&token, &user, &account, &role)?;
    client.set_auth_token(Some(&token));

    tracing::info!(user = %user.id, role = %role, "logged in");
    Ok(user)
}

/// Logs out on the backend, then drops the local session.
///
/// # Errors
/// Returns `LogoutFailed` and keeps the local session if the backend call
/// failed (a 401 still clears it through the client).
pub async fn logout(client: &ApiClient) -> Result<(), AuthError> {
    let request = client
        .request(Method::POST, LOGOUT_PATH)
        .map_err(AuthError::logout)?;
    client.send(request).await.map_err(AuthError::logout)?;

    client.session().clear_auth_data();
    client.set_auth_token(None);
    tracing::info!("logged out");
    Ok(())
}

/// Fetches the current user from the backend.
///
/// # Errors
/// Returns the client error unchanged.
pub async fn current_user(client: &ApiClient) -> Result<UserData, ApiError> {
    read_json(client.get(ME_PATH).await?).await
}
