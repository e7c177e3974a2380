//! Persisted session state (token, user, account, role).
//!
//! All reads and writes of the four session keys go through [`SessionStore`].
//! Reads never fail: unreadable or malformed values degrade to `None`.
//! Writes of credentials either land completely or report an error.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::header::HeaderValue;
use serde_json::Value;

mod identity;
mod storage;

pub use identity::{AccountData, AuthState, EntityId, UserData};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError, StorageOp};

/// Fixed storage keys.
pub mod keys {
    pub const TOKEN: &str = "auth_token";
    pub const USER_DATA: &str = "user_data";
    pub const ACCOUNT_DATA: &str = "account_data";
    pub const ROLE: &str = "user_role";

    pub const ALL: [&str; 4] = [TOKEN, USER_DATA, ACCOUNT_DATA, ROLE];
}

/// Errors from session mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A required field was empty or missing; nothing was persisted.
    InvalidSessionData { field: &'static str },
    /// The backend rejected the write.
    Storage(StorageError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidSessionData { field } => {
                write!(f, "Invalid authentication data: {field} is missing or empty")
            }
            SessionError::Storage(err) => write!(f, "Storage operation failed: {err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Storage(err) => Some(err),
            SessionError::InvalidSessionData { .. } => None,
        }
    }
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        SessionError::Storage(err)
    }
}

/// Masks a token for display, keeping a short prefix.
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 16 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(12).collect();
    format!("{prefix}...")
}

/// Session store with a pluggable backend.
///
/// Construct once at startup and share (`Arc<SessionStore>`) with the API
/// client and every collaborator that needs identity data.
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Opens a file-backed store at `path` (created on first write).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStore::new(path)))
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "Error retrieving session value");
                None
            }
        }
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "Discarding malformed session value");
                None
            }
        }
    }

    /// Current bearer token. A stored empty string reads as absent.
    pub fn token(&self) -> Option<String> {
        self.read_raw(keys::TOKEN).filter(|t| !t.is_empty())
    }

    pub fn user_data(&self) -> Option<UserData> {
        self.read_json(keys::USER_DATA)
    }

    pub fn account_data(&self) -> Option<AccountData> {
        self.read_json(keys::ACCOUNT_DATA)
    }

    pub fn role(&self) -> Option<String> {
        self.read_raw(keys::ROLE).filter(|r| !r.is_empty())
    }

    pub fn auth_state(&self) -> AuthState {
        AuthState {
            token: self.token(),
            user: self.user_data(),
            account: self.account_data(),
            role: self.role(),
        }
    }

    /// Persists a fresh session.
    ///
    /// Every field is validated before anything is written, and the four
    /// entries go to the backend as a single batch.
    ///
    /// # Errors
    /// `InvalidSessionData` if any field is empty (nothing written),
    /// `Storage` if the backend write failed.
    pub fn store_auth_data(
        &self,
        token: &str,
        user: &UserData,
        account: &AccountData,
        role: &str,
    ) -> Result<(), SessionError> {
        if token.trim().is_empty() || !is_header_safe(token) {
            return Err(SessionError::InvalidSessionData { field: "token" });
        }
        if user.id.is_empty() {
            return Err(SessionError::InvalidSessionData { field: "user" });
        }
        if account.id.is_empty() {
            return Err(SessionError::InvalidSessionData { field: "account" });
        }
        if role.trim().is_empty() {
            return Err(SessionError::InvalidSessionData { field: "role" });
        }

        let user_json = serialize(user)?;
        let account_json = serialize(account)?;

        self.backend.set_many(&[
            (keys::TOKEN, token),
            (keys::USER_DATA, &user_json),
            (keys::ACCOUNT_DATA, &account_json),
            (keys::ROLE, role),
        ])?;

        tracing::debug!(token = %mask_token(token), role, "stored session");
        Ok(())
    }

    /// Removes all four keys. Individual failures are logged, not returned.
    pub fn clear_auth_data(&self) {
        for key in keys::ALL {
            if let Err(err) = self.backend.remove(key) {
                tracing::warn!(key, error = %err, "Error removing session value");
            }
        }
    }

    /// Shallow-merges `patch` into the stored user and persists the result.
    ///
    /// # Errors
    /// `InvalidSessionData` if no user is stored, the patch is not an object,
    /// or the merged user loses its `id`/`email`; `Storage` on write failure.
    pub fn update_user_profile(&self, patch: &Value) -> Result<UserData, SessionError> {
        let current = self
            .user_data()
            .ok_or(SessionError::InvalidSessionData { field: "user" })?;
        let Value::Object(patch) = patch else {
            return Err(SessionError::InvalidSessionData { field: "user" });
        };

        let mut merged = match serde_json::to_value(&current) {
            Ok(Value::Object(map)) => map,
            _ => return Err(SessionError::InvalidSessionData { field: "user" }),
        };
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }

        let updated: UserData = serde_json::from_value(Value::Object(merged))
            .map_err(|_| SessionError::InvalidSessionData { field: "user" })?;
        if updated.id.is_empty() {
            return Err(SessionError::InvalidSessionData { field: "user" });
        }

        self.backend.set(keys::USER_DATA, &serialize(&updated)?)?;
        Ok(updated)
    }
}

/// Whether `token` can travel as `Authorization: Bearer <token>`.
fn is_header_safe(token: &str) -> bool {
    HeaderValue::from_str(&format!("Bearer {token}")).is_ok()
}

fn serialize<T: serde::Serialize>(value: &T) -> Result<String, SessionError> {
    serde_json::to_string(value).map_err(|e| {
        SessionError::Storage(StorageError::new(
            StorageOp::Write,
            format!("serialize session value: {e}"),
        ))
    })
}
