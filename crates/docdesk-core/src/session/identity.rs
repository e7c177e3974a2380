//! Identity payloads persisted with the session.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Backend identifier. The API hands out both integer and string ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl EntityId {
    pub fn is_empty(&self) -> bool {
        matches!(self, EntityId::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(n) => write!(f, "{n}"),
            EntityId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Int(n)
    }
}

/// Logged-in user. Fields beyond `id` and `email` are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub id: EntityId,
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserData {
    pub fn new(id: impl Into<EntityId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            extra: Map::new(),
        }
    }

    /// Adds an extra field (builder style).
    #[must_use]
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.extra
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    fn flag(&self, key: &str) -> bool {
        self.extra.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn username(&self) -> Option<&str> {
        self.str_field("username")
    }

    /// "First Last", falling back to the username, then "Unknown User".
    pub fn full_name(&self) -> String {
        let first = self.str_field("first_name").unwrap_or("");
        let last = self.str_field("last_name").unwrap_or("");
        let joined = format!("{first} {last}");
        let trimmed = joined.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
        self.username().unwrap_or("Unknown User").to_string()
    }

    pub fn is_superuser(&self) -> bool {
        self.flag("is_superuser")
    }

    pub fn is_staff(&self) -> bool {
        self.flag("is_staff")
    }

    pub fn is_admin(&self) -> bool {
        self.is_superuser() || self.is_staff()
    }

    /// Role name: either a plain string `role` or the `role_name` of a role object.
    pub fn role_name(&self) -> Option<&str> {
        match self.extra.get("role")? {
            Value::String(s) if !s.is_empty() => Some(s),
            Value::Object(obj) => obj
                .get("role_name")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty()),
            _ => None,
        }
    }

    pub fn department_name(&self) -> Option<&str> {
        self.extra
            .get("departement")?
            .get("dep_name")
            .and_then(Value::as_str)
    }

    pub fn permissions(&self) -> Vec<&str> {
        self.extra
            .get("permissions")
            .and_then(Value::as_array)
            .map(|perms| perms.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions().contains(&permission)
    }
}

/// Account the user acts under. Fields beyond `id` are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountData {
    pub id: EntityId,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccountData {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            extra: Map::new(),
        }
    }
}

/// Snapshot of the persisted session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub token: Option<String>,
    pub user: Option<UserData>,
    pub account: Option<AccountData>,
    pub role: Option<String>,
}

impl AuthState {
    /// Authenticated only when both a token and a user are present.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }
}
