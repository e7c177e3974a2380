use std::fmt;

use serde_json::Value;

/// Category of a failed API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// No response was received (DNS, refused connection, timeout)
    Network,
    /// 401: the session was cleared and the invalidation hook ran
    AuthenticationExpired,
    /// 403
    Forbidden,
    /// 500
    ServerError,
    /// Any other non-2xx status
    HttpStatus,
    /// The request could not be built (bad URL, bad header)
    Request,
    /// The response body did not match the expected shape
    Parse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Network => write!(f, "network"),
            ApiErrorKind::AuthenticationExpired => write!(f, "authentication_expired"),
            ApiErrorKind::Forbidden => write!(f, "forbidden"),
            ApiErrorKind::ServerError => write!(f, "server_error"),
            ApiErrorKind::HttpStatus => write!(f, "http_status"),
            ApiErrorKind::Request => write!(f, "request"),
            ApiErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Structured error from the API client.
///
/// HTTP failures keep the original status and raw body so the caller can
/// render whatever the backend said.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// One-line summary suitable for display
    pub message: String,
    /// Raw response body or transport error text
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            details: None,
        }
    }

    /// Normalized transport failure. The raw error text goes to `details`.
    pub fn network(details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::new(ApiErrorKind::Network, "Network error occurred")
        }
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Request, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    /// Creates an error for a non-2xx response.
    pub fn http_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 => ApiErrorKind::AuthenticationExpired,
            403 => ApiErrorKind::Forbidden,
            500 => ApiErrorKind::ServerError,
            _ => ApiErrorKind::HttpStatus,
        };
        let message = match extract_server_message(body) {
            Some(msg) => format!("HTTP {status}: {msg}"),
            None => format!("HTTP {status}"),
        };
        Self {
            kind,
            status: Some(status),
            message,
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    /// Message the backend put in the body (`message`, `detail` or `error`).
    pub fn server_message(&self) -> Option<String> {
        if self.status.is_none() {
            return None;
        }
        self.details.as_deref().and_then(extract_server_message)
    }

    /// Body parsed as JSON, if any.
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_str(self.details.as_deref()?).ok()
    }
}

fn extract_server_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    ["message", "detail", "error"].iter().find_map(|key| {
        match json.get(*key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(obj) => obj.get("message")?.as_str().map(str::to_string),
            _ => None,
        }
    })
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for API client operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
