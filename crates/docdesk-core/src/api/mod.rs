//! Authenticated HTTP client.
//!
//! Every call goes through [`ApiClient::send`], which attaches the bearer
//! token from the session store and applies the failure policy:
//! - no response: normalized [`ApiErrorKind::Network`]
//! - 401: session cleared, invalidation hook invoked, error still returned
//! - 403 / 500: logged and returned unchanged
//! - anything else non-2xx: returned unchanged

use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ApiConfig;
use crate::session::SessionStore;

mod error;
mod hook;

pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use hook::InvalidationHook;

/// HTTP client bound to one backend and one session store.
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
    session: Arc<SessionStore>,
    hook: Arc<dyn InvalidationHook>,
    default_auth: RwLock<Option<HeaderValue>>,
    login_path: String,
}

fn bearer(token: &str) -> Option<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).ok()?;
    value.set_sensitive(true);
    Some(value)
}

impl ApiClient {
    /// Creates a client for the configured base URL (env override applies).
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn new(
        config: &ApiConfig,
        session: Arc<SessionStore>,
        hook: Arc<dyn InvalidationHook>,
    ) -> Result<Self> {
        let base = config.effective_base_url()?;
        Self::with_base_url(base, config, session, hook)
    }

    /// Creates a client for an explicit base URL.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_base_url(
        mut base: Url,
        config: &ApiConfig,
        session: Arc<SessionStore>,
        hook: Arc<dyn InvalidationHook>,
    ) -> Result<Self> {
        // Relative joins must keep any path prefix of the base.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .cookie_store(config.with_credentials)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base,
            http,
            session,
            hook,
            default_auth: RwLock::new(None),
            login_path: config.login_path.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Resolves `path` against the base URL. Absolute URLs pass through.
    ///
    /// # Errors
    /// Returns a `Request` error if the result is not a valid URL.
    pub fn url(&self, path: &str) -> ApiResult<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|e| ApiError::request(format!("invalid URL {path}: {e}")));
        }
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::request(format!("invalid path {path}: {e}")))
    }

    /// Starts a request. Send it with [`ApiClient::send`].
    ///
    /// # Errors
    /// Returns a `Request` error if the path does not resolve.
    pub fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        Ok(self.http.request(method, self.url(path)?))
    }

    /// Sets or unsets the default `Authorization` header.
    ///
    /// The default applies only when the session store holds no token.
    pub fn set_auth_token(&self, token: Option<&str>) {
        let value = token.filter(|t| !t.is_empty()).and_then(|t| {
            let header = bearer(t);
            if header.is_none() {
                tracing::warn!("token is not a valid header value; default header removed");
            }
            header
        });
        *self
            .default_auth
            .write()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }

    fn default_auth(&self) -> Option<HeaderValue> {
        self.default_auth
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn attach_auth(&self, request: &mut reqwest::Request) {
        let stored = self.session.token().and_then(|token| {
            let value = bearer(&token);
            if value.is_none() {
                tracing::warn!("stored token is not a valid header value");
            }
            value
        });
        if let Some(value) = stored {
            request.headers_mut().insert(AUTHORIZATION, value);
        } else if !request.headers().contains_key(AUTHORIZATION)
            && let Some(value) = self.default_auth()
        {
            request.headers_mut().insert(AUTHORIZATION, value);
        }
    }

    fn invalidate_session(&self) {
        self.session.clear_auth_data();
        self.set_auth_token(None);
        tracing::info!(login_path = %self.login_path, "session expired, redirecting to login");
        self.hook.on_session_invalidated(&self.login_path);
    }

    /// Sends a request through the auth/failure pipeline.
    ///
    /// # Errors
    /// See the module docs for the classification of failures.
    pub async fn send(&self, builder: RequestBuilder) -> ApiResult<Response> {
        let mut request = builder
            .build()
            .map_err(|e| ApiError::request(format!("Failed to build request: {e}")))?;
        self.attach_auth(&mut request);

        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(%method, %url, "sending request");

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(%method, %url, error = %err, "Network error");
                return Err(ApiError::network(err.to_string()));
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::http_status(status.as_u16(), &body);
        match err.kind {
            ApiErrorKind::AuthenticationExpired => self.invalidate_session(),
            ApiErrorKind::Forbidden => {
                tracing::warn!(%method, %url, error = %err, "Forbidden access");
            }
            ApiErrorKind::ServerError => {
                tracing::error!(%method, %url, error = %err, "Server error");
            }
            _ => tracing::debug!(%method, %url, status = status.as_u16(), "request failed"),
        }
        Err(err)
    }

    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn get(&self, path: &str) -> ApiResult<Response> {
        self.send(self.request(Method::GET, path)?).await
    }

    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn delete(&self, path: &str) -> ApiResult<Response> {
        self.send(self.request(Method::DELETE, path)?).await
    }

    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<Response> {
        self.send(self.request(Method::POST, path)?.json(body)).await
    }

    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn put_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Response> {
        self.send(self.request(Method::PUT, path)?.json(body)).await
    }

    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn patch_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<Response> {
        self.send(self.request(Method::PATCH, path)?.json(body)).await
    }
}

/// Reads a successful response body as JSON.
///
/// # Errors
/// Returns a `Parse` error if the body does not deserialize into `T`.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let url = response.url().clone();
    response
        .json()
        .await
        .map_err(|e| ApiError::parse(format!("Failed to parse response from {url}: {e}")))
}
