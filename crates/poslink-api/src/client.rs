// POS backend HTTP client
//
// Wraps `reqwest::Client` with bearer-token injection, a bounded retry loop
// for transient failures, and response normalization (empty/non-JSON bodies
// become `{}`, error bodies yield their `error` message). Endpoint helpers
// live in `endpoints.rs` as inherent methods on the same type.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::LOGIN_PATH;
use crate::error::Error;
use crate::request::ApiRequest;
use crate::retry::{self, RetryPolicy};
use crate::token::{SessionToken, TokenStore};
use crate::transport::TransportConfig;

const JSON_CONTENT_TYPE: &str = "application/json";
const GENERIC_FAILURE: &str = "Request failed";

/// Error body shape. The backend uses `error`; `message` is accepted too.
#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Connection settings for an [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL including its API prefix, e.g. `http://localhost:5000/api`.
    pub base_url: Url,
    pub transport: TransportConfig,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            transport: TransportConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Authenticated JSON client for the POS backend.
///
/// Construct one per process and share it by reference (`Arc<ApiClient>`).
/// Independent instances are fully isolated, which is what tests rely on.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
    /// Live session token. Read on every attempt, written only by
    /// login / logout / a 401 response.
    token: SessionToken,
    store: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Build a client from configuration and restore any persisted token.
    pub fn new(config: &ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self, Error> {
        let http = config.transport.build_client()?;
        Self::with_client(http, config.base_url.clone(), config.retry, store)
    }

    /// Build a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        retry: RetryPolicy,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self, Error> {
        let restored = store.load()?;
        if restored.is_some() {
            debug!("restored persisted session token");
        }
        Ok(Self {
            http,
            base_url,
            retry,
            token: Arc::new(ArcSwapOption::new(restored.map(Arc::new))),
            store,
        })
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    // ── Session token ────────────────────────────────────────────────

    /// The current session token, if one is set.
    pub fn token(&self) -> Option<Arc<SecretString>> {
        self.token.load_full()
    }

    pub fn has_token(&self) -> bool {
        self.token.load().is_some()
    }

    /// A handle on the live token slot. It sees every later login, logout
    /// and 401 clear; hand it to [`ChannelConfig`](crate::ChannelConfig).
    pub fn session_token(&self) -> SessionToken {
        Arc::clone(&self.token)
    }

    /// Replace the session token and persist it.
    pub fn set_token(&self, token: SecretString) -> Result<(), Error> {
        self.store.save(&token)?;
        self.token.store(Some(Arc::new(token)));
        debug!("session token updated");
        Ok(())
    }

    /// Forget the session token, in memory and in storage.
    pub fn clear_token(&self) -> Result<(), Error> {
        self.token.store(None);
        self.store.clear()?;
        debug!("session token cleared");
        Ok(())
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Perform one logical call, retrying transient failures.
    ///
    /// Returns the parsed JSON body, or an empty object when the response
    /// carries no JSON. A 401 on a request authenticated with the session
    /// token clears that token before the error is returned; a rejected
    /// login leaves the current session alone.
    pub async fn send(&self, request: ApiRequest) -> Result<Value, Error> {
        let url = request.url(&self.base_url)?;

        let result = retry::run(&self.retry, |attempt| {
            let url = url.clone();
            let request = &request;
            async move { self.attempt(request, url, attempt).await }
        })
        .await;

        if result.as_ref().is_err_and(Error::is_auth_expired)
            && self.sends_session_token(&request)
        {
            warn!("backend rejected the session token, clearing it");
            if let Err(e) = self.clear_token() {
                warn!(error = %e, "failed to clear rejected session token");
            }
        }
        result
    }

    /// Like [`send`](Self::send), deserializing the result into `T`.
    pub async fn send_as<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, Error> {
        let value = self.send(request).await?;
        serde_json::from_value(value.clone()).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: value.to_string(),
        })
    }

    /// One attempt: build, send, normalize.
    async fn attempt(&self, request: &ApiRequest, url: Url, attempt: u32) -> Result<Value, Error> {
        debug!(method = %request.method(), %url, attempt, "sending request");

        let mut builder = self
            .http
            .request(request.method().clone(), url)
            .headers(self.headers_for(request)?);
        if let Some(body) = request.body_value() {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let resp = builder.send().await?;
        handle_response(resp).await
    }

    /// Whether a rejection of `request` means the session token is bad.
    fn sends_session_token(&self, request: &ApiRequest) -> bool {
        self.has_token()
            && request.path() != LOGIN_PATH
            && !request.headers().contains_key(AUTHORIZATION)
    }

    /// Default headers, then per-call overrides.
    fn headers_for(&self, request: &ApiRequest) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        if let Some(token) = self.token.load().as_deref() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| {
                    Error::TokenStore(format!("session token is not a valid header value: {e}"))
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        for (name, value) in request.headers() {
            headers.insert(name.clone(), value.clone());
        }
        Ok(headers)
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn handle_response(resp: reqwest::Response) -> Result<Value, Error> {
    let status = resp.status();
    let is_json = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains(JSON_CONTENT_TYPE));

    if status.is_success() {
        if !is_json {
            trace!(%status, "non-JSON success response, returning empty object");
            return Ok(empty_object());
        }
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(empty_object());
        }
        return serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        });
    }

    let message = if is_json {
        let body = resp.text().await.unwrap_or_default();
        error_message(&body)
    } else {
        GENERIC_FAILURE.to_owned()
    };

    let code = status.as_u16();
    debug!(status = code, %message, "request failed");
    if status.is_server_error() {
        Err(Error::Server {
            status: code,
            message,
        })
    } else {
        Err(Error::ClientRequest {
            status: code,
            message,
        })
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Extract a human-readable message from a JSON error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .unwrap_or_else(|| GENERIC_FAILURE.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_error_field() {
        assert_eq!(
            error_message(r#"{"error":"Invalid credentials","message":"ignored"}"#),
            "Invalid credentials"
        );
    }

    #[test]
    fn error_message_falls_back_to_message_field() {
        assert_eq!(error_message(r#"{"message":"Out of stock"}"#), "Out of stock");
    }

    #[test]
    fn error_message_defaults_when_unparseable() {
        assert_eq!(error_message("<html>502</html>"), "Request failed");
        assert_eq!(error_message(r#"{"detail":"nope"}"#), "Request failed");
        assert_eq!(error_message(""), "Request failed");
    }
}
