//! Thin HTTP client for the diagram engine.
//!
//! Requests are JSON in, JSON out. Responses are normalised to
//! [`ApiResponse`] so callers never deal with the engine's envelope. There
//! are no retries: a failed call is reported as-is.

use std::borrow::Cow;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::error::{ApiError, ApiResult};
use crate::config::ApiConfig;

/// Percent-encodes an identifier for use as a single URL path segment.
///
/// Only unreserved characters (`A-Z a-z 0-9 - _ . ~`) pass through.
#[must_use]
pub fn enc_id(id: &str) -> Cow<'_, str> {
    urlencoding::encode(id)
}

/// A normalised API response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code (always 2xx).
    pub status: u16,
    /// Response payload with any `{ "data": ... }` envelope removed.
    pub data: Value,
}

impl ApiResponse {
    /// Deserialises the payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] if the payload does not match `T`.
    pub fn into_typed<T: DeserializeOwned>(self, what: &str) -> ApiResult<T> {
        serde_json::from_value(self.data).map_err(|source| ApiError::Decode {
            what: what.to_string(),
            source,
        })
    }
}

/// Keys the engine's `{ "success": .., "data": .. }` envelope may carry.
const ENVELOPE_KEYS: [&str; 4] = ["success", "data", "error", "message"];

/// Normalises a raw response body into a payload value.
///
/// - empty body → `null`
/// - envelope object (a `data` member and only envelope keys) → `data`
/// - any other JSON → the value itself
/// - anything else → a JSON string holding the body
#[must_use]
pub fn normalize_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(mut map)) if is_envelope(&map) => map.remove("data").unwrap_or_default(),
        Ok(value) => value,
        Err(_) => Value::String(body.to_string()),
    }
}

fn is_envelope(map: &Map<String, Value>) -> bool {
    map.contains_key("data") && map.keys().all(|k| ENVELOPE_KEYS.contains(&k.as_str()))
}

/// HTTP client bound to one diagram engine.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    /// Creates a client for `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the underlying client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    /// Creates a client from the `api` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the underlying client cannot be built.
    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        Self::new(config.base_url.clone(), config.timeout())
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues a `GET` request.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout or non-2xx status.
    pub async fn get(&self, path: &str) -> ApiResult<ApiResponse> {
        self.send(Method::GET, path, None::<&Value>).await
    }

    /// Issues a `POST` request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout or non-2xx status.
    pub async fn post<B>(&self, path: &str, body: &B) -> ApiResult<ApiResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.send(Method::POST, path, Some(body)).await
    }

    /// Issues a `PUT` request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout or non-2xx status.
    pub async fn put<B>(&self, path: &str, body: &B) -> ApiResult<ApiResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.send(Method::PUT, path, Some(body)).await
    }

    /// Issues a `DELETE` request.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout or non-2xx status.
    pub async fn delete(&self, path: &str) -> ApiResult<ApiResponse> {
        self.send(Method::DELETE, path, None::<&Value>).await
    }

    async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<ApiResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(method = %method, path, "Sending API request");

        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.request_error(&method, path, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.request_error(&method, path, e))?;

        tracing::trace!(status = status.as_u16(), path, "Received API response");

        if !status.is_success() {
            return Err(ApiError::Status {
                method: method.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            data: normalize_body(&text),
        })
    }

    fn request_error(&self, method: &Method, path: &str, source: reqwest::Error) -> ApiError {
        if source.is_timeout() {
            ApiError::Timeout {
                method: method.to_string(),
                path: path.to_string(),
                secs: self.timeout.as_secs(),
            }
        } else {
            ApiError::Transport {
                method: method.to_string(),
                path: path.to_string(),
                source,
            }
        }
    }
}
