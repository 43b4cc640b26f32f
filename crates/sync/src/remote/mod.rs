//! The authoritative remote store.
//!
//! The synchronizer only sees [`RemoteCall`]: an endpoint plus request
//! options in, JSON out. [`HttpRemote`] is the production implementation;
//! tests script their own. [`CommerceApi`] layers the typed cart, wishlist
//! and catalog endpoints and the per-call timeout on top.

mod api;
mod http;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use api::{CommerceApi, UpsertLine};
pub(crate) use api::decode_list;
pub use http::HttpRemote;

/// Errors from the remote store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Transport-level failure (connection refused, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status code.
    #[error("Remote returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Rate limited by the remote.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The call did not finish within the configured bound.
    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    /// Endpoint could not be joined onto the base URL.
    #[error("Invalid endpoint {endpoint:?}: {source}")]
    Url {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The remote is unavailable for some other reason (used by fakes).
    #[error("Remote unavailable: {0}")]
    Unavailable(String),
}

impl RemoteError {
    /// `true` for 404 responses.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// HTTP verb for a remote call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything about a call except the endpoint and credentials.
///
/// Serializes deterministically (sorted query), which the read-through
/// cache relies on for its keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestOptions {
    pub method: Method,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RequestOptions {
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn post(body: Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn patch(body: Value) -> Self {
        Self {
            method: Method::Patch,
            body: Some(body),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn delete() -> Self {
        Self {
            method: Method::Delete,
            ..Self::default()
        }
    }

    /// Builder-style query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }
}

/// `remoteCall(endpoint, options) -> JSON | error`.
///
/// `token` is the shopper's access token; `None` for anonymous reads.
pub trait RemoteCall: Send + Sync {
    fn call(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        token: Option<&SecretString>,
    ) -> impl Future<Output = Result<Value, RemoteError>> + Send;
}

impl<T: RemoteCall> RemoteCall for Arc<T> {
    fn call(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        token: Option<&SecretString>,
    ) -> impl Future<Output = Result<Value, RemoteError>> + Send {
        (**self).call(endpoint, options, token)
    }
}
