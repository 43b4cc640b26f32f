//! `reqwest` implementation of [`RemoteCall`].

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, error, instrument};
use url::Url;

use super::{Method, RemoteCall, RemoteError, RequestOptions};

const USER_AGENT: &str = concat!("np-commerce/", env!("CARGO_PKG_VERSION"));

/// JSON-over-HTTP remote store rooted at a base URL.
#[derive(Clone)]
pub struct HttpRemote {
    inner: Arc<HttpRemoteInner>,
}

struct HttpRemoteInner {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for HttpRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRemote")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpRemote {
    /// Create a client for `base_url` (which should end in `/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: Url) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            inner: Arc::new(HttpRemoteInner { client, base_url }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve an endpoint and its query against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Url`] if the endpoint is not a valid relative path.
    pub fn endpoint_url(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<Url, RemoteError> {
        let mut url = self
            .inner
            .base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|source| RemoteError::Url {
                endpoint: endpoint.to_string(),
                source,
            })?;

        if !options.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(options.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }
}

const fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl RemoteCall for HttpRemote {
    #[instrument(
        skip(self, options, token),
        fields(method = %options.method, endpoint = %endpoint)
    )]
    async fn call(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        token: Option<&SecretString>,
    ) -> Result<Value, RemoteError> {
        let url = self.endpoint_url(endpoint, options)?;

        let mut request = self
            .inner
            .client
            .request(to_reqwest(options.method), url)
            .header("Accept", "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(RemoteError::RateLimited(retry_after));
        }

        let text = response.text().await?;

        if !status.is_success() {
            // 404 is routine for idempotent deletes.
            if status == reqwest::StatusCode::NOT_FOUND {
                debug!("Remote returned 404");
            } else {
                error!(
                    status = %status,
                    body = %text.chars().take(500).collect::<String>(),
                    "Remote returned non-success status"
                );
            }
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }

        if text.trim().is_empty() {
            debug!("Empty response body");
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse remote response"
            );
            RemoteError::Decode(e)
        })
    }
}
