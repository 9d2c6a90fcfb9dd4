//! Outbound HTTP plumbing shared by every registry client.
//!
//! The layer is deliberately small: a GET-only request/response pair, a
//! [`Transport`] trait that executes one request without following redirects,
//! and [`HttpClient`], which follows redirects by re-entering the transport.
//!
//! Because redirects are followed above the transport, a
//! [`CachingTransport`](crate::cache::CachingTransport) placed in the stack
//! observes every hop, including raw `301` and gzip-encoded responses.
//!
//! ```text
//! registry client ─► HttpClient ─► CachingTransport ─► ReqwestTransport ─► network
//!                    (redirects)   (conditional cache)  (single request)
//! ```

mod client;

pub use client::HttpClient;
pub(crate) use client::resolve_location;

use crate::constants::USER_AGENT;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

/// A GET request as seen by the transport stack.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Absolute request URL; also the HTTP cache key.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
}

impl HttpRequest {
    /// Create a GET request with no headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Set a header, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach an `Authorization: Bearer` header when a token is present.
    ///
    /// Tokens that are not valid header values are ignored with a warning.
    #[must_use]
    pub fn with_bearer_token(self, token: Option<&str>) -> Self {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return self;
        };
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.with_header(reqwest::header::AUTHORIZATION, value)
            }
            Err(_) => {
                tracing::warn!("Ignoring API token that is not a valid header value");
                self
            }
        }
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body, already decoded from any transfer compression
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response with the given status, no headers and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Create a `200 OK` response carrying `body`.
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            body,
            ..Self::new(StatusCode::OK)
        }
    }

    /// Set a header, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Header value as a string, if present and valid ASCII.
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Failure to obtain a response.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be sent or no response arrived.
    #[error("request to {url} failed")]
    Request {
        /// Requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The response body could not be read or decoded.
    #[error("failed to read response body from {url}: {reason}")]
    Body {
        /// Requested URL
        url: String,
        /// What went wrong
        reason: String,
    },

    /// A redirect pointed somewhere unusable.
    #[error("invalid redirect from {url}: {reason}")]
    InvalidRedirect {
        /// URL that answered with the redirect
        url: String,
        /// Why it cannot be followed
        reason: String,
    },

    /// The redirect chain exceeded the hop limit.
    #[error("too many redirects starting at {url}")]
    TooManyRedirects {
        /// URL of the original request
        url: String,
    },
}

/// Executes a single HTTP request.
///
/// Implementations must not follow redirects or transparently decompress
/// bodies; both are handled by layers above.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and buffer the full response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with redirects disabled.
    ///
    /// No timeout is configured: a stalled registry holds its request (and
    /// the enrichment slot that issued it) until the connection drops.
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
        })
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        tracing::debug!(url = %request.url, "GET");
        let response =
            self.client.get(&request.url).headers(request.headers).send().await.map_err(
                |source| TransportError::Request {
                    url: request.url.clone(),
                    source,
                },
            )?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| TransportError::Body {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;

        Ok(HttpResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
