use super::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::constants::MAX_HTTP_REDIRECTS;
use crate::core::LookupError;
use reqwest::header::{AUTHORIZATION, LOCATION};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Redirect-following GET client used by every registry lookup.
///
/// Each hop goes back through the wrapped [`Transport`], so a caching
/// transport sees (and remembers) the individual redirects.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient").finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Wrap a transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
        }
    }

    /// Send `request`, following up to [`MAX_HTTP_REDIRECTS`] redirects.
    ///
    /// The `Authorization` header is dropped when a redirect leaves the
    /// original host. A redirect without a `Location` header is returned to
    /// the caller as-is.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let origin = request.url.clone();
        let mut request = request;

        for _ in 0..=MAX_HTTP_REDIRECTS {
            let response = self.transport.send(request.clone()).await?;
            if !is_followed_redirect(response.status) {
                return Ok(response);
            }
            let Some(location) = response.header(&LOCATION) else {
                return Ok(response);
            };

            let next = resolve_location(&request.url, location)?;
            tracing::debug!(from = %request.url, to = %next, status = %response.status, "Following redirect");
            if host_of(&next) != host_of(&request.url) {
                request.headers.remove(AUTHORIZATION);
            }
            request.url = next;
        }

        Err(TransportError::TooManyRedirects {
            url: origin,
        })
    }

    /// GET `url` and deserialize a `200` JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        token: Option<&str>,
    ) -> Result<T, LookupError> {
        let body = self.get_ok(url, token).await?;
        serde_json::from_slice(&body).map_err(|e| LookupError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// GET `url` and return a `200` body as text.
    pub async fn get_text(&self, url: &str) -> Result<String, LookupError> {
        let body = self.get_ok(url, None).await?;
        String::from_utf8(body).map_err(|e| LookupError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn get_ok(&self, url: &str, token: Option<&str>) -> Result<Vec<u8>, LookupError> {
        let request = HttpRequest::get(url).with_bearer_token(token);
        let response = self.send(request).await.map_err(|e| LookupError::Transport {
            url: url.to_string(),
            reason: error_chain(&e),
        })?;

        if response.status != StatusCode::OK {
            return Err(LookupError::UnexpectedStatus {
                url: url.to_string(),
                status: response.status.as_u16(),
            });
        }
        Ok(response.body)
    }
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Resolve a possibly relative `Location` against the URL that returned it.
pub(crate) fn resolve_location(base: &str, location: &str) -> Result<String, TransportError> {
    let invalid = |reason: String| TransportError::InvalidRedirect {
        url: base.to_string(),
        reason,
    };
    let base = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    let target = base.join(location).map_err(|e| invalid(format!("bad Location '{location}': {e}")))?;
    Ok(target.to_string())
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_owned))
}

/// Render an error and its sources on one line.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
