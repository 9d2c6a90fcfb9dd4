use super::entry::{CacheEntry, expiry, gunzip, header_string, is_gzip};
use super::HttpCache;
use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::header::{
    ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, ETAG, HeaderMap, HeaderValue,
    IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, LOCATION,
};
use std::sync::Arc;

/// [`Transport`] decorator that consults an [`HttpCache`] around every request.
///
/// The wrapped transport must hand back raw responses: no redirect following
/// and no transparent decompression.
pub struct CachingTransport<T> {
    inner: T,
    cache: Arc<HttpCache>,
}

impl<T: Transport> CachingTransport<T> {
    /// Wrap `inner` with `cache`.
    pub fn new(inner: T, cache: Arc<HttpCache>) -> Self {
        Self {
            inner,
            cache,
        }
    }

    /// The underlying cache.
    pub fn cache(&self) -> &Arc<HttpCache> {
        &self.cache
    }

    /// Serve a fresh entry, or attach validators of a stale one to `request`.
    async fn intercept(&self, request: &mut HttpRequest) -> Option<HttpResponse> {
        let hit = self.cache.lookup(&request.url).await?;

        if hit.entry.is_fresh(Utc::now()) {
            match hit.entry.decoded_body() {
                Ok(body) => {
                    tracing::debug!(url = %request.url, key = %hit.key, "HTTP cache hit");
                    return Some(HttpResponse::ok(body));
                }
                Err(e) => {
                    tracing::warn!("Evicting corrupt cache entry for {}: {e}", hit.key);
                    self.cache.remove(&hit.key).await;
                    return None;
                }
            }
        }

        tracing::debug!(url = %request.url, "Revalidating stale cache entry");
        if let Some(value) = hit.entry.etag.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
            request.headers.insert(IF_NONE_MATCH, value);
        }
        if let Some(value) =
            hit.entry.last_modified.as_deref().and_then(|v| HeaderValue::from_str(v).ok())
        {
            request.headers.insert(IF_MODIFIED_SINCE, value);
        }
        None
    }

    async fn on_response(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<HttpResponse, TransportError> {
        match response.status {
            StatusCode::NOT_MODIFIED => self.on_not_modified(request, response).await,
            StatusCode::OK => self.on_ok(request, response).await,
            StatusCode::MOVED_PERMANENTLY => {
                self.on_moved(request, &response).await;
                Ok(response)
            }
            _ => Ok(response),
        }
    }

    async fn on_not_modified(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<HttpResponse, TransportError> {
        let Some(hit) = self.cache.lookup(&request.url).await else {
            tracing::warn!("Received 304 for {} without a cached response", request.url);
            return Ok(response);
        };

        let mut entry = hit.entry;
        let body = match entry.decoded_body() {
            Ok(body) => body,
            Err(e) => {
                self.cache.remove(&hit.key).await;
                return Err(TransportError::Body {
                    url: request.url.clone(),
                    reason: format!("cached body is corrupt: {e}"),
                });
            }
        };

        entry.expire = expiry(&response.headers, Utc::now());
        if let Some(etag) = header_string(&response.headers, &ETAG) {
            entry.etag = Some(etag);
        }
        if let Some(last_modified) = header_string(&response.headers, &LAST_MODIFIED) {
            entry.last_modified = Some(last_modified);
        }
        tracing::debug!(url = %request.url, expire = %entry.expire, "Revalidated cache entry");
        self.cache.insert(hit.key, entry).await;

        let mut headers = response.headers;
        strip_encoding(&mut headers);
        Ok(HttpResponse {
            status: StatusCode::OK,
            headers,
            body,
        })
    }

    async fn on_ok(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<HttpResponse, TransportError> {
        let HttpResponse {
            status,
            mut headers,
            body: raw,
        } = response;

        let compressed = is_gzip(&headers);
        let body = if compressed {
            gunzip(&raw).map_err(|e| TransportError::Body {
                url: request.url.clone(),
                reason: format!("invalid gzip body: {e}"),
            })?
        } else {
            raw.clone()
        };

        let entry = CacheEntry::from_response(&headers, raw, Utc::now());
        if entry.is_worth_storing(Utc::now()) {
            self.cache.insert(request.url.clone(), entry).await;
        } else {
            tracing::debug!(url = %request.url, "Response has no validators or freshness, not cached");
        }

        if compressed {
            strip_encoding(&mut headers);
        }
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn on_moved(&self, request: &HttpRequest, response: &HttpResponse) {
        let Some(location) = response.header(&LOCATION) else {
            return;
        };
        match crate::http::resolve_location(&request.url, location) {
            Ok(target) if target != request.url => {
                self.cache.insert(request.url.clone(), CacheEntry::redirect(target, Utc::now())).await;
            }
            Ok(_) => tracing::warn!("Ignoring self-redirect from {}", request.url),
            Err(e) => tracing::warn!("{e}"),
        }
    }
}

fn strip_encoding(headers: &mut HeaderMap) {
    headers.remove(CONTENT_ENCODING);
    headers.remove(CONTENT_LENGTH);
}

#[async_trait]
impl<T: Transport> Transport for CachingTransport<T> {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Some(response) = self.intercept(&mut request).await {
            return Ok(response);
        }
        request.headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        let response = self.inner.send(request.clone()).await?;
        self.on_response(&request, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use reqwest::header::{AGE, CACHE_CONTROL};
    use std::collections::VecDeque;
    use std::io::Write;
    use std::sync::Mutex;

    /// Plays back canned responses in order and records requests.
    #[derive(Default)]
    struct Playback {
        responses: Mutex<VecDeque<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl Playback {
        fn with(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl Transport for Playback {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| HttpResponse::new(StatusCode::INTERNAL_SERVER_ERROR)))
        }
    }

    const URL: &str = "https://registry.test/pkg";

    fn setup(responses: Vec<HttpResponse>) -> (Arc<Playback>, CachingTransport<Arc<Playback>>) {
        let playback = Arc::new(Playback::with(responses));
        let transport = CachingTransport::new(playback.clone(), Arc::new(HttpCache::in_memory()));
        (playback, transport)
    }

    fn ok_v1() -> HttpResponse {
        HttpResponse::ok(b"v1-body".to_vec())
            .with_header(ETAG, HeaderValue::from_static("\"v1\""))
            .with_header(CACHE_CONTROL, HeaderValue::from_static("max-age=60"))
    }

    async fn expire_entry(transport: &CachingTransport<Arc<Playback>>, key: &str) {
        let mut entry = transport.cache().get(key).await.unwrap();
        entry.expire = Utc::now() - Duration::seconds(1);
        transport.cache().insert(key, entry).await;
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_network() {
        let (playback, transport) = setup(vec![ok_v1()]);

        let first = transport.send(HttpRequest::get(URL)).await.unwrap();
        assert_eq!(first.body, b"v1-body");
        let second = transport.send(HttpRequest::get(URL)).await.unwrap();
        assert_eq!(second.status, StatusCode::OK);
        assert_eq!(second.body, b"v1-body");

        assert_eq!(playback.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_sends_validators() {
        let not_modified = HttpResponse::new(StatusCode::NOT_MODIFIED)
            .with_header(AGE, HeaderValue::from_static("10"))
            .with_header(CACHE_CONTROL, HeaderValue::from_static("max-age=60"));
        let (playback, transport) = setup(vec![ok_v1(), not_modified]);

        transport.send(HttpRequest::get(URL)).await.unwrap();
        expire_entry(&transport, URL).await;

        let before = Utc::now();
        let response = transport.send(HttpRequest::get(URL)).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, b"v1-body");

        let requests = playback.requests.lock().unwrap();
        assert_eq!(requests[1].headers.get(IF_NONE_MATCH).unwrap(), "\"v1\"");
        assert_eq!(requests[1].headers.get(ACCEPT_ENCODING).unwrap(), "gzip");

        let entry = stored_entry(&transport).await;
        assert!(entry.expire >= before + Duration::seconds(50));
        assert!(entry.expire <= Utc::now() + Duration::seconds(50));
        assert_eq!(entry.body, b"v1-body");
    }

    async fn stored_entry(transport: &CachingTransport<Arc<Playback>>) -> CacheEntry {
        transport.cache().get(URL).await.unwrap()
    }

    #[tokio::test]
    async fn test_gzip_body_is_decoded_and_stored_compressed() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"{\"name\":\"pkg\"}").unwrap();
        let gz = encoder.finish().unwrap();

        let response = HttpResponse::ok(gz.clone())
            .with_header(CONTENT_ENCODING, HeaderValue::from_static("gzip"))
            .with_header(CONTENT_LENGTH, HeaderValue::from(gz.len()))
            .with_header(CACHE_CONTROL, HeaderValue::from_static("max-age=60"));
        let (_, transport) = setup(vec![response]);

        let response = transport.send(HttpRequest::get(URL)).await.unwrap();
        assert_eq!(response.body, b"{\"name\":\"pkg\"}");
        assert!(response.headers.get(CONTENT_ENCODING).is_none());
        assert!(response.headers.get(CONTENT_LENGTH).is_none());

        let entry = transport.cache().get(URL).await.unwrap();
        assert!(entry.compressed);
        assert_eq!(entry.body, gz);

        // Served from cache, decompressed again
        let again = transport.send(HttpRequest::get(URL)).await.unwrap();
        assert_eq!(again.body, b"{\"name\":\"pkg\"}");
    }

    #[tokio::test]
    async fn test_corrupt_fresh_entry_is_evicted() {
        let (playback, transport) = setup(vec![ok_v1()]);
        let mut bad = CacheEntry::from_response(&HeaderMap::new(), b"not gzip".to_vec(), Utc::now());
        bad.compressed = true;
        bad.expire = Utc::now() + Duration::seconds(600);
        transport.cache().insert(URL, bad).await;

        let response = transport.send(HttpRequest::get(URL)).await.unwrap();
        assert_eq!(response.body, b"v1-body");
        assert_eq!(playback.requests.lock().unwrap().len(), 1);
        assert!(!transport.cache().get(URL).await.unwrap().compressed);
    }

    #[tokio::test]
    async fn test_304_without_entry_passes_through() {
        let (_, transport) = setup(vec![HttpResponse::new(StatusCode::NOT_MODIFIED)]);
        let response = transport.send(HttpRequest::get(URL)).await.unwrap();
        assert_eq!(response.status, StatusCode::NOT_MODIFIED);
        assert!(transport.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_301_stores_redirect_pointer() {
        let moved = HttpResponse::new(StatusCode::MOVED_PERMANENTLY)
            .with_header(LOCATION, HeaderValue::from_static("/pkg-renamed"));
        let (_, transport) = setup(vec![moved]);

        let response = transport.send(HttpRequest::get(URL)).await.unwrap();
        assert_eq!(response.status, StatusCode::MOVED_PERMANENTLY);

        let pointer = transport.cache().get(URL).await.unwrap();
        assert_eq!(pointer.redirect_target.as_deref(), Some("https://registry.test/pkg-renamed"));
    }

    #[tokio::test]
    async fn test_uncacheable_and_error_responses_are_not_stored() {
        let (_, transport) = setup(vec![
            HttpResponse::ok(b"plain".to_vec()),
            HttpResponse::new(StatusCode::NOT_FOUND),
        ]);

        transport.send(HttpRequest::get(URL)).await.unwrap();
        let missing = transport.send(HttpRequest::get(URL)).await.unwrap();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert!(transport.cache().is_empty().await);
    }
}
