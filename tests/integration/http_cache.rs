// Integration tests for the persistent HTTP cache against a real HTTP server

use chrono::{Duration, Utc};
use depwatch::cache::{CachingTransport, HttpCache};
use depwatch::core::LookupError;
use depwatch::http::{HttpClient, ReqwestTransport};
use depwatch::test_utils::init_test_logging;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Value, json};
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header, header_exists, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(cache: &Arc<HttpCache>) -> HttpClient {
    let transport = CachingTransport::new(ReqwestTransport::new().unwrap(), Arc::clone(cache));
    HttpClient::new(Arc::new(transport))
}

/// Push the stored entry for `key` into the past so the next request revalidates.
async fn expire_now(cache: &HttpCache, key: &str) {
    let mut entry = cache.get(key).await.unwrap();
    entry.expire = Utc::now() - Duration::seconds(1);
    cache.insert(key, entry).await;
}

fn seconds_from_now(at: chrono::DateTime<Utc>) -> i64 {
    (at - Utc::now()).num_seconds()
}

#[tokio::test]
async fn test_store_serve_fresh_then_revalidate() {
    init_test_logging(None);
    let server = MockServer::start().await;
    let url = format!("{}/pkg", server.uri());

    Mock::given(method("GET"))
        .and(path("/pkg"))
        .and(header("if-none-match", "\"v1\""))
        .respond_with(
            ResponseTemplate::new(304)
                .insert_header("Age", "10")
                .insert_header("Cache-Control", "max-age=60"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pkg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"v1\"")
                .insert_header("Cache-Control", "max-age=60")
                .set_body_json(json!({"version": 1})),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(HttpCache::in_memory());
    let client = client(&cache);

    // 200 with validators is stored for about a minute
    let first: Value = client.get_json(&url, None).await.unwrap();
    assert_eq!(first["version"], 1);
    let entry = cache.get(&url).await.unwrap();
    assert_eq!(entry.etag.as_deref(), Some("\"v1\""));
    assert!((55..=60).contains(&seconds_from_now(entry.expire)));

    // Fresh entry: answered without touching the server
    let second: Value = client.get_json(&url, None).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    // Stale entry: conditional request, 304 reuses the stored body and
    // takes its expiry from the 304's own headers
    expire_now(&cache, &url).await;
    let third: Value = client.get_json(&url, None).await.unwrap();
    assert_eq!(third, first);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].headers.get("if-none-match").unwrap(), "\"v1\"");

    let entry = cache.get(&url).await.unwrap();
    assert!((45..=50).contains(&seconds_from_now(entry.expire)));
    assert_eq!(entry.etag.as_deref(), Some("\"v1\""));
}

#[tokio::test]
async fn test_last_modified_validator_is_sent() {
    let server = MockServer::start().await;
    let url = format!("{}/gem.json", server.uri());
    let stamp = "Wed, 21 Oct 2015 07:28:00 GMT";

    Mock::given(method("GET"))
        .and(path("/gem.json"))
        .and(header_exists("if-modified-since"))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gem.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Last-Modified", stamp)
                .set_body_json(json!({"name": "rails"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let cache = Arc::new(HttpCache::in_memory());
    let client = client(&cache);

    let _: Value = client.get_json(&url, None).await.unwrap();
    // No max-age: the entry is stale right away and must be revalidated
    let again: Value = client.get_json(&url, None).await.unwrap();
    assert_eq!(again["name"], "rails");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].headers.get("if-modified-since").is_none());
    assert_eq!(requests[1].headers.get("if-modified-since").unwrap(), stamp);
}

#[tokio::test]
async fn test_moved_permanently_resolves_to_target() {
    let server = MockServer::start().await;
    let old = format!("{}/old", server.uri());
    let new = format!("{}/new", server.uri());

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"n1\"")
                .insert_header("Cache-Control", "max-age=300")
                .set_body_json(json!({"moved": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(HttpCache::in_memory());
    let client = client(&cache);

    let value: Value = client.get_json(&old, None).await.unwrap();
    assert_eq!(value["moved"], true);

    let pointer = cache.get(&old).await.unwrap();
    assert_eq!(pointer.redirect_target.as_deref(), Some(new.as_str()));
    assert!(pointer.body.is_empty());

    let hit = cache.lookup(&old).await.unwrap();
    assert_eq!(hit.key, new);
    assert_eq!(hit.entry.etag.as_deref(), Some("\"n1\""));

    // Both hops are now served from the cache
    let again: Value = client.get_json(&old, None).await.unwrap();
    assert_eq!(again, value);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_gzip_body_is_stored_compressed_and_served_decoded() {
    let server = MockServer::start().await;
    let url = format!("{}/pypi/requests/json", server.uri());
    let document = json!({"info": {"project_urls": {"Source": "https://github.com/psf/requests"}}});

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(document.to_string().as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    Mock::given(method("GET"))
        .and(path("/pypi/requests/json"))
        .and(header("accept-encoding", "gzip"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Encoding", "gzip")
                .insert_header("Content-Type", "application/json")
                .insert_header("Cache-Control", "max-age=600")
                .set_body_bytes(compressed),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(HttpCache::in_memory());
    let client = client(&cache);

    let value: Value = client.get_json(&url, None).await.unwrap();
    assert_eq!(value, document);

    let entry = cache.get(&url).await.unwrap();
    assert!(entry.compressed);
    assert_eq!(entry.decoded_body().unwrap(), document.to_string().into_bytes());

    let replayed: Value = client.get_json(&url, None).await.unwrap();
    assert_eq!(replayed, document);
}

#[tokio::test]
async fn test_response_without_validators_is_not_stored() {
    let server = MockServer::start().await;
    let url = format!("{}/plain", server.uri());

    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&server)
        .await;

    let cache = Arc::new(HttpCache::in_memory());
    let client = client(&cache);

    let _: Value = client.get_json(&url, None).await.unwrap();
    let _: Value = client.get_json(&url, None).await.unwrap();
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_not_modified_without_entry_passes_through() {
    let server = MockServer::start().await;
    let url = format!("{}/confused", server.uri());

    Mock::given(method("GET"))
        .and(path("/confused"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    let cache = Arc::new(HttpCache::in_memory());
    let err = client(&cache).get_json::<Value>(&url, None).await.unwrap_err();
    assert_eq!(
        err,
        LookupError::UnexpectedStatus {
            url,
            status: 304,
        }
    );
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_concurrent_disjoint_urls_all_stored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/item/\d+$"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"x\"")
                .insert_header("Cache-Control", "max-age=60")
                .set_body_json(json!({})),
        )
        .mount(&server)
        .await;

    let cache = Arc::new(HttpCache::in_memory());
    let client = client(&cache);

    let mut handles = Vec::new();
    for i in 0..32 {
        let client = client.clone();
        let url = format!("{}/item/{i}", server.uri());
        handles.push(tokio::spawn(async move { client.get_json::<Value>(&url, None).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(cache.len().await, 32);
    for i in 0..32 {
        assert!(cache.get(&format!("{}/item/{i}", server.uri())).await.is_some());
    }
}

#[tokio::test]
async fn test_save_and_reload_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"a\"")
                .insert_header("Cache-Control", "max-age=3600")
                .set_body_json(json!({"a": 1})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/a"))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let cache_file = temp.path().join("nested").join("http-cache.bin");

    let cache = Arc::new(HttpCache::load(&cache_file).await);
    assert!(cache.is_empty().await);
    let _: Value = client(&cache).get_json(&format!("{}/b", server.uri()), None).await.unwrap();
    cache.try_save().await.unwrap();
    assert!(cache_file.exists());

    let reloaded = Arc::new(HttpCache::load(&cache_file).await);
    assert_eq!(reloaded.snapshot().await, cache.snapshot().await);
    assert_eq!(reloaded.len().await, 2);

    // A fresh run served entirely from the reloaded file
    let value: Value =
        client(&reloaded).get_json(&format!("{}/b", server.uri()), None).await.unwrap();
    assert_eq!(value["a"], 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unreadable_cache_file_starts_empty() {
    let temp = TempDir::new().unwrap();
    let cache_file = temp.path().join("http-cache.bin");
    std::fs::write(&cache_file, b"not a cache file at all").unwrap();

    let cache = HttpCache::load(&cache_file).await;
    assert!(cache.is_empty().await);

    // The next save replaces the broken file
    cache.try_save().await.unwrap();
    assert!(HttpCache::load(&cache_file).await.is_empty().await);
}
