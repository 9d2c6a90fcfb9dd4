// Integration tests for concurrent enrichment and whole-tree scans

use chrono::Utc;
use depwatch::cli::{ScanSettings, run_scan_with};
use depwatch::core::LookupError;
use depwatch::enrich::{Enricher, WarnPolicy};
use depwatch::http::{HttpClient, ReqwestTransport};
use depwatch::models::{Dependency, Ecosystem, Image, Language, Module, RepoCoordinates};
use depwatch::orchestrator::Scan;
use depwatch::registry::{Endpoints, Registries};
use depwatch::test_utils::{MemoryReporter, ScriptedTransport, init_test_logging};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "http://registry.test";

fn enricher(transport: &Arc<ScriptedTransport>) -> Enricher {
    let client = HttpClient::new(transport.clone());
    Enricher::new(Registries::new(client, Endpoints::all_at(BASE), None))
}

fn npm(name: &str) -> Dependency {
    Module::new(Ecosystem::Npm, name).into()
}

/// Routes for an npm package `name` hosted at `github.com/acme/{name}`.
fn healthy_package(transport: ScriptedTransport, name: &str) -> ScriptedTransport {
    transport
        .json(
            format!("{BASE}/npm/{name}/latest"),
            &json!({"repository": {"type": "git", "url": format!("git+https://github.com/acme/{name}.git")}}),
        )
        .json(
            format!("{BASE}/github/repos/acme/{name}"),
            &json!({"archived": false, "pushed_at": Utc::now().to_rfc3339()}),
        )
}

async fn wait_for_memo(scan: &Scan, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while scan.caches().len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_admission_never_exceeds_capacity() {
    init_test_logging(None);
    let transport = Arc::new(ScriptedTransport::new().with_delay(Duration::from_millis(20)));
    let reporter = Arc::new(MemoryReporter::new());
    let mut scan = Scan::new(enricher(&transport), WarnPolicy::default(), reporter.clone(), 3);

    // Capacity is shared by every manifest of the scan
    for m in 0..4 {
        let dependencies = (0..10).map(|i| npm(&format!("pkg-{m}-{i}"))).collect();
        scan.dispatch(Path::new(&format!("m{m}/package.json")), dependencies);
    }
    let summary = scan.finish().await;

    assert_eq!(summary.manifests, 4);
    assert_eq!(summary.enriched, 40);
    assert_eq!(summary.errors, 40);
    assert_eq!(transport.total_calls(), 40);
    assert!(transport.peak_in_flight() >= 1);
    assert!(transport.peak_in_flight() <= 3, "peak was {}", transport.peak_in_flight());
    assert_eq!(reporter.findings().len(), 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_for_same_module_are_best_effort() {
    let transport = Arc::new(
        healthy_package(ScriptedTransport::new(), "foo").with_delay(Duration::from_millis(50)),
    );
    let reporter = Arc::new(MemoryReporter::new());
    let mut scan = Scan::new(enricher(&transport), WarnPolicy::default(), reporter.clone(), 10);

    // Both dispatched before either task can store a result
    scan.dispatch(Path::new("a/package.json"), vec![npm("foo")]);
    scan.dispatch(Path::new("b/package.json"), vec![npm("foo")]);
    let summary = scan.finish().await;

    let calls = transport.calls(&format!("{BASE}/npm/foo/latest"));
    assert!((1..=2).contains(&calls), "npm was called {calls} times");
    assert_eq!(summary.passes, 2);
    assert_eq!(
        reporter.sorted_lines(),
        vec!["├ INFO: pass foo (a/package.json)", "├ INFO: pass foo (b/package.json)"]
    );
}

#[tokio::test]
async fn test_memo_hit_is_reported_without_lookup() {
    let transport = Arc::new(healthy_package(ScriptedTransport::new(), "foo"));
    let reporter = Arc::new(MemoryReporter::new());
    let mut scan = Scan::new(enricher(&transport), WarnPolicy::default(), reporter.clone(), 10);

    scan.dispatch(Path::new("a/package.json"), vec![npm("foo"), npm("ghost")]);
    wait_for_memo(&scan, 2).await;
    scan.dispatch(Path::new("b/package.json"), vec![npm("foo"), npm("ghost")]);
    let summary = scan.finish().await;

    assert_eq!(summary.enriched, 2);
    assert_eq!(summary.cache_hits, 2);
    assert_eq!(transport.calls(&format!("{BASE}/npm/foo/latest")), 1);
    // Failures are memoized too: no second attempt within a scan
    assert_eq!(transport.calls(&format!("{BASE}/npm/ghost/latest")), 1);
    assert_eq!(summary.errors, 2);
    assert_eq!(summary.passes, 2);
}

#[tokio::test]
async fn test_same_name_in_other_ecosystem_is_not_a_memo_hit() {
    let transport = Arc::new(healthy_package(ScriptedTransport::new(), "foo"));
    let reporter = Arc::new(MemoryReporter::new());
    let mut scan = Scan::new(enricher(&transport), WarnPolicy::default(), reporter.clone(), 10);

    scan.dispatch(Path::new("package.json"), vec![npm("foo")]);
    wait_for_memo(&scan, 1).await;
    scan.dispatch(Path::new("requirements.txt"), vec![Module::new(Ecosystem::PyPI, "foo").into()]);
    let summary = scan.finish().await;

    assert_eq!(summary.cache_hits, 0);
    assert_eq!(summary.enriched, 2);
    assert_eq!(transport.calls(&format!("{BASE}/pypi/foo/json")), 1);
}

#[tokio::test]
async fn test_failed_step_keeps_earlier_fields() {
    let transport = Arc::new(ScriptedTransport::new().json(
        format!("{BASE}/npm/foo/latest"),
        &json!({"repository": "github:acme/foo"}),
    ));
    let finding = enricher(&transport).enrich(npm("foo")).await;

    let Dependency::Module(module) = &finding.dependency else {
        panic!("expected a module");
    };
    assert_eq!(module.repository, Some(RepoCoordinates::new("acme", "foo")));
    assert!(module.last_push.is_none());
    assert_eq!(
        finding.error,
        Some(LookupError::UnexpectedStatus {
            url: format!("{BASE}/github/repos/acme/foo"),
            status: 404,
        })
    );
}

#[tokio::test]
async fn test_local_failures_skip_the_network() {
    let transport = Arc::new(ScriptedTransport::new());
    let enricher = enricher(&transport);

    let finding = enricher.enrich(Language::new("ruby", "latest").into()).await;
    assert!(matches!(finding.error, Some(LookupError::InvalidVersion { .. })));

    let finding = enricher.enrich(Image::new("quay.io/org/app:1.0").into()).await;
    let Dependency::Image(image) = &finding.dependency else {
        panic!("expected an image");
    };
    assert_eq!(image.reference.as_ref().unwrap().registry, "quay.io");
    assert!(matches!(finding.error, Some(LookupError::UnsupportedRegistry { .. })));

    assert_eq!(transport.total_calls(), 0);
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn settings(root: &Path, server: &MockServer, cache_path: &Path) -> ScanSettings {
    ScanSettings {
        root: root.to_path_buf(),
        policy: WarnPolicy::default(),
        github_token: Some("t0ken".to_string()),
        max_parallel: 4,
        excludes: vec!["third_party/**".to_string()],
        cache_path: Some(cache_path.to_path_buf()),
        show_pass: false,
        endpoints: Endpoints::all_at(&server.uri()),
    }
}

async fn mount_registries(server: &MockServer) {
    let cached = |body: serde_json::Value| {
        ResponseTemplate::new(200)
            .insert_header("ETag", "\"1\"")
            .insert_header("Cache-Control", "max-age=3600")
            .set_body_json(body)
    };

    Mock::given(method("GET"))
        .and(path("/github/repos/acme/old"))
        .and(header("authorization", "Bearer t0ken"))
        .respond_with(cached(json!({"archived": true, "pushed_at": "2020-01-01T00:00:00Z"})))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/eol/go/1.20.json"))
        .respond_with(cached(json!({"cycle": "1.20", "eol": "2024-02-06"})))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dockerhub/namespaces/library/repositories/node/tags/18"))
        .respond_with(cached(json!({"name": "18", "last_updated": Utc::now().to_rfc3339()})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_scan_tree_end_to_end_and_reuse_cache() {
    init_test_logging(None);
    let server = MockServer::start().await;
    mount_registries(&server).await;

    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    write(&root, "go.mod", "module example.com/app\n\ngo 1.20\n\nrequire github.com/acme/old v1.0.0\n");
    write(&root, "Dockerfile", "FROM node:18 AS build\nFROM build\n");
    write(&root, "web/package.json", "{");
    write(&root, "third_party/lib/go.mod", "module x\n\nrequire github.com/acme/vendored v0.1.0\n");
    let cache_file = temp.path().join("cache").join("http-cache.bin");
    let settings = settings(&root, &server, &cache_file);

    let reporter = Arc::new(MemoryReporter::new());
    let summary =
        run_scan_with(&settings, ReqwestTransport::new().unwrap(), reporter.clone()).await.unwrap();

    let expected = vec![
        "├ INFO: pass node:18 (Dockerfile)",
        "├ WARN: github.com/acme/old is archived (go.mod)",
        "├ WARN: go1.20 is EOL (2024-02-06) (go.mod)",
    ];
    assert_eq!(reporter.sorted_lines(), expected);
    assert_eq!(summary.manifests, 2);
    assert_eq!(summary.manifest_errors, 1);
    assert_eq!(summary.warnings, 2);
    assert_eq!(summary.passes, 1);

    let failures = reporter.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path, Path::new("web/package.json"));
    assert!(cache_file.exists());

    // Second run is answered from the persisted cache; each mock expects one call
    let reporter = Arc::new(MemoryReporter::new());
    run_scan_with(&settings, ReqwestTransport::new().unwrap(), reporter.clone()).await.unwrap();
    assert_eq!(reporter.sorted_lines(), expected);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}
