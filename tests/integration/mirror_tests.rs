//! Integration tests for the mirror
//!
//! These tests use wiremock to stand in for the query API, the rendering
//! service and the web site, and run complete mirrors into a temporary
//! directory.

use std::path::Path;
use tempfile::TempDir;
use wikimirror::config::{Config, MirrorConfig, RemoteConfig, TransformConfig, UserAgentConfig};
use wikimirror::mirror::FetchError;
use wikimirror::paths::INDEX_PATH;
use wikimirror::transform::TransformError;
use wikimirror::{path_for, ConfigError, Mirror, MirrorError, ResourceKind};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing every endpoint at the mock server
fn create_test_config(base_url: &str, output_dir: &Path) -> Config {
    Config {
        mirror: MirrorConfig {
            output_dir: output_dir.display().to_string(),
            main_page: None,
            namespaces: vec![],
            articles: None,
            max_concurrent_requests: 4,
            max_concurrent_articles: 1,
            max_retries: 1,
            retry_delay_ms: 10, // Very short for testing
            media: true,
            direction: None,
        },
        remote: RemoteConfig {
            api_url: format!("{}/w/api.php", base_url),
            rendering_url: format!("{}/api/rest_v1/page/html/", base_url),
            web_url: format!("{}/wiki/", base_url),
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        transform: TransformConfig::default(),
    }
}

fn kiwix_article(base_url: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html><head><title>Kiwix</title></head>
<body data-parsoid='{{}}'>
<section data-mw-section-id="0">
<div class="hatnote">For the fruit, see kiwi.</div>
<p about="#mwt1"><b>Kiwix</b> reads <a rel="mw:WikiLink" href="./Openzim" title="Openzim">ZIM files</a>
made for <a rel="mw:WikiLink" href="./Missing_Page" title="Missing Page">missing things</a>.</p>
<figure typeof="mw:File/Thumb"><a href="./File:Logo.png"><img src="{}/upload/thumb/200px-Logo.png" width="200" height="100"/></a><figcaption>The logo</figcaption></figure>
</section>
</body></html>"##,
        base_url
    )
}

const OPENZIM: &str = r#"<html><head><title>Openzim</title></head>
<body><p>See <a rel="mw:WikiLink" href="./Kiwix_Offline#Usage">the reader</a>.</p></body></html>"#;

const WEB_MAIN_PAGE: &str = r#"<html><head>
<link rel="stylesheet" href="/w/load.php?modules=site.styles">
<script>var wgTitle = "Kiwix";</script>
</head><body><p>Kiwix</p></body></html>"#;

async fn mount_json(server: &MockServer, key: &str, value: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param(key, value))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page_path: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Mounts a small wiki: two articles, one redirect, one image
async fn mount_wiki(server: &MockServer, kiwix_status: u16, kiwix_body: &str) {
    mount_json(
        server,
        "meta",
        "siteinfo",
        serde_json::json!({
            "batchcomplete": true,
            "query": {
                "general": {"mainpage": "Kiwix", "sitename": "Test Wiki", "rtl": false},
                "namespaces": {"0": {"id": 0, "name": ""}}
            }
        }),
    )
    .await;
    mount_json(
        server,
        "list",
        "allpages",
        serde_json::json!({
            "batchcomplete": true,
            "query": {"allpages": [{"title": "Kiwix", "ns": 0}, {"title": "Openzim", "ns": 0}]}
        }),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("list", "backlinks"))
        .and(query_param("bltitle", "Kiwix"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "query": {"backlinks": [{"title": "Kiwix Offline", "ns": 0}]}
        })))
        .mount(server)
        .await;
    mount_json(
        server,
        "list",
        "backlinks",
        serde_json::json!({"query": {"backlinks": []}}),
    )
    .await;

    mount_page(server, "/api/rest_v1/page/html/Kiwix", kiwix_status, kiwix_body).await;
    mount_page(server, "/api/rest_v1/page/html/Openzim", 200, OPENZIM).await;
    mount_page(server, "/wiki/Kiwix", 200, WEB_MAIN_PAGE).await;

    Mock::given(method("GET"))
        .and(path("/w/load.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("body { color: black; }"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/favicon.ico"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 1, 2, 3]))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/upload/thumb/200px-Logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PNG-200".to_vec()))
        .mount(server)
        .await;
}

fn article_file(root: &Path, id: &str) -> std::path::PathBuf {
    path_for(ResourceKind::Article, id)
        .expect("valid article name")
        .absolute(root)
}

#[tokio::test]
async fn test_full_mirror() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    mount_wiki(&server, 200, &kiwix_article(&base_url)).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let mirror = Mirror::new(create_test_config(&base_url, dir.path())).expect("mirror");
    let stats = mirror.run().await.expect("Mirror run failed");

    assert_eq!(stats.articles_total, 2);
    assert_eq!(stats.articles_persisted, 2);
    assert_eq!(stats.articles_skipped, 0);
    assert_eq!(stats.redirects_total, 1);
    assert_eq!(stats.redirects_written, 1);
    assert_eq!(stats.media_downloaded, 1);
    assert!(stats.files_written >= 8);

    // Article rewritten: catalog link localized, missing link unwrapped
    let kiwix_path = dir.path().join("html/K/i/w/i/Kiwix.html");
    let kiwix = std::fs::read_to_string(&kiwix_path).expect("Kiwix.html written");
    let openzim_url = path_for(ResourceKind::Article, "Openzim")
        .unwrap()
        .relative_url();
    assert!(kiwix.contains(&format!(r#"href="{}""#, openzim_url)));
    assert!(!kiwix.contains("./Missing_Page"));
    assert!(kiwix.contains("missing things"));
    assert!(!kiwix.contains("For the fruit"));
    assert!(kiwix.contains(r#"src="../../../../../media/L/o/g/o/Logo.png""#));
    assert!(kiwix.contains("Test Wiki"));

    // Links to an alias go straight to its target
    let openzim = std::fs::read_to_string(article_file(dir.path(), "Openzim")).unwrap();
    assert!(openzim.contains("html/K/i/w/i/Kiwix.html#Usage"));

    // Media, redirect stub, shared assets and entry point
    let logo = std::fs::read(dir.path().join("media/L/o/g/o/Logo.png")).expect("logo");
    assert_eq!(logo, b"PNG-200");

    let stub = std::fs::read_to_string(article_file(dir.path(), "Kiwix_Offline")).unwrap();
    assert!(stub.contains("Kiwix.html"));
    assert!(stub.contains("http-equiv=\"refresh\""));

    let css = std::fs::read_to_string(dir.path().join("style/style.css")).unwrap();
    assert!(css.contains("color: black"));
    let head_js = std::fs::read_to_string(dir.path().join("js/head.js")).unwrap();
    assert!(head_js.contains("wgTitle"));
    assert!(dir.path().join("media/favicon.png").exists());

    let index = std::fs::read_to_string(dir.path().join(INDEX_PATH)).unwrap();
    assert!(index.contains("K/i/w/i/Kiwix.html"));
}

#[tokio::test]
async fn test_second_run_writes_nothing() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    mount_wiki(&server, 200, &kiwix_article(&base_url)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());

    let first = Mirror::new(config.clone()).unwrap().run().await.unwrap();
    assert_eq!(first.articles_persisted, 2);

    let second = Mirror::new(config).unwrap().run().await.unwrap();
    assert_eq!(second.articles_persisted, 0);
    assert_eq!(second.articles_skipped, 2);
    assert_eq!(second.redirects_written, 0);
    assert_eq!(second.redirects_skipped, 1);
    assert_eq!(second.media_downloaded, 0);
    assert_eq!(second.files_written, 0);
}

#[tokio::test]
async fn test_existing_article_is_not_fetched() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    // Mounted first so it wins over the regular rendering mock
    Mock::given(method("GET"))
        .and(path("/api/rest_v1/page/html/Kiwix"))
        .respond_with(ResponseTemplate::new(200).set_body_string(kiwix_article(&base_url)))
        .expect(0)
        .mount(&server)
        .await;
    mount_wiki(&server, 200, &kiwix_article(&base_url)).await;

    let dir = TempDir::new().unwrap();
    let existing = dir.path().join("html/K/i/w/i/Kiwix.html");
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, "<html>kept</html>").unwrap();

    let stats = Mirror::new(create_test_config(&base_url, dir.path()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(stats.articles_skipped, 1);
    assert_eq!(stats.articles_persisted, 1);
    assert_eq!(std::fs::read_to_string(&existing).unwrap(), "<html>kept</html>");
}

#[tokio::test]
async fn test_explicit_articles_skip_enumeration() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("list", "allpages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"query": {}})))
        .expect(0)
        .mount(&server)
        .await;
    mount_wiki(&server, 200, &kiwix_article(&base_url)).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, dir.path());
    config.mirror.articles = Some(vec!["Openzim".to_string()]);

    let stats = Mirror::new(config).unwrap().run().await.unwrap();

    assert_eq!(stats.articles_total, 1);
    assert_eq!(stats.redirects_total, 0);
    assert!(article_file(dir.path(), "Openzim").exists());
    assert!(!dir.path().join("html/K/i/w/i/Kiwix.html").exists());
    // The main page is outside the mirror; the entry point is still written
    assert!(dir.path().join(INDEX_PATH).exists());
}

#[tokio::test]
async fn test_mirror_without_media() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/upload/thumb/200px-Logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PNG-200".to_vec()))
        .expect(0)
        .mount(&server)
        .await;
    mount_wiki(&server, 200, &kiwix_article(&base_url)).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, dir.path());
    config.mirror.media = false;

    let stats = Mirror::new(config).unwrap().run().await.unwrap();

    assert_eq!(stats.media_downloaded, 0);
    let kiwix = std::fs::read_to_string(dir.path().join("html/K/i/w/i/Kiwix.html")).unwrap();
    assert!(!kiwix.contains("<img"));
    assert!(!dir.path().join("media/L/o/g/o/Logo.png").exists());
}

#[tokio::test]
async fn test_exhausted_retries_abort_the_run() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    mount_wiki(&server, 503, "Service Unavailable").await;

    let dir = TempDir::new().unwrap();
    let result = Mirror::new(create_test_config(&base_url, dir.path()))
        .unwrap()
        .run()
        .await;

    match result {
        Err(MirrorError::Fetch(FetchError::RetriesExhausted { url, attempts, .. })) => {
            assert!(url.ends_with("/Kiwix"));
            assert_eq!(attempts, 2);
        }
        other => panic!("expected exhausted retries, got {:?}", other),
    }
    assert!(!dir.path().join("html/K/i/w/i/Kiwix.html").exists());
    assert!(!dir.path().join(INDEX_PATH).exists());
}

#[tokio::test]
async fn test_link_without_target_aborts_the_run() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    mount_wiki(
        &server,
        200,
        r#"<html><body><p><a rel="mw:WikiLink">nowhere</a></p></body></html>"#,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let result = Mirror::new(create_test_config(&base_url, dir.path()))
        .unwrap()
        .run()
        .await;

    match result {
        Err(MirrorError::Transform { id, source }) => {
            assert_eq!(id, "Kiwix");
            assert!(matches!(source, TransformError::MissingHref { .. }));
        }
        other => panic!("expected a transform error, got {:?}", other),
    }
    assert!(!dir.path().join("html/K/i/w/i/Kiwix.html").exists());
}

#[tokio::test]
async fn test_unreachable_site_info_is_fatal() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    let dir = TempDir::new().unwrap();
    let result = Mirror::new(create_test_config(&base_url, dir.path()))
        .unwrap()
        .run()
        .await;

    assert!(matches!(result, Err(MirrorError::Catalog(_))));
    assert!(!dir.path().join(INDEX_PATH).exists());
}

#[tokio::test]
async fn test_failure_stops_admission_of_new_articles() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let titles = ["Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot"];

    mount_json(
        &server,
        "meta",
        "siteinfo",
        serde_json::json!({
            "query": {
                "general": {"mainpage": "Alpha", "sitename": "Test Wiki"},
                "namespaces": {"0": {"id": 0, "name": ""}}
            }
        }),
    )
    .await;
    let pages: Vec<serde_json::Value> = titles
        .iter()
        .map(|title| serde_json::json!({"title": title, "ns": 0}))
        .collect();
    mount_json(
        &server,
        "list",
        "allpages",
        serde_json::json!({"query": {"allpages": pages}}),
    )
    .await;
    mount_json(
        &server,
        "list",
        "backlinks",
        serde_json::json!({"query": {"backlinks": []}}),
    )
    .await;
    mount_page(&server, "/wiki/Alpha", 200, "<html><head></head><body></body></html>").await;

    // The first article in catalog order fails without retry
    Mock::given(method("GET"))
        .and(path("/api/rest_v1/page/html/Alpha"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    for title in &titles[1..] {
        Mock::given(method("GET"))
            .and(path(format!("/api/rest_v1/page/html/{}", title)))
            .respond_with(ResponseTemplate::new(200).set_body_string(OPENZIM))
            .expect(0)
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let result = Mirror::new(create_test_config(&base_url, dir.path()))
        .unwrap()
        .run()
        .await;

    assert!(matches!(
        result,
        Err(MirrorError::Fetch(FetchError::Status { status: 404, .. }))
    ));
    for title in &titles[1..] {
        assert!(!article_file(dir.path(), title).exists(), "{} was mirrored", title);
    }
    assert!(!dir.path().join(INDEX_PATH).exists());
}

#[tokio::test]
async fn test_invalid_web_url_reports_the_parse_error() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    mount_wiki(&server, 200, &kiwix_article(&base_url)).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, dir.path());
    config.remote.web_url = "not a url".to_string();

    let result = Mirror::new(config).unwrap().run().await;

    match result {
        Err(MirrorError::Config(ConfigError::InvalidUrl(message))) => {
            assert!(message.contains("not a url"), "{}", message);
            assert!(message.contains("relative URL without a base"), "{}", message);
        }
        other => panic!("expected an invalid URL error, got {:?}", other),
    }
}
