//! Integration tests for the snapshot pipeline
//!
//! These tests use wiremock to stand in for the catalogued sites and run
//! the full fetch, analyze, capture and merge cycle end-to-end.

use chrono::{Duration, Utc};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use sumi_folio::config::{
    AnalyzerConfig, BackendKind, Config, FetchConfig, InputConfig, PipelineConfig, RenderConfig,
    ScheduleConfig, StorageConfig, ThumbnailConfig, UserAgentConfig,
};
use sumi_folio::pipeline::{run_pipeline, Coordinator};
use sumi_folio::storage::{open_store, Snapshot};
use sumi_folio::thumbnail::CaptureStrategy;
use sumi_folio::url::domain_hash;
use sumi_folio::DomainTask;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOME_PAGE: &str = r#"<html><head><title>Seed Library</title></head><body>
    <h1>The Seed Library Blog</h1>
    <p>Every post on this blog is about garden seeds. Read the latest article,
    leave a comment for the author and swap seeds with other readers. Our
    garden community shares heirloom seeds, planting notes and harvest stories
    from every season of the year.</p>
    </body></html>"#;

/// Creates a test configuration with every file under `dir`
fn create_test_config(dir: &Path, backend: BackendKind) -> Config {
    let catalog = match backend {
        BackendKind::Json => dir.join("portfolio/data.json"),
        BackendKind::Sqlite => dir.join("portfolio/data.db"),
    };

    Config {
        pipeline: PipelineConfig {
            workers: 2,
            capture_concurrency: 1,
            staleness_days: 7,
            run_timeout_secs: 0,
            shutdown_grace_secs: 1,
            politeness_delay_ms: 0,
        },
        fetch: FetchConfig {
            timeout_secs: 1,
            connect_timeout_secs: 1,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        input: InputConfig {
            domains_path: dir.join("portfolio.txt"),
            strict: false,
        },
        storage: StorageConfig {
            backend,
            path: catalog,
        },
        thumbnail: ThumbnailConfig {
            dir: dir.join("portfolio/thumbnails"),
            image_timeout_secs: 2,
            ..ThumbnailConfig::default()
        },
        render: RenderConfig::default(),
        analyzer: AnalyzerConfig::default(),
        schedule: ScheduleConfig::default(),
    }
}

fn write_domain_list(config: &Config, lines: &[String]) {
    std::fs::write(&config.input.domains_path, lines.join("\n")).unwrap();
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([40, 120, 200]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn prior_snapshot(domain: &str, url: &str, days_ago: i64) -> Snapshot {
    Snapshot {
        domain: domain.to_string(),
        domain_hash: domain_hash(domain),
        url: url.to_string(),
        theme: "Blog".to_string(),
        keywords: vec!["garden".to_string()],
        technologies: Default::default(),
        hashtags: Vec::new(),
        thumbnail_path: None,
        thumbnail_strategy: None,
        description: String::new(),
        last_updated: Utc::now() - Duration::days(days_ago),
    }
}

/// Stores `snapshots` as the catalog of a previous run
fn seed_catalog(config: &Config, snapshots: Vec<Snapshot>) {
    let mut store = open_store(&config.storage).unwrap();
    for snapshot in snapshots {
        store.merge(snapshot);
    }
    store.persist().unwrap();
}

async fn mount_home(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_domain_into_empty_catalog() {
    let dir = tempdir().unwrap();
    let server = MockServer::start().await;
    mount_home(&server, HOME_PAGE).await;

    let config = create_test_config(dir.path(), BackendKind::Json);
    write_domain_list(&config, &[format!("example.com {}", server.uri())]);

    let summary = run_pipeline(config.clone(), false, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.new, 1);
    assert_eq!(summary.failed, 0);

    let store = open_store(&config.storage).unwrap();
    assert_eq!(store.len(), 1);

    let entry = store.get("example.com").unwrap();
    assert_eq!(entry.last_updated.date_naive(), Utc::now().date_naive());
    assert_eq!(entry.theme, "Blog");
    assert!(entry.keywords.contains(&"seeds".to_string()));
    assert!(entry.description.starts_with("This blog website focuses on"));

    let thumbnail = entry.thumbnail_path.as_deref().expect("thumbnail path");
    assert!(Path::new(thumbnail).exists());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let dir = tempdir().unwrap();
    let server = MockServer::start().await;
    mount_home(&server, HOME_PAGE).await;

    let config = create_test_config(dir.path(), BackendKind::Json);
    write_domain_list(
        &config,
        &[
            format!("a.test {}", server.uri()),
            format!("b.test {}", server.uri()),
            format!("c.test {}", server.uri()),
        ],
    );

    let first = run_pipeline(config.clone(), false, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.processed, 3);
    assert_eq!(first.new, 3);

    let before = std::fs::read(&config.storage.path).unwrap();

    let second = run_pipeline(config.clone(), false, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, 3);

    let after = std::fs::read(&config.storage.path).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_fresh_entry_is_skipped_without_fetching() {
    let dir = tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HOME_PAGE))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(dir.path(), BackendKind::Json);
    seed_catalog(&config, vec![prior_snapshot("a.com", &server.uri(), 1)]);
    write_domain_list(&config, &[format!("a.com {}", server.uri())]);

    let before = open_store(&config.storage).unwrap().get("a.com").cloned();

    let summary = run_pipeline(config.clone(), false, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.processed, 0);

    let after = open_store(&config.storage).unwrap().get("a.com").cloned();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_stale_entry_is_refreshed() {
    let dir = tempdir().unwrap();
    let server = MockServer::start().await;
    mount_home(&server, HOME_PAGE).await;

    let config = create_test_config(dir.path(), BackendKind::Json);
    seed_catalog(&config, vec![prior_snapshot("a.com", &server.uri(), 8)]);
    write_domain_list(&config, &[format!("a.com {}", server.uri())]);

    let summary = run_pipeline(config.clone(), false, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.new, 0);

    let store = open_store(&config.storage).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("a.com").unwrap().age_days(Utc::now()), 0);
}

#[tokio::test]
async fn test_fetch_timeout_keeps_prior_snapshot() {
    let dir = tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(HOME_PAGE)
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = create_test_config(dir.path(), BackendKind::Json);
    seed_catalog(&config, vec![prior_snapshot("b.com", &server.uri(), 30)]);
    write_domain_list(
        &config,
        &[
            format!("b.com {}", server.uri()),
            format!("new.com {}", server.uri()),
        ],
    );

    let before = open_store(&config.storage).unwrap().get("b.com").cloned();

    let summary = run_pipeline(config.clone(), false, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.new + summary.updated, 0);

    let store = open_store(&config.storage).unwrap();
    assert_eq!(store.get("b.com").cloned(), before);
    assert!(store.get("new.com").is_none());
}

#[tokio::test]
async fn test_og_image_becomes_thumbnail() {
    let dir = tempdir().unwrap();
    let server = MockServer::start().await;
    let page = format!(
        r#"<html><head><meta property="og:image" content="{}/social.png"></head>
        <body><p>Welcome</p></body></html>"#,
        server.uri()
    );
    mount_home(&server, &page).await;
    Mock::given(method("GET"))
        .and(path("/social.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(png(600, 400))
                .insert_header("content-type", "image/png"),
        )
        .mount(&server)
        .await;

    let config = create_test_config(dir.path(), BackendKind::Json);
    write_domain_list(&config, &[format!("social.test {}", server.uri())]);

    run_pipeline(config.clone(), false, CancellationToken::new())
        .await
        .unwrap();

    let store = open_store(&config.storage).unwrap();
    let entry = store.get("social.test").unwrap();
    assert_eq!(entry.thumbnail_strategy, Some(CaptureStrategy::OpenGraph));

    let thumbnail = entry.thumbnail_path.as_deref().unwrap();
    let (width, height) = image::image_dimensions(thumbnail).unwrap();
    assert_eq!((width, height), (300, 200));
}

#[tokio::test]
async fn test_broken_images_fall_back_to_placeholder() {
    let dir = tempdir().unwrap();
    let server = MockServer::start().await;
    let page = format!(
        r#"<html><head><meta property="og:image" content="{0}/missing.png"></head>
        <body><img src="{0}/also-missing.jpg" width="800" height="600"></body></html>"#,
        server.uri()
    );
    mount_home(&server, &page).await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/also-missing.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not an image"))
        .mount(&server)
        .await;

    let config = create_test_config(dir.path(), BackendKind::Json);
    write_domain_list(&config, &[format!("plain.test {}", server.uri())]);

    let summary = run_pipeline(config.clone(), false, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.new, 1);

    let store = open_store(&config.storage).unwrap();
    let entry = store.get("plain.test").unwrap();
    assert_eq!(entry.thumbnail_strategy, Some(CaptureStrategy::Placeholder));
    let thumbnail = entry.thumbnail_path.as_deref().unwrap();
    assert_eq!(image::image_dimensions(thumbnail).unwrap(), (300, 200));
}

#[tokio::test]
async fn test_sqlite_backend_run() {
    let dir = tempdir().unwrap();
    let server = MockServer::start().await;
    mount_home(&server, HOME_PAGE).await;

    let config = create_test_config(dir.path(), BackendKind::Sqlite);
    write_domain_list(
        &config,
        &[
            format!("one.test {}", server.uri()),
            format!("two.test {}", server.uri()),
        ],
    );

    let summary = run_pipeline(config.clone(), false, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.new, 2);

    let store = open_store(&config.storage).unwrap();
    assert_eq!(store.len(), 2);
    assert!(store.location().starts_with("sqlite:"));

    let second = run_pipeline(config.clone(), false, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(second.skipped, 2);
}

#[tokio::test]
async fn test_fresh_flag_clears_catalog() {
    let dir = tempdir().unwrap();
    let server = MockServer::start().await;
    mount_home(&server, HOME_PAGE).await;

    let config = create_test_config(dir.path(), BackendKind::Json);
    seed_catalog(
        &config,
        vec![
            prior_snapshot("kept.test", &server.uri(), 1),
            prior_snapshot("gone.test", &server.uri(), 1),
        ],
    );
    write_domain_list(&config, &[format!("kept.test {}", server.uri())]);

    let summary = run_pipeline(config.clone(), true, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.new, 1);

    let store = open_store(&config.storage).unwrap();
    assert_eq!(store.len(), 1);
    assert!(store.get("gone.test").is_none());
}

#[tokio::test]
async fn test_run_timeout_stops_dispatch() {
    let dir = tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(HOME_PAGE)
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = create_test_config(dir.path(), BackendKind::Json);
    config.pipeline.workers = 1;
    config.pipeline.run_timeout_secs = 1;
    config.fetch.timeout_secs = 30;

    let store = open_store(&config.storage).unwrap();
    let mut coordinator = Coordinator::new(config.clone(), store).await.unwrap();
    let tasks = vec![
        DomainTask::new("a.test", server.uri()),
        DomainTask::new("b.test", server.uri()),
        DomainTask::new("c.test", server.uri()),
    ];

    let started = std::time::Instant::now();
    let summary = coordinator.run(tasks, CancellationToken::new()).await.unwrap();

    assert!(started.elapsed() < std::time::Duration::from_secs(4));
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.cancelled, 3);
    assert!(coordinator.store().is_empty());
    assert!(config.storage.path.exists());
}

#[tokio::test]
async fn test_missing_domain_list_is_setup_error() {
    let dir = tempdir().unwrap();
    let config = create_test_config(dir.path(), BackendKind::Json);

    let result = run_pipeline(config, false, CancellationToken::new()).await;
    assert!(matches!(result, Err(sumi_folio::FolioError::Setup(_))));
}
