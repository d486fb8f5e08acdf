//! Integration tests for the download orchestrator.
//!
//! A wiremock server plays a small novel site; imports run through the real
//! HTTP transport, request gate and a file-backed SQLite library.

use std::sync::Arc;
use std::time::{Duration, Instant};

use novel_importer::network::{
    Dispatcher, HttpTransport, PolitenessDelay, RequestGate, RetryPolicy, TransportConfig,
};
use novel_importer::{
    Database, DownloadOrchestrator, ExtractionService, ImportError, ImportState, NoProgress,
    NovelStore, ParserRule, ProgressUpdate, SqliteNovelStore, check_existing_novel,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        mock_server
    }};
}

/// Helper to create a test database with migrations applied.
async fn setup_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("library.db"))
        .await
        .unwrap();
    (db, temp_dir)
}

fn site_rule() -> ParserRule {
    ParserRule::new("Mock site", "127.0.0.1", "#list li a", "#content")
}

fn landing_page(chapters: usize) -> String {
    let items: String = (1..=chapters)
        .map(|i| format!(r#"<li><a href="/book/{i}.html">Chapter {i}</a></li>"#))
        .collect();
    format!(
        r#"<html><head><title>The Long Road - Mock Site</title>
        <meta property="og:novel:author" content="Jane Quill"></head>
        <body><h1>The Long Road</h1><p class="intro">A walk that never ends.</p>
        <ul id="list">{items}</ul></body></html>"#
    )
}

fn chapter_page(i: usize) -> String {
    format!(
        r#"<html><body><div class="ads">Buy now</div>
        <div id="content"><p>Chapter {i} opens on the road.</p><p>The traveller keeps walking.</p></div>
        </body></html>"#
    )
}

/// Mounts the landing page and every chapter, each expected to be fetched `times` times.
async fn mount_site(server: &MockServer, chapters: usize, landing_times: u64) {
    Mock::given(method("GET"))
        .and(path("/book/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_page(chapters)))
        .expect(landing_times)
        .mount(server)
        .await;
    for i in 1..=chapters {
        Mock::given(method("GET"))
            .and(path(format!("/book/{i}.html")))
            .respond_with(ResponseTemplate::new(200).set_body_string(chapter_page(i)))
            .expect(1)
            .mount(server)
            .await;
    }
}

fn build_orchestrator(store: &Arc<SqliteNovelStore>) -> Arc<DownloadOrchestrator> {
    let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
    let dispatcher = Dispatcher::without_probe(Arc::new(RequestGate::new(5)));
    let service = ExtractionService::new(dispatcher, Arc::new(transport));
    let store: Arc<dyn NovelStore> = store.clone();
    Arc::new(
        DownloadOrchestrator::new(service, store)
            .with_retry_policy(RetryPolicy::immediate(2))
            .with_politeness(PolitenessDelay::disabled()),
    )
}

fn book_url(server: &MockServer) -> String {
    format!("{}/book/", server.uri())
}

#[tokio::test]
async fn test_import_persists_every_chapter_in_order() {
    let server = require_mock_server!();
    mount_site(&server, 3, 1).await;
    let (db, _dir) = setup_test_db().await;
    let store = Arc::new(SqliteNovelStore::new(db));
    let orchestrator = build_orchestrator(&store);

    let outcome = orchestrator
        .download_novel(&book_url(&server), &site_rule(), &NoProgress)
        .await
        .unwrap();

    assert_eq!(outcome.state, ImportState::Completed);
    assert_eq!(outcome.chapters_imported, 3);
    assert_eq!(outcome.total_chapters, 3);
    assert_eq!(
        store.chapter_titles(outcome.novel_id).await.unwrap(),
        vec!["Chapter 1", "Chapter 2", "Chapter 3"]
    );

    let novel = store.get_novel(outcome.novel_id).await.unwrap().unwrap();
    assert_eq!(novel.title, "The Long Road");
    assert_eq!(novel.author, "Jane Quill");
    assert_eq!(novel.total_chapters, 3);
    assert_eq!(novel.latest_chapter_title.as_deref(), Some("Chapter 3"));
    assert_eq!(novel.source_url.as_deref(), Some(book_url(&server).as_str()));

    let existing = check_existing_novel(store.as_ref(), &book_url(&server))
        .await
        .unwrap()
        .unwrap();
    assert!(existing.is_complete());
}

#[tokio::test]
async fn test_cancel_then_resume_fetches_each_chapter_once() {
    let server = require_mock_server!();
    // The landing page is fetched once: resume reuses the cached chapter list.
    mount_site(&server, 20, 1).await;
    let (db, _dir) = setup_test_db().await;
    let store = Arc::new(SqliteNovelStore::new(db));
    let orchestrator = build_orchestrator(&store);
    let url = book_url(&server);

    let handle = Arc::clone(&orchestrator);
    let cancel_at_ten = move |update: ProgressUpdate| {
        if update.current == 10 {
            handle.cancel_download();
        }
    };
    let first = orchestrator
        .download_novel(&url, &site_rule(), &cancel_at_ten)
        .await
        .unwrap();
    assert_eq!(first.state, ImportState::Cancelled);
    assert_eq!(
        store.get_chapter_count_for_novel(first.novel_id).await.unwrap(),
        10
    );

    let existing = check_existing_novel(store.as_ref(), &url)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(existing.novel_id, first.novel_id);
    assert_eq!((existing.downloaded, existing.total), (10, 20));
    assert!(!existing.is_complete());

    let resumed = orchestrator
        .resume_download(first.novel_id, &url, &site_rule(), &NoProgress)
        .await
        .unwrap();
    assert_eq!(resumed.state, ImportState::Completed);
    assert_eq!(resumed.chapters_imported, 10);
    assert_eq!(resumed.chapters_persisted, 20);

    let titles = store.chapter_titles(first.novel_id).await.unwrap();
    let expected: Vec<String> = (1..=20).map(|i| format!("Chapter {i}")).collect();
    assert_eq!(titles, expected);
    // Dropping the server verifies each mock's expected call count.
}

#[tokio::test]
async fn test_resume_with_new_orchestrator_rediscovers_chapters() {
    let server = require_mock_server!();
    mount_site(&server, 4, 2).await;
    let (db, _dir) = setup_test_db().await;
    let store = Arc::new(SqliteNovelStore::new(db));
    let url = book_url(&server);

    let first_run = build_orchestrator(&store);
    let handle = Arc::clone(&first_run);
    let cancel_at_two = move |update: ProgressUpdate| {
        if update.current == 2 {
            handle.cancel_download();
        }
    };
    let first = first_run
        .download_novel(&url, &site_rule(), &cancel_at_two)
        .await
        .unwrap();
    assert_eq!(first.state, ImportState::Cancelled);

    let second_run = build_orchestrator(&store);
    let resumed = second_run
        .resume_download(first.novel_id, &url, &site_rule(), &NoProgress)
        .await
        .unwrap();
    assert_eq!(resumed.state, ImportState::Completed);
    assert_eq!(resumed.chapters_imported, 2);
    assert_eq!(
        store.get_chapter_count_for_novel(first.novel_id).await.unwrap(),
        4
    );
}

#[tokio::test]
async fn test_server_error_is_retried_once() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/book/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_page(2)))
        .mount(&server)
        .await;
    // Mounted first, so it answers the first request for chapter 1 only.
    Mock::given(method("GET"))
        .and(path("/book/1.html"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    for i in 1..=2 {
        Mock::given(method("GET"))
            .and(path(format!("/book/{i}.html")))
            .respond_with(ResponseTemplate::new(200).set_body_string(chapter_page(i)))
            .expect(1)
            .mount(&server)
            .await;
    }
    let (db, _dir) = setup_test_db().await;
    let store = Arc::new(SqliteNovelStore::new(db));
    let orchestrator = build_orchestrator(&store);

    let outcome = orchestrator
        .download_novel(&book_url(&server), &site_rule(), &NoProgress)
        .await
        .unwrap();

    assert_eq!(outcome.state, ImportState::Completed);
    assert_eq!(outcome.chapters_persisted, 2);
}

#[tokio::test]
async fn test_not_found_aborts_and_keeps_earlier_chapters() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/book/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_page(4)))
        .mount(&server)
        .await;
    for i in 1..=2 {
        Mock::given(method("GET"))
            .and(path(format!("/book/{i}.html")))
            .respond_with(ResponseTemplate::new(200).set_body_string(chapter_page(i)))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/book/3.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/book/4.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(chapter_page(4)))
        .expect(0)
        .mount(&server)
        .await;
    let (db, _dir) = setup_test_db().await;
    let store = Arc::new(SqliteNovelStore::new(db));
    let orchestrator = build_orchestrator(&store);
    let url = book_url(&server);

    let error = orchestrator
        .download_novel(&url, &site_rule(), &NoProgress)
        .await
        .unwrap_err();

    match error {
        ImportError::Network(network) => assert_eq!(network.status_code, Some(404)),
        other => panic!("expected a network error, got {other:?}"),
    }
    assert_eq!(orchestrator.state(), ImportState::Failed);
    assert!(!orchestrator.is_downloading());

    let novel = store.find_novel_by_source_url(&url).await.unwrap().unwrap();
    assert_eq!(store.get_chapter_count_for_novel(novel.id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_landing_page_without_chapters_is_a_parse_error() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/book/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><h1>Nothing here</h1></body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (db, _dir) = setup_test_db().await;
    let store = Arc::new(SqliteNovelStore::new(db));
    let orchestrator = build_orchestrator(&store);
    let url = book_url(&server);

    let error = orchestrator
        .download_novel(&url, &site_rule(), &NoProgress)
        .await
        .unwrap_err();

    assert!(matches!(error, ImportError::Parse { .. }));
    assert!(store.find_novel_by_source_url(&url).await.unwrap().is_none());
}

#[tokio::test]
async fn test_rate_limited_chapter_waits_for_retry_after() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/book/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_page(1)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/book/1.html"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/book/1.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(chapter_page(1)))
        .expect(1)
        .mount(&server)
        .await;
    let (db, _dir) = setup_test_db().await;
    let store = Arc::new(SqliteNovelStore::new(db));
    let orchestrator = build_orchestrator(&store);

    let started = Instant::now();
    let outcome = orchestrator
        .download_novel(&book_url(&server), &site_rule(), &NoProgress)
        .await
        .unwrap();

    assert_eq!(outcome.state, ImportState::Completed);
    assert!(started.elapsed() >= Duration::from_millis(900));
}
