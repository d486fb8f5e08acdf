//! Integration tests for rule seeding, matching and dry runs.

use std::sync::Arc;

use novel_importer::network::{Dispatcher, HttpTransport, RequestGate, TransportConfig};
use novel_importer::rules::{SMART_GENERIC_RULE_NAME, SeedOutcome};
use novel_importer::{
    Database, ExtractionService, ParserRule, RuleStore, RuleTestReport, seed_default_rules,
    test_rule,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

async fn setup_rule_store() -> (RuleStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("rules.db"))
        .await
        .unwrap();
    (RuleStore::new(db), temp_dir)
}

fn service() -> ExtractionService {
    let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
    ExtractionService::new(
        Dispatcher::without_probe(Arc::new(RequestGate::default())),
        Arc::new(transport),
    )
}

#[tokio::test]
async fn test_seeded_store_prefers_site_family_rules() {
    let (store, _dir) = setup_rule_store().await;

    assert!(matches!(
        seed_default_rules(&store).await.unwrap(),
        SeedOutcome::Seeded(6)
    ));
    assert!(matches!(
        seed_default_rules(&store).await.unwrap(),
        SeedOutcome::AlreadyPresent
    ));

    let biquge = store.match_url("https://www.biquge.com/book/1/").await.unwrap();
    assert_eq!(biquge.name, "Biquge family");

    let unknown = store.match_url("https://unlisted.example/book/").await.unwrap();
    assert_eq!(unknown.name, SMART_GENERIC_RULE_NAME);
}

#[tokio::test]
async fn test_seed_restores_missing_smart_generic_rule() {
    let (store, _dir) = setup_rule_store().await;
    store
        .insert(&ParserRule::new("Only rule", "example.com", "#list a", "#content"))
        .await
        .unwrap();

    assert!(matches!(
        seed_default_rules(&store).await.unwrap(),
        SeedOutcome::AddedSmartGeneric
    ));
    assert_eq!(store.count().await.unwrap(), 2);
    assert_eq!(
        store.match_url("https://other.test/").await.unwrap().name,
        SMART_GENERIC_RULE_NAME
    );
}

#[tokio::test]
async fn test_domain_rule_beats_wildcard_regardless_of_order() {
    let (store, _dir) = setup_rule_store().await;
    store
        .insert(&ParserRule::new("any", "*", "a", "#content").with_created_at(1))
        .await
        .unwrap();
    store
        .insert(&ParserRule::new("biquge", "biquge.com", "#list a", "#content").with_created_at(2))
        .await
        .unwrap();

    let chosen = store.match_url("https://www.biquge.com/x").await.unwrap();
    assert_eq!(chosen.name, "biquge");
}

#[tokio::test]
async fn test_dry_run_reports_metadata_and_sample() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/book/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><h1>River Song</h1><div class="author">作者：Lin</div>
            <div id="list"><dl><dd><a href="/book/1.html">One</a></dd>
            <dd><a href="/book/2.html">Two</a></dd></dl></div></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/book/1.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<div id="content"><p>The river ran east.</p></div>"#),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/book/2.html"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let rule = ParserRule::new("site", "127.0.0.1", "#list dd a", "#content");
    let report = test_rule(&service(), &rule, &format!("{}/book/", server.uri())).await;

    assert_eq!(
        report,
        RuleTestReport::Success {
            title: Some("River Song".to_string()),
            author: Some("Lin".to_string()),
            chapter_count: 2,
            sample_content: "The river ran east.".to_string(),
        }
    );
}

#[tokio::test]
async fn test_dry_run_reports_fetch_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let rule = ParserRule::new("site", "127.0.0.1", "#list a", "#content");
    let report = test_rule(&service(), &rule, &format!("{}/book/", server.uri())).await;

    assert!(!report.is_success());
}
