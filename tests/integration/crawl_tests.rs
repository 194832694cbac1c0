//! End-to-end crawl tests

use minima::config::{Config, CrawlMode, CrawlerConfig, FetchConfig, FrontierConfig, OutputConfig};
use minima::crawler::Coordinator;
use minima::output::sqlite_output::read_table;
use minima::{AddressState, RunStatus};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing everything under `dir`
pub fn create_test_config(dir: &Path, seeds: Vec<String>) -> Config {
    Config {
        crawler: CrawlerConfig {
            mode: CrawlMode::Crawl,
            max_depth: 2,
            seeds,
            plugins: vec!["word_count".to_string()],
            ..CrawlerConfig::default()
        },
        fetch: FetchConfig {
            retries: 2,
            backoff_base_ms: 10,
            transport_backoff_ms: 10,
            ..FetchConfig::default()
        },
        frontier: FrontierConfig {
            path: dir.join("data").join("queue.json"),
            flush_every: 1,
        },
        output: OutputConfig {
            export_dir: dir.join("exports"),
            store_dir: dir.join("crawl_data"),
            prefix: "results".to_string(),
            flush_threshold: 50,
        },
    }
}

pub fn page(lang: &str, title: &str, body: &str) -> String {
    format!(
        r#"<html lang="{}"><head><title>{}</title></head><body>{}</body></html>"#,
        lang, title, body
    )
}

pub fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|x| x == ext).unwrap_or(false))
            .collect(),
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}

/// Every record across the JSON exports in `dir`
pub fn exported_json(dir: &Path) -> Vec<Value> {
    files_with_extension(dir, "json")
        .iter()
        .flat_map(|file| {
            let parsed: Value = serde_json::from_str(&fs::read_to_string(file).unwrap()).unwrap();
            parsed.as_array().cloned().unwrap_or_default()
        })
        .collect()
}

fn exported_urls(dir: &Path) -> Vec<String> {
    let mut urls: Vec<String> = exported_json(dir)
        .iter()
        .filter_map(|r| r["url"].as_str().map(String::from))
        .collect();
    urls.sort();
    urls
}

#[tokio::test]
async fn test_full_crawl_writes_every_format() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(
            "en",
            "Home",
            r#"<a href="/page1">One</a> <a href="/page2">Two</a>
               <a href="mailto:a@example.com">mail</a> <a href="/">self</a>"#,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(
            "en",
            "Page 1",
            r#"<p>three little words</p><a href="/page2">Two again</a>"#,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), vec![format!("{}/", base)]);
    let output = config.output.clone();

    let mut coordinator = Coordinator::new(config, false).unwrap();
    assert_eq!(coordinator.seed(), 1);
    let status = coordinator.run(CancellationToken::new()).await.unwrap();
    assert_eq!(status, RunStatus::Completed);

    let stats = coordinator.statistics().clone();
    assert_eq!(stats.rounds, 2);
    assert_eq!(stats.fetched, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.exported, 2);
    assert_eq!(stats.enqueued, 2);

    assert_eq!(
        exported_urls(&output.export_dir),
        vec![format!("{}/", base), format!("{}/page1", base)]
    );

    let records = exported_json(&output.export_dir);
    let page1 = records
        .iter()
        .find(|r| r["url"] == format!("{}/page1", base))
        .unwrap();
    assert_eq!(page1["title"], "Page 1");
    assert_eq!(page1["word_count"], 5);
    assert_eq!(page1["score"], 0.0);

    let csv_files = files_with_extension(&output.export_dir, "csv");
    assert_eq!(csv_files.len(), 1);
    let mut reader = csv::Reader::from_path(&csv_files[0]).unwrap();
    assert_eq!(reader.records().count(), 2);

    let db_files = files_with_extension(&output.store_dir, "db");
    assert_eq!(db_files.len(), 1);
    assert_eq!(read_table(&db_files[0], "results").unwrap().len(), 2);

    assert!(coordinator.frontier().is_empty());
    assert_eq!(coordinator.frontier().processed_len(), 3);
    assert_eq!(
        coordinator.ledger().state(&format!("{}/page2", base)),
        AddressState::Processed
    );
}

#[tokio::test]
async fn test_language_gate_previews_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(
            "fr",
            "Accueil",
            r#"<a href="/fr">fr</a> <a href="/de">de</a>"#,
        )))
        .mount(&server)
        .await;
    // one preview, then one full fetch
    Mock::given(method("GET"))
        .and(path("/fr"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("fr", "Bonjour", "")))
        .expect(2)
        .mount(&server)
        .await;
    // preview only
    Mock::given(method("GET"))
        .and(path("/de"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("de", "Hallo", "")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path(), vec![format!("{}/", base)]);
    config.crawler.accept_languages = vec!["fr".to_string()];
    let export_dir = config.output.export_dir.clone();

    let mut coordinator = Coordinator::new(config, false).unwrap();
    coordinator.seed();
    coordinator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(
        exported_urls(&export_dir),
        vec![format!("{}/", base), format!("{}/fr", base)]
    );
    assert_eq!(coordinator.statistics().rejected, 1);
    assert!(!coordinator.frontier().contains(&format!("{}/de", base)));
}

#[tokio::test]
async fn test_cancellation_flushes_buffered_records() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(
            "en",
            "Home",
            r#"<a href="/slow">slow</a>"#,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page("en", "Slow", ""))
                .set_delay(std::time::Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), vec![format!("{}/", base)]);
    let output = config.output.clone();
    let frontier_path = config.frontier.path.clone();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let mut coordinator = Coordinator::new(config, false).unwrap();
    coordinator.seed();
    let status = coordinator.run(cancel).await.unwrap();
    assert_eq!(status, RunStatus::Interrupted);

    // the home page record was only buffered (threshold 50) until the forced flush
    assert_eq!(exported_urls(&output.export_dir), vec![format!("{}/", base)]);
    let csv_files = files_with_extension(&output.export_dir, "csv");
    assert_eq!(csv_files.len(), 1);
    let db_files = files_with_extension(&output.store_dir, "db");
    assert_eq!(read_table(&db_files[0], "results").unwrap().len(), 1);

    let saved: Value = serde_json::from_str(&fs::read_to_string(frontier_path).unwrap()).unwrap();
    assert_eq!(saved["processed"], serde_json::json!([format!("{}/", base)]));
    assert_eq!(saved["pending"][0]["address"], format!("{}/slow", base));
    assert_eq!(saved["pending"][0]["depth"], 1);
}
