//! Resume and fresh-start behavior across runs

use crate::crawl_tests::{create_test_config, exported_json, page};
use minima::crawler::Coordinator;
use minima::storage::{open_frontier, WorkItem};
use minima::RunStatus;
use std::fs;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_resume_ignores_seeds_and_keeps_priority() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/seed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("en", "Seed", "")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/low"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("en", "Low", "")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/high"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("en", "High", "")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), vec![format!("{}/seed", base)]);

    // state left behind by an interrupted run
    {
        let mut frontier = open_frontier(&config.frontier);
        frontier.add(WorkItem::new(format!("{}/low", base), 1, 1.0));
        frontier.add(WorkItem::new(format!("{}/high", base), 1, 9.0));
    }

    let export_dir = config.output.export_dir.clone();
    let mut coordinator = Coordinator::new(config, false).unwrap();
    assert_eq!(coordinator.seed(), 0);
    assert_eq!(coordinator.frontier().pending_len(), 2);

    let status = coordinator.run(CancellationToken::new()).await.unwrap();
    assert_eq!(status, RunStatus::Completed);

    // processed in score order; origin scoring carries the frontier score
    let records = exported_json(&export_dir);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["url"], format!("{}/high", base));
    assert_eq!(records[0]["score"], 9.0);
    assert_eq!(records[1]["url"], format!("{}/low", base));
    assert_eq!(records[1]["score"], 1.0);
}

#[tokio::test]
async fn test_fresh_start_clears_previous_state() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/seed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("en", "Seed", "")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let seed = format!("{}/seed", base);
    let config = create_test_config(dir.path(), vec![seed.clone()]);

    {
        let mut frontier = open_frontier(&config.frontier);
        frontier.add(WorkItem::seed(seed.as_str()));
        frontier.mark_processed(&seed);
    }

    // without --fresh the seed is already processed and nothing happens
    {
        let mut coordinator = Coordinator::new(config.clone(), false).unwrap();
        assert_eq!(coordinator.seed(), 0);
        assert!(coordinator.frontier().is_processed(&seed));
    }

    let mut coordinator = Coordinator::new(config, true).unwrap();
    assert_eq!(coordinator.seed(), 1);
    coordinator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(coordinator.statistics().exported, 1);
}

#[tokio::test]
async fn test_legacy_frontier_file_is_resumed() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/legacy"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("en", "Legacy", "")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), Vec::new());

    fs::create_dir_all(config.frontier.path.parent().unwrap()).unwrap();
    fs::write(
        &config.frontier.path,
        format!(r#"{{"queue": ["{}/legacy"], "processed": []}}"#, base),
    )
    .unwrap();

    let mut coordinator = Coordinator::new(config.clone(), false).unwrap();
    assert_eq!(coordinator.frontier().pending_len(), 1);
    coordinator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(coordinator.statistics().exported, 1);
    drop(coordinator);

    let saved = fs::read_to_string(&config.frontier.path).unwrap();
    assert!(!saved.contains("\"queue\""));
    assert!(saved.contains(&format!("{}/legacy", base)));
}
