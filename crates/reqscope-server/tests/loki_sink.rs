#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reqscope_server::config::LokiSection;
use reqscope_server::obs::{LogSink, LokiSink};

fn section(url: &str, batch_size: usize) -> LokiSection {
    let mut cfg = LokiSection::new(url);
    cfg.service = "reqscope-test".into();
    cfg.batch_size = batch_size;
    cfg.flush_interval_ms = 60_000;
    cfg
}

async fn mock_push(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/loki/api/v1/push"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn flush_pushes_buffered_records_grouped_by_level() {
    let server = MockServer::start().await;
    mock_push(&server, 204).await;

    let sink = LokiSink::spawn(&section(&server.uri(), 100)).unwrap();
    sink.info("/");
    sink.info("/slow");
    sink.error("Something went wrong!");
    sink.flush().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let streams = body["streams"].as_array().unwrap();
    assert_eq!(streams.len(), 2);

    assert_eq!(streams[0]["stream"]["service"], "reqscope-test");
    assert_eq!(streams[0]["stream"]["level"], "info");
    let info_lines: Vec<&str> = streams[0]["values"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v[1].as_str().unwrap())
        .collect();
    assert_eq!(info_lines, vec![r#"{"message":"/"}"#, r#"{"message":"/slow"}"#]);

    assert_eq!(streams[1]["stream"]["level"], "error");
    assert_eq!(streams[1]["values"][0][1], "Something went wrong!");
    let ts = streams[1]["values"][0][0].as_str().unwrap();
    assert!(ts.parse::<u128>().unwrap() > 0);
}

#[tokio::test]
async fn flush_with_nothing_buffered_sends_nothing() {
    let server = MockServer::start().await;
    mock_push(&server, 204).await;

    let sink = LokiSink::spawn(&section(&server.uri(), 100)).unwrap();
    sink.flush().await.unwrap();
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn full_batch_is_pushed_without_flush() {
    let server = MockServer::start().await;
    mock_push(&server, 204).await;

    let sink = LokiSink::spawn(&section(&server.uri(), 2)).unwrap();
    sink.info("/");
    sink.info("/metrics");

    let mut pushed = 0;
    for _ in 0..100 {
        pushed = server.received_requests().await.unwrap().len();
        if pushed > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(pushed, 1);
}

#[tokio::test]
async fn rejected_push_is_reported_by_flush() {
    let server = MockServer::start().await;
    mock_push(&server, 500).await;

    let sink = LokiSink::spawn(&section(&server.uri(), 100)).unwrap();
    sink.error("boom");
    let err = sink.flush().await.unwrap_err();
    assert_eq!(err.client_code().as_str(), "LOG_SHIPPING");

    // the failed batch is dropped, not retried
    sink.flush().await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
