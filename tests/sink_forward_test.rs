use perf_stats_forwarder::domain::{FlatRecord, MetricDetail};
use perf_stats_forwarder::sender::{EventFormatter, SinkConfig, SinkError, SinkForwarder};
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing_test::traced_test;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

fn record() -> FlatRecord {
    FlatRecord {
        timestamp: json!(1_700_000_000_000_i64),
        account_id: json!("A1"),
        site_id: json!("S1"),
        site_name: json!("Site1"),
        detail: MetricDetail::ErrorResponseType {
            error_type: "403".to_string(),
            value: json!(5),
        },
    }
}

fn forwarder_for(server: &MockServer) -> SinkForwarder {
    SinkForwarder::new(SinkConfig {
        endpoint: format!("{}/services/collector/event", server.uri()),
        token: "secret-token".to_string(),
        timeout: Duration::from_secs(5),
        connection_timeout: Duration::from_secs(2),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn posts_envelope_with_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/collector/event"))
        .and(header("Authorization", "Splunk secret-token"))
        .and(body_json(json!({
            "event": {
                "timestamp": 1_700_000_000_000_i64,
                "accountId": "A1",
                "siteId": "S1",
                "siteName": "Site1",
                "metricName": "errorResponseTypes",
                "errorType": "403",
                "value": 5
            },
            "sourcetype": "json_http",
            "index": "main"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"text":"Success","code":0}"#))
        .expect(1)
        .mount(&server)
        .await;

    let forwarder = forwarder_for(&server);
    let formatter = EventFormatter::default();
    let record = record();
    let response = forwarder.send(&formatter.format(&record)).await.unwrap();

    assert_eq!(response.status, 200);
    assert!(response.body.contains("Success"));

    let stats = forwarder.stats();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.successful_requests, 1);
}

#[tokio::test]
async fn custom_scheme_and_envelope_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let forwarder = SinkForwarder::new(SinkConfig {
        endpoint: server.uri(),
        token: "abc".to_string(),
        auth_scheme: "Bearer".to_string(),
        ..Default::default()
    })
    .unwrap();
    let formatter = EventFormatter::new("perf", "metrics");
    let record = record();
    let envelope = formatter.format(&record);

    assert_eq!(envelope.sourcetype, "perf");
    assert_eq!(envelope.index, "metrics");
    forwarder.send(&envelope).await.unwrap();
}

#[tokio::test]
async fn server_error_is_reported_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("indexer down"))
        .expect(1)
        .mount(&server)
        .await;

    let forwarder = forwarder_for(&server);
    let formatter = EventFormatter::default();
    let record = record();
    let err = forwarder.send(&formatter.format(&record)).await.unwrap_err();

    match err {
        SinkError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "indexer down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(forwarder.stats().failed_requests, 1);
}

#[tokio::test]
async fn unreachable_collector_is_a_network_error() {
    let forwarder = SinkForwarder::new(SinkConfig {
        endpoint: "http://127.0.0.1:1/services/collector/event".to_string(),
        token: "t".to_string(),
        connection_timeout: Duration::from_millis(200),
        timeout: Duration::from_millis(500),
        ..Default::default()
    })
    .unwrap();
    let formatter = EventFormatter::default();
    let record = record();

    let err = forwarder.send(&formatter.format(&record)).await.unwrap_err();
    assert!(matches!(err, SinkError::Network(_)));
}

/// Answers one request with `status_line` and a body shorter than its
/// declared length, then hangs up.
async fn truncated_body_server(status_line: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            if n == 0 || request_complete(&request) {
                break;
            }
        }
        let response = format!("HTTP/1.1 {status_line}\r\nContent-Length: 64\r\n\r\npartial");
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });
    format!("http://{addr}/services/collector/event")
}

fn request_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    request.len() >= header_end + 4 + content_length
}

#[tokio::test]
#[traced_test]
async fn unreadable_response_body_is_logged_and_treated_as_empty() {
    let endpoint = truncated_body_server("500 Internal Server Error").await;
    let forwarder = SinkForwarder::new(SinkConfig {
        endpoint,
        token: "t".to_string(),
        ..Default::default()
    })
    .unwrap();
    let formatter = EventFormatter::default();
    let record = record();

    let err = forwarder.send(&formatter.format(&record)).await.unwrap_err();
    match err {
        SinkError::Status { status, body } => {
            assert_eq!(status, 500);
            assert!(body.is_empty());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(logs_contain("Failed to read collector response body"));
}
