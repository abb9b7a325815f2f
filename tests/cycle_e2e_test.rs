use chrono::Utc;
use perf_stats_forwarder::app::{App, Config, SendFailurePolicy};
use perf_stats_forwarder::domain::CycleContext;
use perf_stats_forwarder::pipeline::{CycleOutcome, CycleRunner};
use perf_stats_forwarder::reliability::RetryPolicy;
use perf_stats_forwarder::scheduler::SchedulerSummary;
use perf_stats_forwarder::sender::{EventFormatter, SinkConfig, SinkForwarder};
use perf_stats_forwarder::source::{SourceConfig, StatsClient};
use serde_json::{Value, json};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path},
};

async fn upstream_with(payload: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload))
        .mount(&server)
        .await;
    server
}

fn runner(
    upstream: &MockServer,
    collector: &MockServer,
    policy: SendFailurePolicy,
) -> CycleRunner<StatsClient, SinkForwarder> {
    let source = StatsClient::new(SourceConfig {
        base_url: format!("{}/stats", upstream.uri()),
        api_id: "id".to_string(),
        api_key: "key".to_string(),
        site_ids: vec!["S1".to_string()],
        retry: RetryPolicy::new(3, Duration::from_millis(1)).unwrap(),
        ..Default::default()
    })
    .unwrap();
    let sink = SinkForwarder::new(SinkConfig {
        endpoint: format!("{}/collector", collector.uri()),
        token: "tok".to_string(),
        ..Default::default()
    })
    .unwrap();
    CycleRunner::new(source, sink, EventFormatter::default(), policy)
}

fn two_error_types() -> Value {
    json!({
        "data": [{
            "timestamp": 1_700_000_000_000_i64,
            "accountId": "A1",
            "sitesStatistics": [{
                "siteId": "S1",
                "siteName": "Site1",
                "statistics": {"errorResponseTypes": {"403": 5, "500": 2}}
            }]
        }]
    })
}

#[tokio::test]
async fn single_error_type_becomes_one_event() {
    let upstream = upstream_with(json!({
        "data": [{
            "timestamp": 1_700_000_000_000_i64,
            "accountId": "A1",
            "sitesStatistics": [{
                "siteId": "S1",
                "siteName": "Site1",
                "statistics": {"errorResponseTypes": {"403": 5}}
            }]
        }]
    }))
    .await;
    let collector = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collector"))
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
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&collector)
        .await;

    let report = runner(&upstream, &collector, SendFailurePolicy::Abort)
        .run(CycleContext::new(Utc::now()))
        .await;

    assert!(report.is_completed());
    assert_eq!(report.records_sent, 1);
    assert_eq!(report.sites_seen, 1);
}

#[tokio::test]
async fn site_without_statistics_does_not_spoil_the_payload() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "timestamp": 1_700_000_000_000_i64,
                "accountId": "A1",
                "sitesStatistics": [
                    {"siteId": "S1", "siteName": "Site1", "statistics": {"errorResponseTypes": {"403": 5}}},
                    {"siteId": "S2", "statistics": {}}
                ]
            }]
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    let collector = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collector"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&collector)
        .await;

    let report = runner(&upstream, &collector, SendFailurePolicy::Abort)
        .run(CycleContext::new(Utc::now()))
        .await;

    assert!(report.is_completed());
    assert_eq!(report.records_sent, 1);
    assert_eq!(report.sites_seen, 2);
    assert_eq!(report.sites_skipped, 1);
}

#[tokio::test]
async fn leaf_values_are_forwarded_as_received() {
    let upstream = upstream_with(json!({
        "data": [{
            "timestamp": 1_700_000_000_000_i64,
            "accountId": 42,
            "sitesStatistics": [{
                "siteId": "S1",
                "siteName": "Site1",
                "statistics": {
                    "errorResponseTypes": {"403": "5"},
                    "popLatency": [{"region": "EU", "pops": [{"pop": 7, "valuePerPop": 3}]}]
                }
            }]
        }]
    }))
    .await;
    let collector = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "event": {
                "timestamp": 1_700_000_000_000_i64,
                "accountId": 42,
                "siteId": "S1",
                "siteName": "Site1",
                "metricName": "errorResponseTypes",
                "errorType": "403",
                "value": "5"
            },
            "sourcetype": "json_http",
            "index": "main"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&collector)
        .await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "event": {
                "timestamp": 1_700_000_000_000_i64,
                "accountId": 42,
                "siteId": "S1",
                "siteName": "Site1",
                "metricName": "popLatency",
                "value": 3,
                "region": "EU",
                "pop": 7
            },
            "sourcetype": "json_http",
            "index": "main"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&collector)
        .await;

    let report = runner(&upstream, &collector, SendFailurePolicy::Abort)
        .run(CycleContext::new(Utc::now()))
        .await;

    assert!(report.is_completed());
    assert_eq!(report.records_sent, 2);
}

#[tokio::test]
async fn collector_error_aborts_remaining_records() {
    let upstream = upstream_with(two_error_types()).await;
    let collector = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .expect(1)
        .mount(&collector)
        .await;

    let report = runner(&upstream, &collector, SendFailurePolicy::Abort)
        .run(CycleContext::new(Utc::now()))
        .await;

    assert!(report.is_aborted());
    assert_eq!(report.records_sent, 0);
    assert_eq!(report.records_failed, 1);
}

#[tokio::test]
async fn continue_policy_sends_every_record() {
    let upstream = upstream_with(two_error_types()).await;
    let collector = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&collector)
        .await;

    let report = runner(&upstream, &collector, SendFailurePolicy::Continue)
        .run(CycleContext::new(Utc::now()))
        .await;

    assert!(matches!(report.outcome, CycleOutcome::Completed));
    assert_eq!(report.records_failed, 2);
}

#[tokio::test]
async fn exhausted_fetch_sends_nothing() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&upstream)
        .await;
    let collector = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&collector)
        .await;

    let report = runner(&upstream, &collector, SendFailurePolicy::Abort)
        .run(CycleContext::new(Utc::now()))
        .await;

    assert!(report.is_skipped());
}

#[tokio::test]
async fn app_stops_cleanly_when_cancelled() {
    let config = Config {
        api_id: "id".to_string(),
        api_key: "key".to_string(),
        site_ids: vec!["1".to_string()],
        sink_url: "http://127.0.0.1:8088/services/collector/event".to_string(),
        sink_token: "tok".to_string(),
        ..Default::default()
    };
    let app = App::from_config(config).unwrap();
    assert_eq!(app.config().sink_auth_scheme, "Splunk");

    let token = CancellationToken::new();
    token.cancel();
    let summary = app.run_until(token).await;

    assert_eq!(summary, SchedulerSummary::default());
}
