mod support;

use hateraide::channel::LinkState;
use hateraide::common::ClientError;
use hateraide::moderation::{
    ActionType, AnalysisPayload, DecisionSource, ModerationStore, check_health,
    fetch_applied_actions, fetch_feed,
};
use http::StatusCode;
use support::*;
use url::Url;

const PAYLOAD: &str = r#"{
    "reply_analyzer_results": {
        "analysis_timestamp": "2025-06-14T10:21:45",
        "reply_analyses": [
            { "reply_id": "r2", "analysis_result": { "sentiment": "unfriendly" } },
            { "reply_id": "r3", "analysis_result": { "sentiment": "friendly", "author_important": true } }
        ]
    }
}"#;

const SNAPSHOT: &str = r#"{
    "r9": {
        "reply_id": "r9",
        "action_type": "hide",
        "reason": "Content flagged as harmful",
        "sentiment": "harmful",
        "timestamp": "2025-06-14T09:00:00.000000",
        "status": "applied"
    }
}"#;

fn backend() -> MockHttp {
    let http = MockHttp::default();
    http.route("/reply_analyzer_results.json", StatusCode::OK, PAYLOAD);
    http.route("/api/moderation-actions", StatusCode::OK, SNAPSHOT);
    http
}

fn store(http: MockHttp) -> ModerationStore<MockHttp> {
    ModerationStore::new(
        http,
        Url::parse("http://localhost:8000/reply_analyzer_results.json").unwrap(),
        Url::parse("http://localhost:8000/api/moderation-actions").unwrap(),
    )
}

#[tokio::test(start_paused = true)]
async fn activation_loads_both_layers_and_follows_pushes() {
    let http = backend();
    let store = store(http.clone());
    let (client, mut accepted) = MockSocketClient::new();
    let channel = channel(client);

    let report = store.activate(&channel).await;
    assert!(report.is_complete());
    assert_eq!(report.preloaded.as_ref().ok(), Some(&1));
    assert_eq!(report.snapshot.as_ref().ok(), Some(&1));

    let mut requested = http.log.lock().unwrap().clone();
    requested.sort();
    assert_eq!(requested, ["/api/moderation-actions", "/reply_analyzer_results.json"]);

    assert_eq!(store.decision("r2").unwrap().source, DecisionSource::Preloaded);
    assert_eq!(store.decision("r9").unwrap().source, DecisionSource::Live);
    assert!(store.is_author_important("r3"));

    let server = accepted.recv().await.unwrap();
    settle().await;
    assert_eq!(channel.state().link, LinkState::Open);

    server.push_text(&moderation_frame("r2", "hide"));
    settle().await;
    let decision = store.decision("r2").unwrap();
    assert_eq!(decision.source, DecisionSource::Live);
    assert_eq!(decision.action.action_type, ActionType::Hide);

    // the same push twice changes nothing
    let before = store.decisions();
    server.push_text(&moderation_frame("r2", "hide"));
    settle().await;
    assert_eq!(store.decisions(), before);
}

#[tokio::test(start_paused = true)]
async fn failed_payload_fetch_keeps_preloaded_layer() {
    let http = backend();
    http.route(
        "/reply_analyzer_results.json",
        StatusCode::INTERNAL_SERVER_ERROR,
        "boom",
    );
    let store = store(http);
    let earlier: AnalysisPayload = serde_json::from_str(PAYLOAD).unwrap();
    store.load_preloaded(&earlier);

    let (client, _accepted) = MockSocketClient::new();
    let channel = channel(client);
    let report = store.activate(&channel).await;

    assert!(!report.is_complete());
    match &report.preloaded {
        Err(ClientError::Http(e)) => assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR),
        other => panic!("expected http error, got {other:?}"),
    }
    assert!(report.snapshot.is_ok());
    assert_eq!(store.get("r2").unwrap().action_type, ActionType::Blur);
    assert!(store.get("r9").is_some());
}

#[tokio::test(start_paused = true)]
async fn undecodable_payload_is_not_fatal() {
    let http = backend();
    http.route("/reply_analyzer_results.json", StatusCode::OK, "<html>");
    http.route("/api/moderation-actions", StatusCode::NOT_FOUND, "");
    let store = store(http);
    let (client, _accepted) = MockSocketClient::new();
    let channel = channel(client);

    let report = store.activate(&channel).await;
    assert!(matches!(report.preloaded, Err(ClientError::Decode(_))));
    assert!(matches!(report.snapshot, Err(ClientError::Http(_))));
    assert!(store.decisions().is_empty());
    // the live subscription is in place regardless
    assert_eq!(channel.state().listeners, 1);
}

#[tokio::test(start_paused = true)]
async fn deactivate_unsubscribes_and_clears_live() {
    let store = store(backend());
    let (client, mut accepted) = MockSocketClient::new();
    let channel = channel(client);
    store.activate(&channel).await;
    let server = accepted.recv().await.unwrap();
    settle().await;
    assert_eq!(channel.state().listeners, 1);

    store.deactivate(&channel);
    assert_eq!(store.live_len(), 0);
    assert_eq!(channel.state().listeners, 0);
    assert_eq!(store.decision("r2").unwrap().source, DecisionSource::Preloaded);

    server.push_text(&moderation_frame("r7", "hide"));
    settle().await;
    assert!(store.get("r7").is_none());
    // the connection itself belongs to the channel
    assert_eq!(channel.state().link, LinkState::Open);
}

#[tokio::test]
async fn fetch_helpers_decode_backend_documents() {
    let http = MockHttp::default();
    http.route("/health", StatusCode::OK, r#"{"status": "healthy", "service": "hateraide"}"#);
    http.route(
        "/api/mock-data",
        StatusCode::OK,
        r#"{"posts": [{"id": "p1", "content": "hi", "author": {"name": "a"}, "replies": [
            {"id": "r1", "content": "x", "author": {"name": "b"}, "sentiment": "harmful"}
        ]}]}"#,
    );
    http.route("/api/moderation-actions", StatusCode::OK, SNAPSHOT);

    let base = Url::parse("http://localhost:8000").unwrap();
    assert!(check_health(&http, &base.join("/health").unwrap()).await.unwrap());

    let feed = fetch_feed(&http, &base.join("/api/mock-data").unwrap())
        .await
        .unwrap();
    assert_eq!(feed.replies().count(), 1);

    let applied = fetch_applied_actions(&http, &base.join("/api/moderation-actions").unwrap())
        .await
        .unwrap();
    assert_eq!(applied["r9"].action_type, ActionType::Hide);

    http.route("/health", StatusCode::OK, r#"{"status": "degraded"}"#);
    assert!(!check_health(&http, &base.join("/health").unwrap()).await.unwrap());
}
