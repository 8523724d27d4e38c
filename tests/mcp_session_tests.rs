mod common;

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};

use crate::common::{
    body_json, initialize_request, is_tool_error, tool_call_request, tool_text, TestGateway,
    DEFAULT_API_KEY,
};

#[tokio::test]
async fn test_initialize_creates_session_with_header() {
    let gateway = TestGateway::start(false).await;

    let session_id = gateway.initialize(None).await;

    assert!(!session_id.is_empty());
    assert!(gateway.state.sessions.contains(&session_id));
    assert_eq!(gateway.state.sessions.len(), 1);
}

#[tokio::test]
async fn test_initialize_result_describes_server() {
    let gateway = TestGateway::start(false).await;

    let response = gateway.post(None, initialize_request(1)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(body["result"]["serverInfo"]["name"], "zyfai-rebalancing-mcp");
    assert_eq!(body["result"]["capabilities"]["tools"]["listChanged"], false);
}

#[tokio::test]
async fn test_concurrent_initializations_get_distinct_sessions() {
    let gateway = TestGateway::start(false).await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let app = gateway.app.clone();
        handles.push(tokio::spawn(async move {
            use tower::ServiceExt;
            let request = Request::post("/mcp")
                .header("content-type", "application/json")
                .body(Body::from(initialize_request(1).to_string()))
                .unwrap();
            let response = app.oneshot(request).await.unwrap();
            response.headers()["mcp-session-id"]
                .to_str()
                .unwrap()
                .to_string()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
    assert_eq!(gateway.state.sessions.len(), 16);
}

#[tokio::test]
async fn test_missing_and_unknown_session_are_distinguished() {
    let gateway = TestGateway::start(false).await;
    let ping = json!({"jsonrpc": "2.0", "id": 2, "method": "ping"});

    let response = gateway.post(None, ping.clone()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], -32000);

    let response = gateway.post(Some("no-such-session"), ping).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], -32001);
}

#[tokio::test]
async fn test_missing_session_id_ignores_payload() {
    let gateway = TestGateway::start(false).await;

    let malformed = Request::post("/mcp")
        .header("content-type", "application/json")
        .header("accept", "application/json, text/event-stream")
        .body(Body::from("{not json"))
        .unwrap();
    let batch = json!([
        {"jsonrpc": "2.0", "id": 1, "method": "ping"},
        {"jsonrpc": "2.0", "method": "notifications/initialized"},
    ]);

    let mut responses = vec![gateway.send(malformed).await];
    responses.push(
        gateway
            .post(None, tool_call_request(3, "get-portfolio", json!({"walletAddress": "0xabc"})))
            .await,
    );
    responses.push(gateway.post(None, batch).await);

    for response in responses {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], -32000);
    }
    assert!(gateway.state.sessions.is_empty());
    assert!(gateway.upstream.hits().is_empty());
}

#[tokio::test]
async fn test_reinitializing_known_session_is_rejected() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    let response = gateway.post(Some(&session_id), initialize_request(2)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(gateway.state.sessions.len(), 1);
}

#[tokio::test]
async fn test_initialize_with_unknown_session_id_creates_new_session() {
    let gateway = TestGateway::start(false).await;

    let response = gateway
        .post(Some("stale-session-id"), initialize_request(1))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let new_id = response.headers()["mcp-session-id"].to_str().unwrap().to_string();
    assert_ne!(new_id, "stale-session-id");
    assert!(gateway.state.sessions.contains(&new_id));
}

#[tokio::test]
async fn test_mixed_initialize_batch_is_rejected() {
    let gateway = TestGateway::start(false).await;

    let batch = json!([
        initialize_request(1),
        {"jsonrpc": "2.0", "id": 2, "method": "tools/list"},
    ]);
    let response = gateway.post(None, batch).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], -32600);
    assert!(gateway.state.sessions.is_empty());
}

#[tokio::test]
async fn test_parse_error_inside_session() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    let request = Request::post("/mcp")
        .header("content-type", "application/json")
        .header("mcp-session-id", &session_id)
        .body(Body::from("{not json"))
        .unwrap();
    let response = gateway.send(request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], -32700);
}

#[tokio::test]
async fn test_notifications_only_post_is_accepted() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    let response = gateway
        .post(
            Some(&session_id),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let session = gateway.state.sessions.lookup(&session_id).unwrap();
    assert!(session.is_client_initialized());
}

#[tokio::test]
async fn test_batch_responses_keep_arrival_order() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    let batch = json!([
        {"jsonrpc": "2.0", "id": "a", "method": "ping"},
        {"jsonrpc": "2.0", "method": "notifications/initialized"},
        {"jsonrpc": "2.0", "id": "b", "method": "tools/list"},
        {"jsonrpc": "2.0", "id": "c", "method": "resources/list"},
    ]);
    let response = gateway.post(Some(&session_id), batch).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let responses = body.as_array().unwrap();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["id"], "a");
    assert_eq!(responses[1]["id"], "b");
    assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 25);
    assert_eq!(responses[2]["id"], "c");
    assert_eq!(responses[2]["error"]["code"], -32601);
}

#[tokio::test]
async fn test_event_stream_only_accept_gets_sse_response() {
    let gateway = TestGateway::start(false).await;

    let request = Request::post("/mcp")
        .header("content-type", "application/json")
        .header("accept", "text/event-stream")
        .body(Body::from(initialize_request(1).to_string()))
        .unwrap();
    let response = gateway.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("mcp-session-id"));
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("event: message"));
    assert!(text.contains("zyfai-rebalancing-mcp"));
}

#[tokio::test]
async fn test_delete_terminates_session() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    let delete = || {
        Request::delete("/mcp")
            .header("mcp-session-id", &session_id)
            .body(Body::empty())
            .unwrap()
    };

    let response = gateway.send(delete()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!gateway.state.sessions.contains(&session_id));

    let response = gateway.send(delete()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = gateway
        .post(Some(&session_id), json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn open_stream(session_id: &str) -> Request<Body> {
    Request::get("/mcp")
        .header("accept", "text/event-stream")
        .header("mcp-session-id", session_id)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_second_stream_conflicts() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    let first = gateway.send(open_stream(&session_id)).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = gateway.send(open_stream(&session_id)).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = body_json(second).await;
    assert_eq!(body["error"]["code"], -32002);

    drop(first);
}

#[tokio::test]
async fn test_stream_disconnect_destroys_session() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    let stream = gateway.send(open_stream(&session_id)).await;
    assert_eq!(stream.status(), StatusCode::OK);
    assert!(gateway.state.sessions.contains(&session_id));

    drop(stream);

    assert!(!gateway.state.sessions.contains(&session_id));
    let response = gateway
        .post(Some(&session_id), json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_progress_notifications_reach_standalone_stream() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    let stream = gateway.send(open_stream(&session_id)).await;
    let mut body = stream.into_body();

    let call = json!({
        "jsonrpc": "2.0",
        "id": 9,
        "method": "tools/call",
        "params": {
            "name": "get-position-summary",
            "arguments": {"walletAddress": "0xabc"},
            "_meta": {"progressToken": "summary-1"},
        },
    });
    let response = gateway.post(Some(&session_id), call).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut progress_events = Vec::new();
    while progress_events.len() < 4 {
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("progress notification in time")
            .expect("stream still open")
            .expect("frame");
        let Ok(data) = frame.into_data() else { continue };
        let text = String::from_utf8(data.to_vec()).unwrap();
        for line in text.lines() {
            if let Some(json) = line.strip_prefix("data: ") {
                let message: Value = serde_json::from_str(json).unwrap();
                if message["method"] == "notifications/progress" {
                    progress_events.push(message);
                }
            }
        }
    }

    assert!(progress_events.iter().all(|m| m["params"]["progressToken"] == "summary-1"));
    assert!(progress_events.iter().all(|m| m["params"]["total"] == 4));
    let last = progress_events.last().unwrap();
    assert_eq!(last["params"]["progress"], 4);
}

#[tokio::test]
async fn test_session_credential_overrides_default() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(Some("session-key")).await;

    let response = gateway
        .call_tool(&session_id, "get-portfolio", json!({"walletAddress": "0xabc"}))
        .await;
    assert!(!is_tool_error(&response));

    let hits = gateway.upstream.hits();
    let hit = hits
        .iter()
        .find(|h| h.path == "/api/v2/debank/portfolio/total-portfolio-value/0xabc")
        .expect("upstream called");
    assert_eq!(hit.api_key.as_deref(), Some("session-key"));
}

#[tokio::test]
async fn test_server_default_credential_is_used_without_header() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    gateway
        .call_tool(&session_id, "get-user-earnings", json!({"walletAddress": "0xabc"}))
        .await;

    let hits = gateway.upstream.hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].api_key.as_deref(), Some(DEFAULT_API_KEY));
}

#[tokio::test]
async fn test_missing_credential_is_tool_error() {
    let gateway = TestGateway::start_with(|config| config.zyfai.api_key = None).await;
    let session_id = gateway.initialize(None).await;

    let response = gateway
        .call_tool(&session_id, "get-portfolio", json!({"walletAddress": "0xabc"}))
        .await;

    assert!(is_tool_error(&response));
    assert!(tool_text(&response).contains("MISSING_API_KEY"));
    assert!(gateway.upstream.hits().is_empty());
}

#[tokio::test]
async fn test_invalid_chain_is_tool_error() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    let response = gateway
        .call_tool(
            &session_id,
            "get-available-protocols",
            json!({"chainId": 1}),
        )
        .await;

    assert!(is_tool_error(&response));
    assert!(tool_text(&response).contains("8453"));
    assert!(gateway.upstream.hits().is_empty());
}

#[tokio::test]
async fn test_bad_arguments_are_invalid_params() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    let response = gateway
        .post(
            Some(&session_id),
            tool_call_request(3, "get-portfolio", json!({})),
        )
        .await;
    let body = body_json(response).await;

    assert_eq!(body["error"]["code"], -32602);
}

#[tokio::test]
async fn test_opportunities_are_cached() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    for _ in 0..3 {
        let response = gateway
            .call_tool(&session_id, "get-safe-opportunities", json!({}))
            .await;
        assert!(!is_tool_error(&response));
    }

    assert_eq!(gateway.upstream.hits_for("/api/v2/opportunities/safe"), 1);
}

#[tokio::test]
async fn test_upstream_failure_is_tool_error() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    let response = gateway
        .call_tool(
            &session_id,
            "get-portfolio",
            json!({"walletAddress": common::BROKEN_WALLET}),
        )
        .await;

    assert!(is_tool_error(&response));
    let text = tool_text(&response);
    assert!(text.starts_with("Error fetching portfolio"));
    assert!(text.contains("HTTP_500"));
}
