#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{HeaderMap, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;

use zyfai_mcp_gateway::{
    config::{Config, SessionConfig, X402Config, ZyfaiApiConfig},
    routes::build_router,
    AppState,
};

pub const ADMIN_KEY: &str = "test-admin-key";
pub const DEFAULT_API_KEY: &str = "server-default-key";
pub const GOOD_PROOF: &str = "good-proof";
pub const TRANSACTION_ID: &str = "tx-123";

/// Wallet address the mock upstream always fails for
pub const BROKEN_WALLET: &str = "0xbroken";

/// Wallet whose earnings endpoints fail while everything else works
pub const NO_EARNINGS_WALLET: &str = "0xnoearnings";

/// One request seen by the mock upstream
#[derive(Debug, Clone)]
pub struct UpstreamHit {
    pub path: String,
    pub query: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Clone, Default)]
pub struct MockUpstream {
    hits: Arc<Mutex<Vec<UpstreamHit>>>,
}

impl MockUpstream {
    pub fn hits(&self) -> Vec<UpstreamHit> {
        self.hits.lock().clone()
    }

    pub fn hits_for(&self, path: &str) -> usize {
        self.hits.lock().iter().filter(|h| h.path == path).count()
    }
}

#[derive(Clone, Default)]
pub struct MockFacilitator {
    pub verify_requests: Arc<Mutex<Vec<Value>>>,
    pub settle_requests: Arc<Mutex<Vec<Value>>>,
}

impl MockFacilitator {
    pub fn verify_count(&self) -> usize {
        self.verify_requests.lock().len()
    }

    pub fn settle_count(&self) -> usize {
        self.settle_requests.lock().len()
    }
}

async fn upstream_handler(
    State(mock): State<MockUpstream>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let path = uri.path().to_string();
    mock.hits.lock().push(UpstreamHit {
        path: path.clone(),
        query: uri.query().map(str::to_string),
        api_key: headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    let earnings_outage =
        path.starts_with("/api/v2/earnings/") && path.contains(NO_EARNINGS_WALLET);
    if path.contains(BROKEN_WALLET) || earnings_outage {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "upstream exploded" })),
        )
            .into_response();
    }

    Json(json!({ "path": path, "query": uri.query() })).into_response()
}

async fn verify_handler(State(mock): State<MockFacilitator>, Json(body): Json<Value>) -> Json<Value> {
    let valid = body["paymentProof"] == GOOD_PROOF;
    mock.verify_requests.lock().push(body);

    if valid {
        Json(json!({ "valid": true, "transactionId": TRANSACTION_ID }))
    } else {
        Json(json!({ "valid": false, "message": "Invalid payment proof" }))
    }
}

async fn settle_handler(State(mock): State<MockFacilitator>, Json(body): Json<Value>) -> Json<Value> {
    mock.settle_requests.lock().push(body);
    Json(json!({ "success": true }))
}

async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("mock server address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    format!("http://{}", addr)
}

pub async fn spawn_upstream() -> (String, MockUpstream) {
    let mock = MockUpstream::default();
    let app = Router::new()
        .fallback(upstream_handler)
        .with_state(mock.clone());
    (spawn_server(app).await, mock)
}

pub async fn spawn_facilitator() -> (String, MockFacilitator) {
    let mock = MockFacilitator::default();
    let app = Router::new()
        .route("/verify", post(verify_handler))
        .route("/settle", post(settle_handler))
        .with_state(mock.clone());
    (spawn_server(app).await, mock)
}

pub fn test_config(upstream_url: &str, facilitator_url: &str, x402_enabled: bool) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        allowed_origins: vec!["*".to_string()],
        admin_api_key: Some(ADMIN_KEY.to_string()),
        zyfai: ZyfaiApiConfig {
            base_url: upstream_url.to_string(),
            api_key: Some(DEFAULT_API_KEY.to_string()),
            timeout: Duration::from_secs(5),
            client_cache_capacity: 4,
            cache_ttl: Duration::from_secs(60),
        },
        x402: X402Config {
            enabled: x402_enabled,
            facilitator_url: facilitator_url.to_string(),
            receiver_address: Some("0xreceiver".to_string()),
        },
        sessions: SessionConfig {
            idle_timeout: Duration::from_secs(1800),
            sweep_interval: Duration::from_secs(60),
        },
    }
}

/// Gateway wired to fresh mock upstream and facilitator servers
pub struct TestGateway {
    pub app: Router,
    pub state: AppState,
    pub upstream: MockUpstream,
    pub facilitator: MockFacilitator,
}

impl TestGateway {
    pub async fn start(x402_enabled: bool) -> Self {
        Self::start_with(|config| config.x402.enabled = x402_enabled).await
    }

    pub async fn start_with(customize: impl FnOnce(&mut Config)) -> Self {
        let (upstream_url, upstream) = spawn_upstream().await;
        let (facilitator_url, facilitator) = spawn_facilitator().await;

        let mut config = test_config(&upstream_url, &facilitator_url, false);
        customize(&mut config);

        let state = AppState::new(config);
        Self {
            app: build_router(state.clone()),
            state,
            upstream,
            facilitator,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Run the initialize handshake and return the new session id
    pub async fn initialize(&self, api_key: Option<&str>) -> String {
        let mut builder = Request::post("/mcp")
            .header("content-type", "application/json")
            .header("accept", "application/json, text/event-stream");
        if let Some(key) = api_key {
            builder = builder.header("x-zyfai-api-key", key);
        }
        let request = builder
            .body(Body::from(initialize_request(1).to_string()))
            .unwrap();

        let response = self.send(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        response
            .headers()
            .get("mcp-session-id")
            .expect("session id header")
            .to_str()
            .unwrap()
            .to_string()
    }

    /// POST a JSON-RPC payload inside a session
    pub async fn post(&self, session_id: Option<&str>, body: Value) -> Response {
        self.post_with_headers(session_id, body, &[]).await
    }

    pub async fn post_with_headers(
        &self,
        session_id: Option<&str>,
        body: Value,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::post("/mcp")
            .header("content-type", "application/json")
            .header("accept", "application/json, text/event-stream");
        if let Some(id) = session_id {
            builder = builder.header("mcp-session-id", id);
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// `tools/call` inside a session, returning the JSON-RPC response
    pub async fn call_tool(&self, session_id: &str, name: &str, arguments: Value) -> Value {
        let response = self
            .post(Some(session_id), tool_call_request(7, name, arguments))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }
}

pub fn initialize_request(id: u64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "1.0.0" },
        },
    })
}

pub fn tool_call_request(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments },
    })
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("JSON body")
}

/// Text of the first content block of a `tools/call` result
pub fn tool_text(response: &Value) -> String {
    response["result"]["content"][0]["text"]
        .as_str()
        .expect("text content")
        .to_string()
}

pub fn is_tool_error(response: &Value) -> bool {
    response["result"]["isError"] == json!(true)
}
