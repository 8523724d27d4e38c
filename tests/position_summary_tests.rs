mod common;

use serde_json::{json, Value};

use crate::common::{is_tool_error, tool_text, TestGateway, BROKEN_WALLET, NO_EARNINGS_WALLET};

#[tokio::test]
async fn test_summary_collects_all_branches() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    let response = gateway
        .call_tool(&session_id, "get-position-summary", json!({"walletAddress": "0xabc"}))
        .await;

    assert!(!is_tool_error(&response));
    let summary: Value = serde_json::from_str(&tool_text(&response)).unwrap();
    assert_eq!(summary["walletAddress"], "0xabc");
    assert!(summary["timestamp"].is_string());
    assert_eq!(
        summary["portfolio"]["path"],
        "/api/v2/debank/portfolio/multichain/0xabc"
    );
    assert_eq!(
        summary["rebalanceRecommendations"]["path"],
        "/api/v2/rebalance/rebalance-info"
    );
    assert_eq!(summary["earnings"]["path"], "/api/v2/earnings/0xabc");
    assert_eq!(summary["bestPositions"]["path"], "/api/v2/best-positions");

    for branch in ["portfolio", "rebalanceInfo", "earnings", "bestPositions"] {
        assert!(summary["errors"][branch].is_null(), "{} should not fail", branch);
    }
    assert_eq!(gateway.upstream.hits().len(), 4);
}

#[tokio::test]
async fn test_single_failing_branch_is_reported_alone() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    let response = gateway
        .call_tool(
            &session_id,
            "get-position-summary",
            json!({"walletAddress": NO_EARNINGS_WALLET}),
        )
        .await;

    assert!(!is_tool_error(&response));
    let summary: Value = serde_json::from_str(&tool_text(&response)).unwrap();

    assert!(summary["earnings"].is_null());
    assert_eq!(summary["errors"]["earnings"]["code"], "HTTP_500");
    assert!(summary["portfolio"].is_object());
    assert!(summary["rebalanceRecommendations"].is_object());
    assert!(summary["bestPositions"].is_object());
    for branch in ["portfolio", "rebalanceInfo", "bestPositions"] {
        assert!(summary["errors"][branch].is_null(), "{} should not fail", branch);
    }
    assert_eq!(gateway.upstream.hits().len(), 4);
}

#[tokio::test]
async fn test_failing_branches_do_not_cancel_others() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    // The mock fails every path that embeds the broken wallet; rebalance info
    // and best positions pass the wallet as a query parameter instead
    let response = gateway
        .call_tool(
            &session_id,
            "get-position-summary",
            json!({"walletAddress": BROKEN_WALLET}),
        )
        .await;

    assert!(!is_tool_error(&response));
    let summary: Value = serde_json::from_str(&tool_text(&response)).unwrap();

    assert!(summary["portfolio"].is_null());
    assert!(summary["earnings"].is_null());
    assert_eq!(summary["errors"]["portfolio"]["code"], "HTTP_500");
    assert_eq!(summary["errors"]["earnings"]["code"], "HTTP_500");

    assert!(summary["rebalanceRecommendations"].is_object());
    assert!(summary["bestPositions"].is_object());
    assert!(summary["errors"]["rebalanceInfo"].is_null());
    assert!(summary["errors"]["bestPositions"].is_null());
}

#[tokio::test]
async fn test_summary_without_credential_reports_every_branch() {
    let gateway = TestGateway::start_with(|config| config.zyfai.api_key = None).await;
    let session_id = gateway.initialize(None).await;

    let response = gateway
        .call_tool(&session_id, "get-position-summary", json!({"walletAddress": "0xabc"}))
        .await;

    let summary: Value = serde_json::from_str(&tool_text(&response)).unwrap();
    for branch in ["portfolio", "rebalanceInfo", "earnings", "bestPositions"] {
        assert_eq!(summary["errors"][branch]["code"], "MISSING_API_KEY");
    }
    assert!(gateway.upstream.hits().is_empty());
}

#[tokio::test]
async fn test_onboarding_tolerates_missing_portfolio() {
    let gateway = TestGateway::start(false).await;
    let session_id = gateway.initialize(None).await;

    let response = gateway
        .call_tool(
            &session_id,
            "complete-user-onboarding-flow",
            json!({"userAddress": BROKEN_WALLET}),
        )
        .await;

    assert!(!is_tool_error(&response));
    let flow: Value = serde_json::from_str(&tool_text(&response)).unwrap();
    assert_eq!(flow["step"], "onboarding-complete");
    assert_eq!(flow["safeOpportunities"]["path"], "/api/v2/opportunities/safe");
    assert!(flow["existingPortfolio"].is_null());
}
