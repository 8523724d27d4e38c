//! Composite tools built from several upstream calls

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::tool::ToolResult;
use crate::models::zyfai::ApiError;
use crate::services::tool_catalog::{ToolCatalog, ToolContext};
use crate::services::upstream::OpportunityKind;
use crate::services::zyfai_api::ApiResult;

const CATEGORY: &str = "helpers";
const SUMMARY_BRANCHES: u32 = 4;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingParams {
    #[schemars(description = "Optional existing wallet address")]
    pub user_address: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryParams {
    #[schemars(description = "The wallet address to get complete summary for")]
    pub wallet_address: String,
}

pub fn register(catalog: &mut ToolCatalog) {
    catalog
        .register(
            "complete-user-onboarding-flow",
            CATEGORY,
            "Complete onboarding flow information: Creates Safe7579 wallet, adds session key, and provides deposit opportunities",
            |ctx: ToolContext, p: OnboardingParams| async move { onboarding(&ctx, p).await },
        )
        .register(
            "get-position-summary",
            CATEGORY,
            "Get a complete summary of user's positions, rebalance recommendations, and earnings",
            |ctx: ToolContext, p: SummaryParams| async move { position_summary(&ctx, &p.wallet_address).await },
        );
}

async fn onboarding(ctx: &ToolContext, params: OnboardingParams) -> ToolResult {
    let opportunities = match ctx
        .upstream
        .opportunities(ctx.api_key.as_deref(), OpportunityKind::Safe)
        .await
    {
        Ok(response) => response,
        Err(e) => return ToolResult::error(format!("Error in onboarding flow: {}", e)),
    };

    let mut existing_portfolio = Value::Null;
    if let Some(address) = &params.user_address {
        let portfolio = async { ctx.client()?.get_portfolio(address).await };
        match portfolio.await {
            Ok(response) => existing_portfolio = response.data,
            Err(e) => {
                tracing::debug!(error = %e, "No existing portfolio found, treating user as new");
            }
        }
    }

    ToolResult::json(&json!({
        "step": "onboarding-complete",
        "message": "User onboarding information retrieved successfully",
        "nextSteps": {
            "1": "Create Safe7579 account (handled by frontend/smart contract)",
            "2": "Add session key for automated operations",
            "3": "Review safe opportunities below",
            "4": "Make initial deposit to chosen protocol",
        },
        "safeOpportunities": opportunities.data,
        "existingPortfolio": existing_portfolio,
        "instructions": {
            "safe7579": "Safe7579 is an ERC-4337 compatible smart contract wallet. Deploy via the Zyfai frontend or smart contract integration.",
            "sessionKey": "Session keys allow automated rebalancing. Add via the session key module on your Safe7579 wallet.",
            "deposit": "Choose an opportunity from the list and deposit funds through the protocol's interface or Zyfai's aggregated interface.",
        },
    }))
}

/// Await one summary branch and report it as a progress step
async fn tracked<F>(ctx: &ToolContext, completed: &AtomicU32, label: &str, branch: F) -> ApiResult
where
    F: Future<Output = ApiResult>,
{
    let result = branch.await;
    let done = completed.fetch_add(1, Ordering::AcqRel) + 1;
    ctx.report_progress(done, SUMMARY_BRANCHES, label);
    result
}

fn split(result: ApiResult) -> (Value, Value) {
    match result {
        Ok(response) => (response.data, Value::Null),
        Err(e) => (Value::Null, error_value(&e)),
    }
}

fn error_value(e: &ApiError) -> Value {
    serde_json::to_value(e).unwrap_or_else(|_| Value::String(e.to_string()))
}

/// Fan out to four upstream calls concurrently. A failing branch never
/// cancels the others; its error is reported next to the other results.
async fn position_summary(ctx: &ToolContext, wallet: &str) -> ToolResult {
    let completed = AtomicU32::new(0);

    let (portfolio, rebalance, earnings, best_positions) = tokio::join!(
        tracked(ctx, &completed, "portfolio", async {
            ctx.client()?.get_multichain_portfolio(wallet).await
        }),
        tracked(ctx, &completed, "rebalanceInfo", async {
            ctx.client()?.get_rebalance_info(wallet, None).await
        }),
        tracked(ctx, &completed, "earnings", async {
            ctx.client()?.get_user_earnings(wallet).await
        }),
        tracked(ctx, &completed, "bestPositions", async {
            ctx.client()?.get_best_positions(wallet).await
        }),
    );

    let (portfolio, portfolio_error) = split(portfolio);
    let (rebalance, rebalance_error) = split(rebalance);
    let (earnings, earnings_error) = split(earnings);
    let (best_positions, best_positions_error) = split(best_positions);

    ToolResult::json(&json!({
        "walletAddress": wallet,
        "timestamp": Utc::now().to_rfc3339(),
        "portfolio": portfolio,
        "rebalanceRecommendations": rebalance,
        "earnings": earnings,
        "bestPositions": best_positions,
        "errors": {
            "portfolio": portfolio_error,
            "rebalanceInfo": rebalance_error,
            "earnings": earnings_error,
            "bestPositions": best_positions_error,
        },
    }))
}
