//! Analytics and risk tools

use schemars::JsonSchema;
use serde::Deserialize;

use crate::services::tool_catalog::{respond, ToolCatalog, ToolContext};

const CATEGORY: &str = "analytics";

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletParams {
    #[schemars(description = "The wallet address to analyze")]
    pub wallet_address: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RiskMetricsParams {
    #[schemars(description = "Protocol name (e.g., 'Aave', 'Compound')")]
    pub protocol: String,
    #[schemars(description = "Chain name (e.g., 'base', 'arbitrum')")]
    pub chain: String,
    #[schemars(description = "Asset symbol (e.g., 'USDC', 'ETH')")]
    pub asset: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChainParams {
    #[schemars(description = "Chain ID (e.g., 8453 for Base)")]
    pub chain_id: u64,
}

pub fn register(catalog: &mut ToolCatalog) {
    catalog
        .register(
            "get-best-positions",
            CATEGORY,
            "Get the best positions analysis for a wallet based on historical performance",
            |ctx: ToolContext, p: WalletParams| async move {
                let result = async { ctx.client()?.get_best_positions(&p.wallet_address).await };
                respond("best positions", result.await)
            },
        )
        .register(
            "get-risk-metrics",
            CATEGORY,
            "Get detailed risk metrics for a specific protocol, chain, and asset combination",
            |ctx: ToolContext, p: RiskMetricsParams| async move {
                let result = async {
                    ctx.client()?
                        .get_risk_metrics(&p.protocol, &p.chain, &p.asset)
                        .await
                };
                respond("risk metrics", result.await)
            },
        )
        .register(
            "get-morpho-average-apys",
            CATEGORY,
            "Get average Morpho vault APYs for a chain",
            |ctx: ToolContext, p: ChainParams| async move {
                let result = async { ctx.client()?.get_morpho_average_apys(p.chain_id).await };
                respond("Morpho average APYs", result.await)
            },
        );
}
