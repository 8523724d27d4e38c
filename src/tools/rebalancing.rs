//! Rebalancing recommendation and backtest tools

use schemars::JsonSchema;
use serde::Deserialize;

use crate::services::tool_catalog::{respond, ToolCatalog, ToolContext};

const CATEGORY: &str = "rebalancing";

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceInfoParams {
    #[schemars(description = "The wallet address to get rebalance information for")]
    pub wallet_address: String,
    #[schemars(description = "Restrict to cross-chain (true) or same-chain (false) rebalancing")]
    pub is_cross_chain: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletParams {
    #[schemars(description = "The wallet address to analyze")]
    pub wallet_address: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SameChainBacktestParams {
    #[schemars(description = "The wallet address to backtest")]
    pub wallet_address: String,
    #[schemars(description = "Chain ID to run the backtest on (e.g., 8453 for Base)")]
    pub chain_id: u64,
}

pub fn register(catalog: &mut ToolCatalog) {
    catalog
        .register(
            "get-rebalance-info",
            CATEGORY,
            "Get rebalancing recommendations for a wallet, optionally limited to same-chain or cross-chain moves",
            |ctx: ToolContext, p: RebalanceInfoParams| async move {
                let result = async {
                    ctx.client()?
                        .get_rebalance_info(&p.wallet_address, p.is_cross_chain)
                        .await
                };
                respond("rebalance info", result.await)
            },
        )
        .register(
            "get-same-chain-rebalance-info",
            CATEGORY,
            "Get same-chain rebalancing recommendations for a wallet",
            |ctx: ToolContext, p: WalletParams| async move {
                let result = async {
                    ctx.client()?
                        .get_rebalance_info(&p.wallet_address, Some(false))
                        .await
                };
                respond("same-chain rebalance info", result.await)
            },
        )
        .register(
            "get-cross-chain-rebalance-info",
            CATEGORY,
            "Get cross-chain rebalancing recommendations for a wallet",
            |ctx: ToolContext, p: WalletParams| async move {
                let result = async {
                    ctx.client()?
                        .get_rebalance_info(&p.wallet_address, Some(true))
                        .await
                };
                respond("cross-chain rebalance info", result.await)
            },
        )
        .register(
            "backtest-same-chain-rebalance",
            CATEGORY,
            "Backtest same-chain rebalancing for a wallet on one chain",
            |ctx: ToolContext, p: SameChainBacktestParams| async move {
                let result = async {
                    ctx.client()?
                        .backtest_same_chain_rebalance(&p.wallet_address, p.chain_id)
                        .await
                };
                respond("same-chain backtest", result.await)
            },
        )
        .register(
            "backtest-cross-chain-rebalance",
            CATEGORY,
            "Backtest cross-chain rebalancing for a wallet",
            |ctx: ToolContext, p: WalletParams| async move {
                let result = async {
                    ctx.client()?
                        .backtest_cross_chain_rebalance(&p.wallet_address)
                        .await
                };
                respond("cross-chain backtest", result.await)
            },
        );
}
