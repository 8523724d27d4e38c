//! Portfolio and position tools

use schemars::JsonSchema;
use serde::Deserialize;

use crate::models::zyfai::SupportedChain;
use crate::services::tool_catalog::{respond, ToolCatalog, ToolContext};

const CATEGORY: &str = "portfolio";

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletParams {
    #[schemars(description = "The wallet address to fetch portfolio for (0x...)")]
    pub wallet_address: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PositionsParams {
    #[schemars(description = "The user's EOA address to get positions and portfolio for")]
    pub user_address: String,
    #[schemars(
        description = "Optional chain ID to filter positions (8453 for Base, 42161 for Arbitrum, 9745 for Plasma)"
    )]
    pub chain_id: Option<u64>,
}

pub fn register(catalog: &mut ToolCatalog) {
    catalog
        .register(
            "get-portfolio",
            CATEGORY,
            "Get complete portfolio information for a wallet address including all positions and total value",
            |ctx: ToolContext, p: WalletParams| async move {
                let result = async { ctx.client()?.get_portfolio(&p.wallet_address).await };
                respond("portfolio", result.await)
            },
        )
        .register(
            "get-multichain-portfolio",
            CATEGORY,
            "Get multi-chain portfolio information for a wallet across all supported chains",
            |ctx: ToolContext, p: WalletParams| async move {
                let result = async {
                    ctx.client()?
                        .get_multichain_portfolio(&p.wallet_address)
                        .await
                };
                respond("multi-chain portfolio", result.await)
            },
        )
        .register(
            "get-positions",
            CATEGORY,
            "Get all active DeFi positions and portfolio for a user's wallet address",
            |ctx: ToolContext, p: PositionsParams| async move {
                let result = async {
                    let chain = p.chain_id.map(SupportedChain::from_id).transpose()?;
                    ctx.client()?.get_positions(&p.user_address, chain).await
                };
                respond("positions", result.await)
            },
        );
}
