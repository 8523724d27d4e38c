//! Wallet transaction history tools

use schemars::JsonSchema;
use serde::Deserialize;

use crate::models::zyfai::SupportedChain;
use crate::services::tool_catalog::{respond, ToolCatalog, ToolContext};
use crate::services::zyfai_api::HistoryFilter;

const CATEGORY: &str = "user-data";

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    #[schemars(description = "The smart wallet address")]
    pub wallet_address: String,
    #[schemars(description = "Chain ID (8453 for Base, 42161 for Arbitrum, 9745 for Plasma)")]
    pub chain_id: u64,
    #[schemars(description = "Optional limit for number of results")]
    pub limit: Option<u32>,
    #[schemars(description = "Optional offset for pagination")]
    pub offset: Option<u32>,
    #[schemars(description = "Optional start date in YYYY-MM-DD format")]
    pub from_date: Option<String>,
    #[schemars(description = "Optional end date in YYYY-MM-DD format")]
    pub to_date: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FirstTopupParams {
    #[schemars(description = "The smart wallet address")]
    pub wallet_address: String,
    #[schemars(description = "Chain ID (8453 for Base, 42161 for Arbitrum, 9745 for Plasma)")]
    pub chain_id: u64,
}

pub fn register(catalog: &mut ToolCatalog) {
    catalog
        .register(
            "get-history",
            CATEGORY,
            "Get transaction history for a wallet",
            |ctx: ToolContext, p: HistoryParams| async move {
                let result = async {
                    let chain = SupportedChain::from_id(p.chain_id)?;
                    let filter = HistoryFilter {
                        limit: p.limit,
                        offset: p.offset,
                        from_date: p.from_date.clone(),
                        to_date: p.to_date.clone(),
                    };
                    ctx.client()?
                        .get_history(&p.wallet_address, chain, &filter)
                        .await
                };
                respond("history", result.await)
            },
        )
        .register(
            "get-first-topup",
            CATEGORY,
            "Get the first topup (deposit) information for a wallet",
            |ctx: ToolContext, p: FirstTopupParams| async move {
                let result = async {
                    let chain = SupportedChain::from_id(p.chain_id)?;
                    ctx.client()?.get_first_topup(&p.wallet_address, chain).await
                };
                respond("first topup", result.await)
            },
        );
}
