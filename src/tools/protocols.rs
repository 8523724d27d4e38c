//! Protocol discovery tools

use schemars::JsonSchema;
use serde::Deserialize;

use crate::models::zyfai::SupportedChain;
use crate::services::tool_catalog::{respond, ToolCatalog, ToolContext};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolsParams {
    #[schemars(description = "Chain ID (8453 for Base, 42161 for Arbitrum, 9745 for Plasma)")]
    pub chain_id: u64,
}

pub fn register(catalog: &mut ToolCatalog) {
    catalog.register(
        "get-available-protocols",
        "protocols",
        "Get available DeFi protocols and pools for a specific chain on Zyfai",
        |ctx: ToolContext, p: ProtocolsParams| async move {
            let result = async {
                let chain = SupportedChain::from_id(p.chain_id)?;
                ctx.client()?.get_available_protocols(chain).await
            };
            respond("available protocols", result.await)
        },
    );
}
