//! Historical APY tools

use schemars::JsonSchema;
use serde::Deserialize;

use crate::services::tool_catalog::{respond, ToolCatalog, ToolContext};

const DEFAULT_HISTORY_DAYS: u32 = 30;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProtocolApyHistoryParams {
    #[schemars(description = "Protocol name")]
    pub protocol: String,
    #[schemars(description = "Chain name")]
    pub chain: String,
    #[schemars(description = "Number of days of history (default: 30)")]
    pub days: Option<u32>,
}

pub fn register(catalog: &mut ToolCatalog) {
    catalog.register(
        "get-protocol-apy-history",
        "historical",
        "Get historical APY data for a specific protocol and chain",
        |ctx: ToolContext, p: ProtocolApyHistoryParams| async move {
            let days = p.days.filter(|d| *d > 0).unwrap_or(DEFAULT_HISTORY_DAYS);
            let result = async {
                ctx.client()?
                    .get_protocol_apy_history(&p.protocol, &p.chain, days)
                    .await
            };
            respond("protocol APY history", result.await)
        },
    );
}
