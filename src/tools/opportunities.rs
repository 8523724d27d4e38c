//! Yield opportunity discovery tools
//!
//! Listings are global rather than per wallet, so they are served through
//! the upstream response cache.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::services::tool_catalog::{respond, ToolCatalog, ToolContext};
use crate::services::upstream::OpportunityKind;
use crate::services::zyfai_api::ApiResult;

const CATEGORY: &str = "opportunities";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoParams {}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChainParams {
    #[schemars(description = "Chain ID (e.g., 8453 for Base, 42161 for Arbitrum)")]
    pub chain_id: u64,
}

async fn opportunities(ctx: &ToolContext, kind: OpportunityKind) -> ApiResult {
    ctx.upstream.opportunities(ctx.api_key.as_deref(), kind).await
}

pub fn register(catalog: &mut ToolCatalog) {
    catalog
        .register(
            "get-top-opportunities",
            CATEGORY,
            "Get the top DeFi opportunities across all chains and protocols",
            |ctx: ToolContext, _: NoParams| async move {
                respond("top opportunities", opportunities(&ctx, OpportunityKind::Top).await)
            },
        )
        .register(
            "get-safe-opportunities",
            CATEGORY,
            "Get safe (low risk) DeFi opportunities suitable for conservative investors",
            |ctx: ToolContext, _: NoParams| async move {
                respond("safe opportunities", opportunities(&ctx, OpportunityKind::Safe).await)
            },
        )
        .register(
            "get-degen-opportunities",
            CATEGORY,
            "Get high-risk high-reward DeFi opportunities for aggressive investors",
            |ctx: ToolContext, _: NoParams| async move {
                respond("degen opportunities", opportunities(&ctx, OpportunityKind::Degen).await)
            },
        )
        .register(
            "get-degen-acp-opportunities",
            CATEGORY,
            "Get degen ACP opportunities for a specific chain (high-risk, high-reward with ACP protocol)",
            |ctx: ToolContext, p: ChainParams| async move {
                respond(
                    "degen ACP opportunities",
                    opportunities(&ctx, OpportunityKind::DegenAcp(p.chain_id)).await,
                )
            },
        );
}
