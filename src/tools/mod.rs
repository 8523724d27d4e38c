//! Zyfai tool set
//!
//! Each submodule registers one category of tools. Both the HTTP gateway
//! and the stdio server serve the catalog built here.

pub mod analytics;
pub mod earnings;
pub mod helpers;
pub mod historical;
pub mod opportunities;
pub mod portfolio;
pub mod protocols;
pub mod rebalancing;
pub mod user_data;

use crate::services::tool_catalog::ToolCatalog;

pub fn build_catalog() -> ToolCatalog {
    let mut catalog = ToolCatalog::new();
    portfolio::register(&mut catalog);
    opportunities::register(&mut catalog);
    protocols::register(&mut catalog);
    rebalancing::register(&mut catalog);
    analytics::register(&mut catalog);
    earnings::register(&mut catalog);
    historical::register(&mut catalog);
    user_data::register(&mut catalog);
    helpers::register(&mut catalog);
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_every_tool() {
        let catalog = build_catalog();
        assert_eq!(catalog.len(), 25);
        for name in [
            "get-portfolio",
            "get-multichain-portfolio",
            "get-positions",
            "get-top-opportunities",
            "get-degen-acp-opportunities",
            "get-available-protocols",
            "get-rebalance-info",
            "backtest-cross-chain-rebalance",
            "get-best-positions",
            "get-morpho-average-apys",
            "get-daily-apy-history",
            "get-protocol-apy-history",
            "get-history",
            "get-first-topup",
            "complete-user-onboarding-flow",
            "get-position-summary",
        ] {
            assert!(catalog.contains(name), "missing tool {}", name);
        }
    }

    #[test]
    fn test_every_schema_is_an_object() {
        for definition in build_catalog().definitions() {
            assert_eq!(
                definition.input_schema["type"], "object",
                "schema of {} is not an object",
                definition.name
            );
        }
    }
}
