//! Earnings tools

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::services::tool_catalog::{respond, ToolCatalog, ToolContext};

const CATEGORY: &str = "earnings";

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletParams {
    #[schemars(description = "The wallet address to get earnings for")]
    pub wallet_address: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyEarningsParams {
    #[schemars(description = "The smart wallet address to get daily earnings for")]
    pub wallet_address: String,
    #[schemars(description = "Start date in YYYY-MM-DD format")]
    pub start_date: Option<String>,
    #[schemars(description = "End date in YYYY-MM-DD format")]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema)]
pub enum ApyPeriod {
    #[default]
    #[serde(rename = "7D")]
    SevenDays,
    #[serde(rename = "14D")]
    FourteenDays,
    #[serde(rename = "30D")]
    ThirtyDays,
}

impl ApyPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SevenDays => "7D",
            Self::FourteenDays => "14D",
            Self::ThirtyDays => "30D",
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyApyHistoryParams {
    #[schemars(description = "The smart wallet address")]
    pub wallet_address: String,
    #[serde(default)]
    #[schemars(description = "Period: '7D', '14D', or '30D' (default: '7D')")]
    pub days: ApyPeriod,
}

pub fn register(catalog: &mut ToolCatalog) {
    catalog
        .register(
            "get-user-earnings",
            CATEGORY,
            "Get earnings history and statistics for a user's wallet address",
            |ctx: ToolContext, p: WalletParams| async move {
                let result = async { ctx.client()?.get_user_earnings(&p.wallet_address).await };
                respond("user earnings", result.await)
            },
        )
        .register(
            "get-onchain-earnings",
            CATEGORY,
            "Get onchain earnings for a wallet including total, current, and lifetime earnings",
            |ctx: ToolContext, p: WalletParams| async move {
                let result = async { ctx.client()?.get_onchain_earnings(&p.wallet_address).await };
                respond("onchain earnings", result.await)
            },
        )
        .register(
            "get-daily-earnings",
            CATEGORY,
            "Get daily earnings for a wallet within a date range",
            |ctx: ToolContext, p: DailyEarningsParams| async move {
                let result = async {
                    ctx.client()?
                        .get_daily_earnings(
                            &p.wallet_address,
                            p.start_date.as_deref(),
                            p.end_date.as_deref(),
                        )
                        .await
                };
                respond("daily earnings", result.await)
            },
        )
        .register(
            "get-daily-apy-history",
            CATEGORY,
            "Get daily APY history for a wallet including total, current, and lifetime earnings",
            |ctx: ToolContext, p: DailyApyHistoryParams| async move {
                let result = async {
                    ctx.client()?
                        .get_daily_apy_history(&p.wallet_address, p.days.as_str())
                        .await
                };
                respond("daily APY history", result.await)
            },
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apy_period_defaults_to_seven_days() {
        let p: DailyApyHistoryParams =
            serde_json::from_value(json!({"walletAddress": "0x1"})).unwrap();
        assert_eq!(p.days.as_str(), "7D");
    }

    #[test]
    fn test_apy_period_rejects_unknown_value() {
        let p = serde_json::from_value::<DailyApyHistoryParams>(
            json!({"walletAddress": "0x1", "days": "90D"}),
        );
        assert!(p.is_err());
    }
}
