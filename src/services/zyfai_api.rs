//! HTTP client for the Zyfai DeFi API
//!
//! One `ZyfaiClient` is bound to one API key. Every call returns the uniform
//! `ApiResponse` envelope around the raw upstream JSON, or an `ApiError`.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde_json::Value;

use crate::models::zyfai::{ApiError, ApiResponse, SupportedChain};

pub type ApiResult = Result<ApiResponse<Value>, ApiError>;

const API_KEY_HEADER: &str = "x-api-key";

/// Optional filters for the transaction history endpoint
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ZyfaiClient {
    client: Client,
    base_url: Url,
}

impl ZyfaiClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ApiError::new(ApiError::UNKNOWN_ERROR, format!("Invalid API base URL: {}", e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(api_key).map_err(|_| {
            ApiError::invalid_argument("API key contains characters not allowed in a header")
        })?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(ApiError::from)?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::new(ApiError::UNKNOWN_ERROR, "API base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, segments: &[&str], query: &[(&str, String)]) -> ApiResult {
        let url = self.endpoint(segments)?;
        tracing::debug!("GET {}", url.path());

        let response = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(path = %url.path(), error = %e, "Zyfai API request failed");
                ApiError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let details = serde_json::from_str::<Value>(&body)
                .unwrap_or_else(|_| Value::String(body));
            tracing::warn!(path = %url.path(), status = %status, "Zyfai API returned an error status");
            return Err(ApiError::new(
                ApiError::http_status_code(status.as_u16()),
                format!("Request failed with status code {}", status.as_u16()),
            )
            .with_details(details));
        }

        let data = response.json::<Value>().await.map_err(|e| {
            ApiError::new(ApiError::INVALID_RESPONSE, format!("Invalid JSON from upstream: {}", e))
        })?;

        Ok(ApiResponse::ok(data))
    }

    // Portfolio

    pub async fn get_portfolio(&self, address: &str) -> ApiResult {
        self.get(
            &["api", "v2", "debank", "portfolio", "total-portfolio-value", address],
            &[],
        )
        .await
    }

    pub async fn get_multichain_portfolio(&self, address: &str) -> ApiResult {
        self.get(&["api", "v2", "debank", "portfolio", "multichain", address], &[])
            .await
    }

    pub async fn get_positions(&self, address: &str, chain: Option<SupportedChain>) -> ApiResult {
        let query: Vec<(&str, String)> = chain
            .map(|c| vec![("chainId", c.id().to_string())])
            .unwrap_or_default();
        self.get(&["api", "v2", "positions", address], &query).await
    }

    // Opportunities

    pub async fn get_opportunities(&self, kind: &str, chain_id: Option<u64>) -> ApiResult {
        let query: Vec<(&str, String)> = chain_id
            .map(|id| vec![("chainId", id.to_string())])
            .unwrap_or_default();
        self.get(&["api", "v2", "opportunities", kind], &query).await
    }

    pub async fn get_available_protocols(&self, chain: SupportedChain) -> ApiResult {
        self.get(
            &["api", "v2", "protocols"],
            &[("chainId", chain.id().to_string())],
        )
        .await
    }

    // Rebalancing

    pub async fn get_rebalance_info(&self, wallet: &str, is_cross_chain: Option<bool>) -> ApiResult {
        let mut query = vec![("walletAddress", wallet.to_string())];
        if let Some(cross) = is_cross_chain {
            query.push(("isCrossChain", cross.to_string()));
        }
        self.get(&["api", "v2", "rebalance", "rebalance-info"], &query)
            .await
    }

    pub async fn backtest_same_chain_rebalance(&self, wallet: &str, chain_id: u64) -> ApiResult {
        self.get(
            &["api", "v2", "rebalance", "backtest-same-chain"],
            &[
                ("walletAddress", wallet.to_string()),
                ("chainId", chain_id.to_string()),
            ],
        )
        .await
    }

    pub async fn backtest_cross_chain_rebalance(&self, wallet: &str) -> ApiResult {
        self.get(
            &["api", "v2", "rebalance", "backtest-cross-chain"],
            &[("walletAddress", wallet.to_string())],
        )
        .await
    }

    // Analytics

    pub async fn get_best_positions(&self, wallet: &str) -> ApiResult {
        self.get(
            &["api", "v2", "best-positions"],
            &[("walletAddress", wallet.to_string())],
        )
        .await
    }

    pub async fn get_risk_metrics(&self, protocol: &str, chain: &str, asset: &str) -> ApiResult {
        self.get(
            &["api", "v2", "risk-metrics"],
            &[
                ("protocol", protocol.to_string()),
                ("chain", chain.to_string()),
                ("asset", asset.to_string()),
            ],
        )
        .await
    }

    pub async fn get_morpho_average_apys(&self, chain_id: u64) -> ApiResult {
        self.get(
            &["api", "v2", "morpho", "average-apys"],
            &[("chain_id", chain_id.to_string())],
        )
        .await
    }

    // Earnings

    pub async fn get_user_earnings(&self, address: &str) -> ApiResult {
        self.get(&["api", "v2", "earnings", address], &[]).await
    }

    pub async fn get_onchain_earnings(&self, address: &str) -> ApiResult {
        self.get(&["api", "v2", "earnings", address, "onchain"], &[])
            .await
    }

    pub async fn get_daily_earnings(
        &self,
        address: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> ApiResult {
        let mut query = Vec::new();
        if let Some(start) = start_date {
            query.push(("startDate", start.to_string()));
        }
        if let Some(end) = end_date {
            query.push(("endDate", end.to_string()));
        }
        self.get(&["api", "v2", "earnings", address, "daily"], &query)
            .await
    }

    pub async fn get_daily_apy_history(&self, address: &str, days: &str) -> ApiResult {
        self.get(
            &["api", "v2", "earnings", address, "daily-apy-history"],
            &[("days", days.to_string())],
        )
        .await
    }

    // Historical

    pub async fn get_protocol_apy_history(&self, protocol: &str, chain: &str, days: u32) -> ApiResult {
        self.get(
            &["api", "v2", "history"],
            &[
                ("protocol", protocol.to_string()),
                ("chain", chain.to_string()),
                ("days", days.to_string()),
            ],
        )
        .await
    }

    // User data

    pub async fn get_history(
        &self,
        wallet: &str,
        chain: SupportedChain,
        filter: &HistoryFilter,
    ) -> ApiResult {
        let mut query = vec![("chainId", chain.id().to_string())];
        if let Some(limit) = filter.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = filter.offset {
            query.push(("offset", offset.to_string()));
        }
        if let Some(from) = &filter.from_date {
            query.push(("fromDate", from.clone()));
        }
        if let Some(to) = &filter.to_date {
            query.push(("toDate", to.clone()));
        }
        self.get(&["api", "v2", "transactions", wallet], &query).await
    }

    pub async fn get_first_topup(&self, wallet: &str, chain: SupportedChain) -> ApiResult {
        self.get(
            &["api", "v2", "transactions", wallet, "first-topup"],
            &[("chainId", chain.id().to_string())],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_escapes_path_segments() {
        let client =
            ZyfaiClient::new("https://api.example.com", "key", Duration::from_secs(5)).unwrap();
        let url = client
            .endpoint(&["api", "v2", "earnings", "../admin"])
            .unwrap();
        assert_eq!(url.path(), "/api/v2/earnings/..%2Fadmin");
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let client =
            ZyfaiClient::new("https://example.com/zyfai", "key", Duration::from_secs(5)).unwrap();
        let url = client.endpoint(&["api", "v2", "best-positions"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/zyfai/api/v2/best-positions");
    }

    #[test]
    fn test_rejects_api_key_with_newline() {
        let err = ZyfaiClient::new("https://api.example.com", "bad\nkey", Duration::from_secs(5))
            .unwrap_err();
        assert_eq!(err.code, ApiError::INVALID_ARGUMENT);
    }
}
