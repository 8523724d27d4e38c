//! Upstream access point used by the tool handlers
//!
//! Resolves which credential a call runs under (session-bound key, else the
//! server default) and serves the opportunity listings from a short-lived
//! response cache.

use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;

use crate::config::ZyfaiApiConfig;
use crate::models::zyfai::{ApiError, ApiResponse};
use crate::services::client_pool::ClientPool;
use crate::services::zyfai_api::{ApiResult, ZyfaiClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpportunityKind {
    Top,
    Safe,
    Degen,
    DegenAcp(u64),
}

impl OpportunityKind {
    fn path(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Safe => "safe",
            Self::Degen => "degen",
            Self::DegenAcp(_) => "degen-acp",
        }
    }

    fn chain_id(self) -> Option<u64> {
        match self {
            Self::DegenAcp(chain_id) => Some(chain_id),
            _ => None,
        }
    }

    fn cache_key(self) -> String {
        match self.chain_id() {
            Some(chain_id) => format!("{}_{}", self.path(), chain_id),
            None => self.path().to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Upstream {
    pool: ClientPool,
    default_api_key: Option<String>,
    opportunities: Option<Cache<String, ApiResponse<Value>>>,
}

impl Upstream {
    pub fn new(config: &ZyfaiApiConfig) -> Self {
        let opportunities = (config.cache_ttl > Duration::ZERO).then(|| {
            Cache::builder()
                .max_capacity(64)
                .time_to_live(config.cache_ttl)
                .build()
        });

        Self {
            pool: ClientPool::new(
                config.base_url.clone(),
                config.timeout,
                config.client_cache_capacity,
            ),
            default_api_key: config.api_key.clone(),
            opportunities,
        }
    }

    /// Client for a call made with `credential` (if any)
    pub fn client(&self, credential: Option<&str>) -> Result<ZyfaiClient, ApiError> {
        let key = credential
            .or(self.default_api_key.as_deref())
            .ok_or_else(ApiError::missing_api_key)?;
        self.pool.client_for(key)
    }

    pub fn pool(&self) -> &ClientPool {
        &self.pool
    }

    pub async fn opportunities(&self, credential: Option<&str>, kind: OpportunityKind) -> ApiResult {
        let client = self.client(credential)?;

        let Some(cache) = &self.opportunities else {
            return client.get_opportunities(kind.path(), kind.chain_id()).await;
        };

        let key = kind.cache_key();
        if let Some(cached) = cache.get(&key).await {
            tracing::debug!(key = %key, "Opportunities cache hit");
            return Ok(cached);
        }

        let response = client.get_opportunities(kind.path(), kind.chain_id()).await?;
        cache.insert(key, response.clone()).await;
        Ok(response)
    }
}
