//! Zyfai DeFi API envelope and error models
//!
//! Upstream payloads are passed through untouched as JSON; only the envelope
//! around them and the normalized error shape are typed here.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Uniform success envelope returned by every upstream call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Normalized upstream failure
///
/// Every transport, status and decoding failure talking to the upstream API
/// ends up in this shape so tool handlers can report it uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message} ({code})")]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    pub const MISSING_API_KEY: &'static str = "MISSING_API_KEY";
    pub const TIMEOUT: &'static str = "TIMEOUT";
    pub const CONNECTION_ERROR: &'static str = "CONNECTION_ERROR";
    pub const INVALID_RESPONSE: &'static str = "INVALID_RESPONSE";
    pub const INVALID_ARGUMENT: &'static str = "INVALID_ARGUMENT";
    pub const UNKNOWN_ERROR: &'static str = "UNKNOWN_ERROR";

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn missing_api_key() -> Self {
        Self::new(
            Self::MISSING_API_KEY,
            "No Zyfai API key configured: set ZYFAI_API_KEY or send X-Zyfai-Api-Key",
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_ARGUMENT, message)
    }

    /// Error code derived from a non-success upstream HTTP status
    pub fn http_status_code(status: u16) -> String {
        format!("HTTP_{}", status)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        let code = if e.is_timeout() {
            Self::TIMEOUT
        } else if e.is_connect() {
            Self::CONNECTION_ERROR
        } else if e.is_decode() {
            Self::INVALID_RESPONSE
        } else {
            Self::UNKNOWN_ERROR
        };
        Self::new(code, e.to_string())
    }
}

/// Chains accepted by the chain-scoped endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedChain {
    Base,
    Arbitrum,
    Plasma,
}

impl SupportedChain {
    pub const ALL: [SupportedChain; 3] = [Self::Base, Self::Arbitrum, Self::Plasma];

    pub fn id(self) -> u64 {
        match self {
            Self::Base => 8453,
            Self::Arbitrum => 42161,
            Self::Plasma => 9745,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Base => "Base",
            Self::Arbitrum => "Arbitrum",
            Self::Plasma => "Plasma",
        }
    }

    pub fn from_id(chain_id: u64) -> Result<Self, ApiError> {
        Self::ALL
            .into_iter()
            .find(|c| c.id() == chain_id)
            .ok_or_else(|| {
                let supported: Vec<String> = Self::ALL
                    .iter()
                    .map(|c| format!("{} for {}", c.id(), c.name()))
                    .collect();
                ApiError::invalid_argument(format!(
                    "Unsupported chain ID {} (supported: {})",
                    chain_id,
                    supported.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_chain_lookup() {
        assert_eq!(SupportedChain::from_id(8453).unwrap(), SupportedChain::Base);
        assert_eq!(SupportedChain::from_id(42161).unwrap(), SupportedChain::Arbitrum);
        assert_eq!(SupportedChain::from_id(9745).unwrap(), SupportedChain::Plasma);
    }

    #[test]
    fn test_unsupported_chain_names_alternatives() {
        let err = SupportedChain::from_id(1).unwrap_err();
        assert_eq!(err.code, ApiError::INVALID_ARGUMENT);
        assert!(err.message.contains("8453 for Base"));
        assert!(err.message.contains("9745 for Plasma"));
    }

    #[test]
    fn test_api_error_serializes_without_empty_details() {
        let json = serde_json::to_value(ApiError::new("HTTP_404", "not found")).unwrap();
        assert_eq!(json["code"], "HTTP_404");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_api_error_display_and_source() {
        let err = ApiError::missing_api_key();
        assert!(err.to_string().ends_with("(MISSING_API_KEY)"));

        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }
}
