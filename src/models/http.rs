//! REST response bodies for the non-MCP routes

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::payment::PricingTerms;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: &str) -> Self {
        Self {
            error: error.into(),
            code: Some(code.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResponse {
    pub enabled: bool,
    pub facilitator: String,
    pub pricing: BTreeMap<String, PricingTerms>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingUpdateResponse {
    pub tool_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<PricingTerms>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<PricingTerms>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentGateStatus {
    pub enabled: bool,
    pub priced_tools: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSummary {
    pub total: usize,
    pub categories: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub transport: String,
    pub active_sessions: usize,
    pub payment_gate: PaymentGateStatus,
    pub tools: ToolSummary,
}
