//! x402 payment models
//!
//! Pricing terms, the payment evidence supplied by a caller and the
//! facilitator request/response bodies.

use std::collections::BTreeMap;

use axum::http::HeaderMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PAYMENT_PROOF_HEADER: &str = "x-payment-proof";
pub const PAYMENT_SIGNATURE_HEADER: &str = "x-payment-signature";
pub const PAYER_ADDRESS_HEADER: &str = "x-payer-address";

/// Price of one tool call, amount in the token's smallest unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingEntry {
    pub amount: String,
    pub token: String,
    pub network: String,
}

impl PricingEntry {
    pub fn usdc_on_base(amount: &str) -> Self {
        Self {
            amount: amount.to_string(),
            token: "USDC".to_string(),
            network: "base".to_string(),
        }
    }

    fn decimals(&self) -> u32 {
        if self.token == "USDC" { 6 } else { 18 }
    }

    /// Human readable amount, e.g. `750000` USDC becomes `0.75 USDC`.
    /// Amounts that are not integers are shown verbatim.
    pub fn formatted_amount(&self) -> String {
        match self.amount.trim().parse::<i128>() {
            Ok(units) => match Decimal::try_from_i128_with_scale(units, self.decimals()) {
                Ok(value) => format!("{} {}", value.normalize(), self.token),
                Err(_) => format!("{} {}", self.amount, self.token),
            },
            Err(_) => format!("{} {}", self.amount, self.token),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.token.trim().is_empty()
            && !self.network.trim().is_empty()
            && self.amount.trim().parse::<u128>().is_ok()
    }
}

pub type PricingTable = BTreeMap<String, PricingEntry>;

/// Pricing applied when the gate starts
pub fn default_pricing() -> PricingTable {
    BTreeMap::from([
        (
            "get-multichain-portfolio".to_string(),
            PricingEntry::usdc_on_base("1000000"),
        ),
        (
            "get-user-earnings".to_string(),
            PricingEntry::usdc_on_base("500000"),
        ),
        (
            "get-best-positions".to_string(),
            PricingEntry::usdc_on_base("750000"),
        ),
    ])
}

/// Payment evidence attached to a single tool call. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentProof {
    pub proof: Option<String>,
    pub signature: Option<String>,
    pub payer: Option<String>,
}

impl PaymentProof {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            proof: header(PAYMENT_PROOF_HEADER),
            signature: header(PAYMENT_SIGNATURE_HEADER),
            payer: header(PAYER_ADDRESS_HEADER),
        }
    }

    /// Proof carried in the `_meta` object of `tools/call` params
    pub fn from_meta(meta: Option<&Value>) -> Self {
        let field = |name: &str| {
            meta.and_then(|m| m.get(name))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            proof: field("paymentProof"),
            signature: field("signature"),
            payer: field("payerAddress"),
        }
    }

    /// Header values take precedence, `_meta` fills the gaps
    pub fn or(self, fallback: PaymentProof) -> Self {
        Self {
            proof: self.proof.or(fallback.proof),
            signature: self.signature.or(fallback.signature),
            payer: self.payer.or(fallback.payer),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.proof.is_some() && self.signature.is_some() && self.payer.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyMetadata {
    pub tool_name: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub payment_proof: String,
    pub signature: String,
    pub payer: String,
    pub amount: String,
    pub token: String,
    pub network: String,
    pub pay_to: String,
    pub metadata: VerifyMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    pub transaction_id: String,
    pub tool_name: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingTerms {
    pub amount: String,
    pub token: String,
    pub network: String,
    pub formatted_amount: String,
}

impl From<&PricingEntry> for PricingTerms {
    fn from(entry: &PricingEntry) -> Self {
        Self {
            amount: entry.amount.clone(),
            token: entry.token.clone(),
            network: entry.network.clone(),
            formatted_amount: entry.formatted_amount(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInstructions {
    pub step1: String,
    pub step2: String,
    pub step3: String,
}

impl Default for PaymentInstructions {
    fn default() -> Self {
        Self {
            step1: "Obtain payment proof from your wallet".to_string(),
            step2: "Include X-Payment-Proof, X-Payment-Signature and X-Payer-Address headers (or _meta.paymentProof, _meta.signature, _meta.payerAddress)".to_string(),
            step3: "Retry the tool call".to_string(),
        }
    }
}

/// 402-equivalent body returned as an error tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequired {
    pub error: String,
    pub status: u16,
    pub message: String,
    pub pricing: PricingTerms,
    pub facilitator: String,
    pub instructions: PaymentInstructions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PaymentRequired {
    pub const PAYMENT_REQUIRED: &'static str = "Payment Required";
    pub const VERIFICATION_FAILED: &'static str = "Payment Verification Failed";

    pub fn missing_proof(entry: &PricingEntry, facilitator: &str) -> Self {
        Self::build(Self::PAYMENT_REQUIRED, entry, facilitator, None)
    }

    pub fn verification_failed(entry: &PricingEntry, facilitator: &str, reason: String) -> Self {
        Self::build(Self::VERIFICATION_FAILED, entry, facilitator, Some(reason))
    }

    fn build(error: &str, entry: &PricingEntry, facilitator: &str, reason: Option<String>) -> Self {
        Self {
            error: error.to_string(),
            status: 402,
            message: format!("This tool requires payment of {}", entry.formatted_amount()),
            pricing: PricingTerms::from(entry),
            facilitator: facilitator.to_string(),
            instructions: PaymentInstructions::default(),
            reason,
        }
    }
}
