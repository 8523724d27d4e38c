//! x402 pay-per-call gate
//!
//! Pricing is opt-in per tool name. When the gate is disabled every tool is
//! free. Verification fails closed: missing evidence, facilitator errors and
//! unparsable answers all deny the call with a structured 402 body.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::config::X402Config;
use crate::models::payment::{
    default_pricing, PaymentProof, PaymentRequired, PricingEntry, PricingTable, SettleRequest,
    VerifyMetadata, VerifyRequest,
};
use crate::services::facilitator::FacilitatorClient;

/// Outcome of checking one tool call against the gate
#[derive(Debug, Clone)]
pub enum PaymentDecision {
    /// Gate disabled or tool unpriced
    Free,
    Verified {
        transaction_id: Option<String>,
        payer: String,
    },
    Denied(PaymentRequired),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified {
        transaction_id: Option<String>,
        payer: String,
    },
    MissingProof,
    Failed(String),
}

#[derive(Clone)]
pub struct PaymentGate {
    enabled: bool,
    receiver_address: String,
    facilitator: FacilitatorClient,
    pricing: Arc<RwLock<PricingTable>>,
}

impl PaymentGate {
    pub fn new(config: &X402Config) -> Self {
        Self::with_pricing(config, default_pricing())
    }

    pub fn with_pricing(config: &X402Config, pricing: PricingTable) -> Self {
        let gate = Self {
            enabled: config.enabled,
            receiver_address: config.receiver_address.clone().unwrap_or_default(),
            facilitator: FacilitatorClient::new(&config.facilitator_url),
            pricing: Arc::new(RwLock::new(pricing)),
        };

        if gate.enabled {
            tracing::info!(
                facilitator = %gate.facilitator.base_url(),
                priced_tools = gate.pricing.read().len(),
                "x402 payment gate enabled"
            );
        } else {
            tracing::info!("x402 payment gate disabled (set X402_ENABLED=true to enable)");
        }

        gate
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn facilitator_url(&self) -> &str {
        self.facilitator.base_url()
    }

    /// True iff the gate is enabled and `tool_name` has a price
    pub fn is_priced(&self, tool_name: &str) -> bool {
        self.enabled && self.pricing.read().contains_key(tool_name)
    }

    pub fn pricing_for(&self, tool_name: &str) -> Option<PricingEntry> {
        self.pricing.read().get(tool_name).cloned()
    }

    pub fn all_pricing(&self) -> PricingTable {
        self.pricing.read().clone()
    }

    pub fn priced_tools(&self) -> Vec<String> {
        self.pricing.read().keys().cloned().collect()
    }

    /// Insert or replace the price of a tool, returning the previous entry
    pub fn update_pricing(&self, tool_name: &str, entry: PricingEntry) -> Option<PricingEntry> {
        tracing::info!(
            tool = %tool_name,
            amount = %entry.amount,
            token = %entry.token,
            network = %entry.network,
            "Updated tool pricing"
        );
        self.pricing.write().insert(tool_name.to_string(), entry)
    }

    /// Make a tool free again
    pub fn remove_pricing(&self, tool_name: &str) -> Option<PricingEntry> {
        let removed = self.pricing.write().remove(tool_name);
        if removed.is_some() {
            tracing::info!(tool = %tool_name, "Removed tool pricing");
        }
        removed
    }

    /// Check a tool call. Unpriced tools never touch the facilitator.
    pub async fn authorize(&self, tool_name: &str, proof: &PaymentProof) -> PaymentDecision {
        let Some(entry) = self.enabled.then(|| self.pricing_for(tool_name)).flatten() else {
            return PaymentDecision::Free;
        };

        match self.verify(tool_name, &entry, proof).await {
            Verification::Verified {
                transaction_id,
                payer,
            } => PaymentDecision::Verified {
                transaction_id,
                payer,
            },
            Verification::MissingProof => PaymentDecision::Denied(PaymentRequired::missing_proof(
                &entry,
                self.facilitator_url(),
            )),
            Verification::Failed(reason) => PaymentDecision::Denied(
                PaymentRequired::verification_failed(&entry, self.facilitator_url(), reason),
            ),
        }
    }

    /// Verify payment evidence for one call of `tool_name` priced at `entry`
    pub async fn verify(
        &self,
        tool_name: &str,
        entry: &PricingEntry,
        proof: &PaymentProof,
    ) -> Verification {
        let (Some(payment_proof), Some(signature), Some(payer)) =
            (&proof.proof, &proof.signature, &proof.payer)
        else {
            tracing::info!(tool = %tool_name, "Payment evidence missing");
            return Verification::MissingProof;
        };

        let request = VerifyRequest {
            payment_proof: payment_proof.clone(),
            signature: signature.clone(),
            payer: payer.clone(),
            amount: entry.amount.clone(),
            token: entry.token.clone(),
            network: entry.network.clone(),
            pay_to: self.receiver_address.clone(),
            metadata: VerifyMetadata {
                tool_name: tool_name.to_string(),
                timestamp: Utc::now().timestamp_millis(),
            },
        };

        match self.facilitator.verify(&request).await {
            Ok(response) if response.valid => {
                tracing::info!(
                    tool = %tool_name,
                    payer = %payer,
                    transaction_id = ?response.transaction_id,
                    "Payment verified"
                );
                Verification::Verified {
                    transaction_id: response.transaction_id,
                    payer: payer.clone(),
                }
            }
            Ok(response) => {
                let reason = response
                    .message
                    .unwrap_or_else(|| "Payment proof rejected by facilitator".to_string());
                tracing::info!(tool = %tool_name, payer = %payer, reason = %reason, "Payment rejected");
                Verification::Failed(reason)
            }
            Err(e) => {
                tracing::warn!(tool = %tool_name, error = %e, "Payment verification error");
                Verification::Failed(format!("Facilitator unavailable: {}", e))
            }
        }
    }

    /// Fire-and-forget settlement. `on_settled` runs only when the
    /// facilitator accepted the settlement; failures are logged and dropped.
    pub fn settle<F>(&self, transaction_id: String, tool_name: String, on_settled: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let facilitator = self.facilitator.clone();
        tokio::spawn(async move {
            let request = SettleRequest {
                transaction_id,
                tool_name,
                timestamp: Utc::now().timestamp_millis(),
            };

            match facilitator.settle(&request).await {
                Ok(()) => {
                    tracing::info!(
                        tool = %request.tool_name,
                        transaction_id = %request.transaction_id,
                        "Payment settled"
                    );
                    on_settled();
                }
                Err(e) => {
                    tracing::error!(
                        tool = %request.tool_name,
                        transaction_id = %request.transaction_id,
                        error = %e,
                        "Payment settlement failed"
                    );
                }
            }
        })
    }
}
