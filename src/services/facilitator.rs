//! HTTP client for the x402 payment facilitator

use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::error::FacilitatorError;
use crate::models::payment::{SettleRequest, VerifyRequest, VerifyResponse};

const FACILITATOR_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct FacilitatorClient {
    base_url: String,
    verify_url: String,
    settle_url: String,
    client: Client,
}

impl FacilitatorClient {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            verify_url: format!("{}/verify", base_url),
            settle_url: format!("{}/settle", base_url),
            base_url,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, FacilitatorError> {
        let response = self
            .post_json(&self.verify_url, "POST /verify", request)
            .await?;
        response
            .json::<VerifyResponse>()
            .await
            .map_err(|e| FacilitatorError::JsonDeserialization {
                context: "POST /verify",
                source: e,
            })
    }

    /// Settlement response bodies are not inspected; any 2xx counts
    pub async fn settle(&self, request: &SettleRequest) -> Result<(), FacilitatorError> {
        self.post_json(&self.settle_url, "POST /settle", request)
            .await?;
        Ok(())
    }

    async fn post_json<T>(
        &self,
        url: &str,
        context: &'static str,
        payload: &T,
    ) -> Result<reqwest::Response, FacilitatorError>
    where
        T: serde::Serialize + ?Sized,
    {
        let response = self
            .client
            .post(url)
            .json(payload)
            .timeout(FACILITATOR_TIMEOUT)
            .send()
            .await
            .map_err(|e| FacilitatorError::Http { context, source: e })?;

        handle_status(response, context).await
    }
}

async fn handle_status(
    response: reqwest::Response,
    context: &'static str,
) -> Result<reqwest::Response, FacilitatorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(_) => status
            .canonical_reason()
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR.as_str())
            .to_string(),
    };
    Err(FacilitatorError::HttpStatus {
        context,
        status,
        body,
    })
}
