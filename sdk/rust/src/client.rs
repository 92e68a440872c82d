use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyItemRequest {
    pub item_id: String,
    pub payment_intent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyPurchaseRequest {
    pub product_id: String,
    pub payment_intent_id: String,
    pub buyer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Confirmed,
    Pending,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResponse {
    pub status: VerificationStatus,
    pub attempts: u32,
    pub message: String,
}

impl VerificationResponse {
    pub fn is_confirmed(&self) -> bool {
        self.status == VerificationStatus::Confirmed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub struct VerifierClient {
    client: Client,
    base_url: String,
}

impl VerifierClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Wait for an item to be marked sold to `payment_intent_id`.
    pub async fn verify_item(&self, req: &VerifyItemRequest) -> Result<VerificationResponse, Box<dyn std::error::Error>> {
        let resp = self
            .client
            .post(format!("{}/api/v1/verify/item", self.base_url))
            .json(req)
            .send()
            .await?;
        decode(resp, true).await
    }

    /// Wait for a purchase record matching all three identifiers.
    pub async fn verify_purchase(
        &self,
        req: &VerifyPurchaseRequest,
    ) -> Result<VerificationResponse, Box<dyn std::error::Error>> {
        let resp = self
            .client
            .post(format!("{}/api/v1/verify/purchase", self.base_url))
            .json(req)
            .send()
            .await?;
        decode(resp, true).await
    }

    /// Single check of an item, no polling.
    pub async fn item_status(
        &self,
        item_id: &str,
        payment_intent_id: &str,
    ) -> Result<VerificationResponse, Box<dyn std::error::Error>> {
        let resp = self
            .client
            .get(format!("{}/api/v1/status/item/{}", self.base_url, item_id))
            .query(&[("payment_intent_id", payment_intent_id)])
            .send()
            .await?;
        decode(resp, false).await
    }

    /// Single check for a purchase record, no polling.
    pub async fn purchase_status(
        &self,
        product_id: &str,
        payment_intent_id: &str,
        buyer_id: &str,
    ) -> Result<VerificationResponse, Box<dyn std::error::Error>> {
        let resp = self
            .client
            .get(format!("{}/api/v1/status/purchase", self.base_url))
            .query(&[
                ("product_id", product_id),
                ("payment_intent_id", payment_intent_id),
                ("buyer_id", buyer_id),
            ])
            .send()
            .await?;
        decode(resp, false).await
    }

    pub async fn health(&self) -> Result<HealthResponse, Box<dyn std::error::Error>> {
        let resp = self.client.get(format!("{}/health", self.base_url)).send().await?;
        decode(resp, false).await
    }
}

/// Decode a JSON body. A cancelled verification answers 503 with a regular
/// verification body, so `allow_unavailable` accepts that status too.
async fn decode<T: DeserializeOwned>(
    resp: reqwest::Response,
    allow_unavailable: bool,
) -> Result<T, Box<dyn std::error::Error>> {
    let status = resp.status();
    let text = resp.text().await?;

    let accepted = status.is_success() || (allow_unavailable && status == reqwest::StatusCode::SERVICE_UNAVAILABLE);
    if !accepted {
        return Err(format!("Verifier returned error status {}: {}", status, text).into());
    }

    Ok(serde_json::from_str::<T>(&text)?)
}
