//! Payment vendor client. Only payment-intent creation lives here; the vendor
//! owns the rest of the payment lifecycle.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::StripeConfig;

#[derive(Debug, Error)]
pub enum PaymentError {
    /// The vendor answered with an error; carries the vendor's message.
    #[error("{0}")]
    Rejected(String),

    #[error("payment vendor unreachable: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment intent for `amount` in the smallest currency unit.
    async fn create_intent(&self, amount: i64) -> Result<PaymentIntent, PaymentError>;
}

pub struct StripeGateway {
    client: Client,
    secret_key: String,
    api_base: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct IntentBody {
    id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl StripeGateway {
    pub fn new(cfg: &StripeConfig) -> Result<Self, PaymentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            secret_key: cfg.secret_key.clone(),
            api_base: cfg.api_base.trim_end_matches('/').to_owned(),
            currency: cfg.currency.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self))]
    async fn create_intent(&self, amount: i64) -> Result<PaymentIntent, PaymentError> {
        let amount = amount.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", self.currency.as_str()),
            ("automatic_payment_methods[enabled]", "true"),
        ];
        let resp = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message.or(e.error.kind))
                .unwrap_or_else(|| format!("payment vendor returned HTTP {status}"));
            return Err(PaymentError::Rejected(message));
        }

        let intent: IntentBody = serde_json::from_str(&body)
            .map_err(|e| PaymentError::Rejected(format!("unreadable payment intent: {e}")))?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| PaymentError::Rejected("payment intent has no client secret".into()))?;

        debug!(intent_id = %intent.id, "payment intent created");
        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
        })
    }
}
