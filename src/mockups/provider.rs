//! Shared contract for the mockup vendors: submit a design URL, get back
//! rendered preview URLs.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{dynamic_mockups::DynamicMockups, mediamodifier::Mediamodifier, printful::Printful};
use crate::config::MockupConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockupVendor {
    Printful,
    DynamicMockups,
    Mediamodifier,
}

impl MockupVendor {
    pub fn as_str(self) -> &'static str {
        match self {
            MockupVendor::Printful => "printful",
            MockupVendor::DynamicMockups => "dynamic_mockups",
            MockupVendor::Mediamodifier => "mediamodifier",
        }
    }
}

impl fmt::Display for MockupVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a vendor needs to render one design.
///
/// `template` is the vendor's product/template identifier; `layer` names the
/// placement or smart-object slot the design goes into. `variant_ids` is only
/// read by Printful.
#[derive(Debug, Clone)]
pub struct MockupRequest {
    pub image_url: String,
    pub template: String,
    pub layer: Option<String>,
    pub variant_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockupResult {
    pub urls: Vec<String>,
}

#[derive(Debug, Error)]
pub enum MockupError {
    /// The request cannot be sent as given (bad template, missing layer).
    #[error("{0}")]
    Invalid(String),

    #[error("{vendor}: {message}")]
    Rejected {
        vendor: MockupVendor,
        message: String,
    },

    #[error("{vendor} did not finish after {polls} polls")]
    Timeout { vendor: MockupVendor, polls: u32 },

    #[error("mockup vendor unreachable: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait MockupProvider: Send + Sync {
    fn vendor(&self) -> MockupVendor;

    /// Checks the request shape without calling the vendor. `image_url` is
    /// not inspected, so this can run before the design is stored.
    fn validate(&self, _req: &MockupRequest) -> Result<(), MockupError> {
        Ok(())
    }

    async fn generate(&self, req: &MockupRequest) -> Result<MockupResult, MockupError>;
}

pub(super) fn http_client() -> Result<Client, MockupError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .user_agent("printpack/0.1")
        .build()?)
}

pub(super) fn numeric_template(
    req: &MockupRequest,
    vendor: MockupVendor,
) -> Result<i64, MockupError> {
    req.template.parse().map_err(|_| {
        MockupError::Invalid(format!(
            "{vendor} template must be numeric, got {:?}",
            req.template
        ))
    })
}

pub(super) fn require_layer(req: &MockupRequest, vendor: MockupVendor) -> Result<&str, MockupError> {
    req.layer
        .as_deref()
        .filter(|l| !l.is_empty())
        .ok_or_else(|| MockupError::Invalid(format!("{vendor} requires a layer id")))
}

/// Decodes a vendor response, turning non-2xx statuses into
/// [`MockupError::Rejected`] with the best message the body offers.
pub(super) async fn read_json<T: DeserializeOwned>(
    resp: Response,
    vendor: MockupVendor,
) -> Result<T, MockupError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| error_message(&v))
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(MockupError::Rejected { vendor, message });
    }
    serde_json::from_str(&body).map_err(|e| MockupError::Rejected {
        vendor,
        message: format!("unreadable response: {e}"),
    })
}

pub(super) fn error_message(v: &Value) -> Option<String> {
    ["/error/message", "/message", "/error", "/result"]
        .iter()
        .find_map(|p| v.pointer(p).and_then(Value::as_str))
        .map(str::to_owned)
}

/// Configured vendors, keyed by name.
#[derive(Default)]
pub struct MockupRegistry {
    providers: BTreeMap<MockupVendor, Arc<dyn MockupProvider>>,
}

impl MockupRegistry {
    pub fn from_config(cfg: &MockupConfig) -> Result<Self, MockupError> {
        let mut registry = Self::default();
        if let Some(key) = &cfg.printful {
            registry = registry.with(Arc::new(Printful::new(
                key,
                Duration::from_millis(cfg.poll_interval_ms),
                cfg.max_polls,
            )?));
        }
        if let Some(key) = &cfg.dynamic_mockups {
            registry = registry.with(Arc::new(DynamicMockups::new(key)?));
        }
        if let Some(key) = &cfg.mediamodifier {
            registry = registry.with(Arc::new(Mediamodifier::new(key)?));
        }
        Ok(registry)
    }

    pub fn with(mut self, provider: Arc<dyn MockupProvider>) -> Self {
        self.providers.insert(provider.vendor(), provider);
        self
    }

    pub fn get(&self, vendor: MockupVendor) -> Option<Arc<dyn MockupProvider>> {
        self.providers.get(&vendor).cloned()
    }

    pub fn vendors(&self) -> Vec<MockupVendor> {
        self.providers.keys().copied().collect()
    }
}
