//! Dynamic Mockups: a single synchronous render call.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::provider::{
    http_client, read_json, require_layer, MockupError, MockupProvider, MockupRequest,
    MockupResult, MockupVendor,
};
use crate::config::VendorKey;

pub struct DynamicMockups {
    client: Client,
    api_key: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    #[serde(default)]
    success: Option<bool>,
    message: Option<String>,
    data: Option<RenderData>,
}

#[derive(Debug, Deserialize)]
struct RenderData {
    export_path: String,
}

impl DynamicMockups {
    pub fn new(key: &VendorKey) -> Result<Self, MockupError> {
        Ok(Self {
            client: http_client()?,
            api_key: key.api_key.clone(),
            api_base: key.api_base.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl MockupProvider for DynamicMockups {
    fn vendor(&self) -> MockupVendor {
        MockupVendor::DynamicMockups
    }

    fn validate(&self, req: &MockupRequest) -> Result<(), MockupError> {
        require_layer(req, self.vendor()).map(|_| ())
    }

    #[instrument(skip(self, req), fields(template = %req.template))]
    async fn generate(&self, req: &MockupRequest) -> Result<MockupResult, MockupError> {
        let smart_object = require_layer(req, self.vendor())?;
        let body = json!({
            "mockup_uuid": req.template,
            "smart_objects": [{
                "uuid": smart_object,
                "asset": {"url": req.image_url},
            }],
        });
        let resp = self
            .client
            .post(format!("{}/renders", self.api_base))
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let render: RenderResponse = read_json(resp, self.vendor()).await?;

        match render {
            RenderResponse {
                success: Some(false),
                message,
                ..
            }
            | RenderResponse {
                data: None,
                message,
                ..
            } => Err(MockupError::Rejected {
                vendor: self.vendor(),
                message: message.unwrap_or_else(|| "render failed".into()),
            }),
            RenderResponse {
                data: Some(data), ..
            } => Ok(MockupResult {
                urls: vec![data.export_path],
            }),
        }
    }
}
