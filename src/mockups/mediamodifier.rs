//! Mediamodifier mockup API: one render call that answers with the image URL.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::provider::{
    http_client, numeric_template, read_json, require_layer, MockupError, MockupProvider,
    MockupRequest, MockupResult, MockupVendor,
};
use crate::config::VendorKey;

pub struct Mediamodifier {
    client: Client,
    api_key: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    success: bool,
    url: Option<String>,
    message: Option<String>,
}

impl Mediamodifier {
    pub fn new(key: &VendorKey) -> Result<Self, MockupError> {
        Ok(Self {
            client: http_client()?,
            api_key: key.api_key.clone(),
            api_base: key.api_base.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl MockupProvider for Mediamodifier {
    fn vendor(&self) -> MockupVendor {
        MockupVendor::Mediamodifier
    }

    fn validate(&self, req: &MockupRequest) -> Result<(), MockupError> {
        numeric_template(req, self.vendor())?;
        require_layer(req, self.vendor()).map(|_| ())
    }

    #[instrument(skip(self, req), fields(template = %req.template))]
    async fn generate(&self, req: &MockupRequest) -> Result<MockupResult, MockupError> {
        let nr = numeric_template(req, self.vendor())?;
        let layer = require_layer(req, self.vendor())?;
        let body = json!({
            "nr": nr,
            "layer_inputs": [{
                "id": layer,
                "data": req.image_url,
                "checked": true,
            }],
        });
        let resp = self
            .client
            .post(format!("{}/mockups/render", self.api_base))
            .header("api_key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let render: RenderResponse = read_json(resp, self.vendor()).await?;

        match (render.success, render.url) {
            (true, Some(url)) => Ok(MockupResult { urls: vec![url] }),
            _ => Err(MockupError::Rejected {
                vendor: self.vendor(),
                message: render.message.unwrap_or_else(|| "render failed".into()),
            }),
        }
    }
}
