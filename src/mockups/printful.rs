//! Printful mockup generator: create a task, then poll it until it completes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::provider::{
    http_client, numeric_template, read_json, MockupError, MockupProvider, MockupRequest,
    MockupResult, MockupVendor,
};
use crate::config::VendorKey;

pub struct Printful {
    client: Client,
    api_key: String,
    api_base: String,
    poll_interval: Duration,
    max_polls: u32,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CreatedTask {
    task_key: String,
}

#[derive(Debug, Deserialize)]
struct TaskStatus {
    status: String,
    #[serde(default)]
    mockups: Vec<Mockup>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Mockup {
    mockup_url: String,
}

impl Printful {
    pub fn new(key: &VendorKey, poll_interval: Duration, max_polls: u32) -> Result<Self, MockupError> {
        Ok(Self {
            client: http_client()?,
            api_key: key.api_key.clone(),
            api_base: key.api_base.trim_end_matches('/').to_owned(),
            poll_interval,
            max_polls,
        })
    }

    async fn create_task(&self, req: &MockupRequest) -> Result<String, MockupError> {
        let product_id = numeric_template(req, MockupVendor::Printful)?;
        let body = json!({
            "variant_ids": req.variant_ids,
            "format": "jpg",
            "files": [{
                "placement": req.layer.as_deref().unwrap_or("front"),
                "image_url": req.image_url,
            }],
        });
        let resp = self
            .client
            .post(format!(
                "{}/mockup-generator/create-task/{}",
                self.api_base, product_id
            ))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let created: Envelope<CreatedTask> = read_json(resp, MockupVendor::Printful).await?;
        Ok(created.result.task_key)
    }

    async fn task_status(&self, task_key: &str) -> Result<TaskStatus, MockupError> {
        let resp = self
            .client
            .get(format!("{}/mockup-generator/task", self.api_base))
            .query(&[("task_key", task_key)])
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let status: Envelope<TaskStatus> = read_json(resp, MockupVendor::Printful).await?;
        Ok(status.result)
    }
}

#[async_trait]
impl MockupProvider for Printful {
    fn vendor(&self) -> MockupVendor {
        MockupVendor::Printful
    }

    fn validate(&self, req: &MockupRequest) -> Result<(), MockupError> {
        numeric_template(req, self.vendor())?;
        if req.variant_ids.is_empty() {
            return Err(MockupError::Invalid(
                "printful requires at least one variant id".into(),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self, req), fields(template = %req.template))]
    async fn generate(&self, req: &MockupRequest) -> Result<MockupResult, MockupError> {
        self.validate(req)?;
        let task_key = self.create_task(req).await?;
        debug!(%task_key, "printful task created");

        for attempt in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;
            let task = self.task_status(&task_key).await?;
            match task.status.as_str() {
                "completed" => {
                    debug!(%task_key, attempt, "printful task completed");
                    return Ok(MockupResult {
                        urls: task.mockups.into_iter().map(|m| m.mockup_url).collect(),
                    });
                }
                "failed" => {
                    let message = task.error.unwrap_or_else(|| "mockup task failed".into());
                    warn!(%task_key, %message, "printful task failed");
                    return Err(MockupError::Rejected {
                        vendor: MockupVendor::Printful,
                        message,
                    });
                }
                other => debug!(%task_key, attempt, status = other, "printful task pending"),
            }
        }

        Err(MockupError::Timeout {
            vendor: MockupVendor::Printful,
            polls: self.max_polls,
        })
    }
}
