//! Remote Classifier Client.
//!
//! POSTs `{"url": ...}` to the configured endpoint and reads `{"decision": ...}`
//! back. Every failure is reported as `Classification::Unavailable` so the
//! pipeline can fail open.

use crate::config::Config;
use crate::engine::types::Decision;
use crate::engine::{Classification, Classifier};
use crate::error::ClassifierError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    decision: Option<String>,
}

pub struct HttpClassifier {
    client: Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration, user_agent: &str) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        let classifier = &config.classifier;
        Self::new(
            classifier.endpoint.clone(),
            config.classifier_timeout(),
            &classifier.user_agent,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, url: &str) -> Result<Decision, ClassifierError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&ClassifyRequest { url })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClassifierError::Status(status.as_u16()));
        }

        let body = resp.bytes().await?;
        let parsed: ClassifyResponse = serde_json::from_slice(&body)
            .map_err(|e| ClassifierError::MalformedBody(e.to_string()))?;

        Ok(Decision::from_lenient(parsed.decision.as_deref()))
    }
}

#[async_trait::async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, url: &str) -> Classification {
        match self.request(url).await {
            Ok(decision) => {
                debug!("Classifier answered {} for {}", decision, url);
                Classification::Decided(decision)
            }
            Err(e) => {
                warn!("Classifier unavailable for {}: {}", url, e);
                Classification::Unavailable(e)
            }
        }
    }
}
