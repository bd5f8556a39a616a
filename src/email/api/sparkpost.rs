use async_trait::async_trait;
use reqwest::{Client, header::AUTHORIZATION};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};
use url::Url;

use crate::email::helper::check_credentials;
use crate::email::{EmailError, SPARKPOST_API_KEY, SPARKPOST_API_URL, Settings};

pub const DEFAULT_API_URL: &str = "https://api.sparkpost.com";
const TRANSMISSIONS_PATH: &str = "api/v1/transmissions";

/// Body of `POST /api/v1/transmissions` for RFC 822 content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transmission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<Value>,
    pub content: TransmissionContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub recipients: Vec<Recipient>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransmissionContent {
    pub email_rfc822: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipient {
    pub address: RecipientAddress,
    pub tags: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipientAddress {
    pub email: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct SparkPostEndpoint {
    pub api_key: String,
    pub base_url: Url,
}

impl fmt::Debug for SparkPostEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparkPostEndpoint")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

#[async_trait]
pub trait SparkPostTransport: Send + Sync {
    /// Returns the decoded response body untouched.
    async fn create_transmission(
        &self,
        endpoint: &SparkPostEndpoint,
        transmission: &Transmission,
    ) -> Result<Value, EmailError>;
}

pub struct HttpSparkPostTransport {
    client: Client,
}

impl HttpSparkPostTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpSparkPostTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SparkPostTransport for HttpSparkPostTransport {
    async fn create_transmission(
        &self,
        endpoint: &SparkPostEndpoint,
        transmission: &Transmission,
    ) -> Result<Value, EmailError> {
        let url = endpoint
            .base_url
            .join(TRANSMISSIONS_PATH)
            .map_err(|e| EmailError::Config(format!("Invalid SparkPost API URL: {}", e)))?;

        debug!(
            "Creating SparkPost transmission at {} for {} recipient(s)",
            url,
            transmission.recipients.len()
        );

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, &endpoint.api_key)
            .json(transmission)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = error_message(&body);
            error!("SparkPost API error ({}): {}", status, message);
            return Err(EmailError::SparkPostApi {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

// SparkPost reports failures as {"errors": [{"message": ..., "description": ...}]}.
fn error_message(body: &str) -> String {
    let messages: Vec<String> = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("errors").and_then(Value::as_array).cloned())
        .unwrap_or_default()
        .iter()
        .filter_map(|error| {
            let message = error.get("message").and_then(Value::as_str)?;
            Some(match error.get("description").and_then(Value::as_str) {
                Some(description) => format!("{}: {}", message, description),
                None => message.to_string(),
            })
        })
        .collect();

    if messages.is_empty() {
        body.to_string()
    } else {
        messages.join("; ")
    }
}

pub struct SparkPostClient {
    settings: Settings,
    transport: Arc<dyn SparkPostTransport>,
}

impl SparkPostClient {
    pub const REQUIRED_SETTINGS: [&'static str; 1] = [SPARKPOST_API_KEY];

    pub fn new(settings: &Settings) -> Result<Self, EmailError> {
        Self::with_transport(settings, Arc::new(HttpSparkPostTransport::new()))
    }

    pub fn with_transport(
        settings: &Settings,
        transport: Arc<dyn SparkPostTransport>,
    ) -> Result<Self, EmailError> {
        check_credentials(settings, &Self::REQUIRED_SETTINGS)?;

        Ok(Self {
            settings: settings.clone(),
            transport,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// API key plus base URL, taken from `sparkpost_api_url` when set.
    pub fn endpoint(&self) -> Result<SparkPostEndpoint, EmailError> {
        let base_url = self
            .settings
            .get(SPARKPOST_API_URL)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_URL);

        let base_url = Url::parse(base_url)
            .map_err(|e| EmailError::Config(format!("Invalid SparkPost API URL: {}", e)))?;

        Ok(SparkPostEndpoint {
            api_key: self
                .settings
                .get(SPARKPOST_API_KEY)
                .unwrap_or_default()
                .to_string(),
            base_url,
        })
    }

    pub async fn create_transmission(
        &self,
        transmission: &Transmission,
    ) -> Result<Value, EmailError> {
        let endpoint = self.endpoint()?;
        self.transport
            .create_transmission(&endpoint, transmission)
            .await
    }
}
