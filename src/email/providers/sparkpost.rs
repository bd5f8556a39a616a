use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::email::api::{
    HttpSparkPostTransport, Recipient, RecipientAddress, SparkPostClient, SparkPostTransport,
    Transmission, TransmissionContent,
};
use crate::email::helper::raw_value;
use crate::email::{DeliveryBackend, DeliverySystem, EmailError, EmailMessage, Settings};

pub struct SparkPostBackend {
    transport: Arc<dyn SparkPostTransport>,
}

impl SparkPostBackend {
    pub fn new() -> Self {
        Self::with_transport(Arc::new(HttpSparkPostTransport::new()))
    }

    pub fn with_transport(transport: Arc<dyn SparkPostTransport>) -> Self {
        Self { transport }
    }

    pub fn generate_options(&self, message: &EmailMessage) -> Transmission {
        Transmission {
            options: raw_value(message.header("options")).cloned(),
            campaign_id: raw_value(message.header("tag")).cloned(),
            content: TransmissionContent {
                email_rfc822: message.to_rfc822(),
            },
            metadata: raw_value(message.header("metadata")).cloned(),
            recipients: self.recipients_from(message),
        }
    }

    /// One entry per `to` address, all carrying the message's tag.
    pub fn recipients_from(&self, message: &EmailMessage) -> Vec<Recipient> {
        let tags: Vec<Value> = raw_value(message.header("tag")).cloned().into_iter().collect();

        message
            .to
            .iter()
            .map(|email| Recipient {
                address: RecipientAddress {
                    email: email.clone(),
                },
                tags: tags.clone(),
            })
            .collect()
    }
}

impl Default for SparkPostBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn transmission_id(response: &Value) -> Option<String> {
    let id = response
        .pointer("/results/id")
        .or_else(|| response.get("id"))?;

    match id {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[async_trait]
impl DeliveryBackend for SparkPostBackend {
    fn system(&self) -> DeliverySystem {
        DeliverySystem::SparkPost
    }

    fn name(&self) -> &str {
        "SparkPost"
    }

    async fn deliver(
        &self,
        settings: &Settings,
        mut message: EmailMessage,
    ) -> Result<EmailMessage, EmailError> {
        let transmission = self.generate_options(&message);
        let client = SparkPostClient::with_transport(settings, self.transport.clone())?;

        debug!("Sending email via SparkPost to: {:?}", message.to);
        let response = client.create_transmission(&transmission).await?;

        match transmission_id(&response) {
            Some(message_id) => {
                info!("Email sent via SparkPost. Transmission ID: {}", message_id);
                message.set_message_id(message_id);
            }
            None => debug!("SparkPost response carried no transmission id: {}", response),
        }

        Ok(message)
    }
}
