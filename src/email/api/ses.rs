use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sesv2::{
    Client,
    config::{Credentials, Region},
    primitives::Blob,
    types::{EmailContent, MessageTag, RawMessage},
};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

use crate::email::api::value_text;
use crate::email::helper::check_credentials;
use crate::email::{
    AWS_ACCESS_KEY_ID, AWS_DEFAULT_REGION, AWS_SECRET_ACCESS_KEY, EmailError, Settings,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendRawEmailRequest {
    pub raw_message_data: String,
    pub tags: Vec<SesTag>,
    pub configuration_set_name: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SesTag {
    pub name: String,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendRawEmailResponse {
    pub message_id: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

#[async_trait]
pub trait SesTransport: Send + Sync {
    async fn send_raw_email(
        &self,
        credentials: &AwsCredentials,
        request: &SendRawEmailRequest,
    ) -> Result<SendRawEmailResponse, EmailError>;
}

/// Talks to SES v2 through the AWS SDK, one client per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SdkSesTransport;

impl SdkSesTransport {
    async fn client(credentials: &AwsCredentials) -> Client {
        let credentials_provider = Credentials::new(
            &credentials.access_key_id,
            &credentials.secret_access_key,
            None,
            None,
            "relaymail-ses-client",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(credentials.region.clone()))
            .credentials_provider(credentials_provider)
            .load()
            .await;

        Client::new(&aws_config)
    }
}

#[async_trait]
impl SesTransport for SdkSesTransport {
    async fn send_raw_email(
        &self,
        credentials: &AwsCredentials,
        request: &SendRawEmailRequest,
    ) -> Result<SendRawEmailResponse, EmailError> {
        let client = Self::client(credentials).await;

        let raw_message = RawMessage::builder()
            .data(Blob::new(request.raw_message_data.clone().into_bytes()))
            .build()
            .map_err(|e| EmailError::InvalidPayload(e.to_string()))?;

        let mut send_email_builder = client
            .send_email()
            .content(EmailContent::builder().raw(raw_message).build());

        // SES rejects tags without a name or value.
        for tag in &request.tags {
            let Some(value) = tag.value.as_ref().map(value_text) else {
                debug!("Skipping SES tag '{}' without a value", tag.name);
                continue;
            };
            if tag.name.is_empty() {
                debug!("Skipping SES tag without a name");
                continue;
            }

            let message_tag = MessageTag::builder()
                .name(&tag.name)
                .value(value)
                .build()
                .map_err(|e| EmailError::InvalidPayload(e.to_string()))?;
            send_email_builder = send_email_builder.email_tags(message_tag);
        }

        if let Some(name) = request.configuration_set_name.as_ref().map(value_text) {
            send_email_builder = send_email_builder.configuration_set_name(name);
        }

        match send_email_builder.send().await {
            Ok(output) => Ok(SendRawEmailResponse {
                message_id: output.message_id().map(str::to_string),
            }),
            Err(e) => {
                error!("Failed to send raw email via SES: {}", e);
                Err(EmailError::AwsError(e.to_string()))
            }
        }
    }
}

pub struct AwsSesClient {
    settings: Settings,
    transport: Arc<dyn SesTransport>,
}

impl AwsSesClient {
    pub const REQUIRED_SETTINGS: [&'static str; 3] =
        [AWS_ACCESS_KEY_ID, AWS_DEFAULT_REGION, AWS_SECRET_ACCESS_KEY];

    pub fn new(settings: &Settings) -> Result<Self, EmailError> {
        Self::with_transport(settings, Arc::new(SdkSesTransport))
    }

    pub fn with_transport(
        settings: &Settings,
        transport: Arc<dyn SesTransport>,
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

    pub fn credentials(&self) -> AwsCredentials {
        let read = |key: &str| self.settings.get(key).unwrap_or_default().to_string();

        AwsCredentials {
            access_key_id: read(AWS_ACCESS_KEY_ID),
            secret_access_key: read(AWS_SECRET_ACCESS_KEY),
            region: read(AWS_DEFAULT_REGION),
        }
    }

    pub async fn send_raw_email(
        &self,
        request: &SendRawEmailRequest,
    ) -> Result<SendRawEmailResponse, EmailError> {
        self.transport
            .send_raw_email(&self.credentials(), request)
            .await
    }
}
