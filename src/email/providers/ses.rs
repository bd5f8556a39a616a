use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::email::api::{AwsSesClient, SdkSesTransport, SendRawEmailRequest, SesTag, SesTransport};
use crate::email::helper::raw_value;
use crate::email::{DeliveryBackend, DeliverySystem, EmailError, EmailMessage, Settings};

pub struct AwsSesBackend {
    transport: Arc<dyn SesTransport>,
}

impl AwsSesBackend {
    pub fn new() -> Self {
        Self::with_transport(Arc::new(SdkSesTransport))
    }

    pub fn with_transport(transport: Arc<dyn SesTransport>) -> Self {
        Self { transport }
    }

    /// Builds the `SendRawEmail` payload for `message`. Absent headers stay
    /// `None`.
    pub fn generate_options(&self, message: &EmailMessage) -> SendRawEmailRequest {
        SendRawEmailRequest {
            raw_message_data: message.to_rfc822(),
            tags: vec![SesTag {
                name: message.delivery_handler().to_string(),
                value: raw_value(message.header("tag")).cloned(),
            }],
            configuration_set_name: raw_value(message.header("configuration_set_name")).cloned(),
        }
    }
}

impl Default for AwsSesBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryBackend for AwsSesBackend {
    fn system(&self) -> DeliverySystem {
        DeliverySystem::Ses
    }

    fn name(&self) -> &str {
        "Amazon SES"
    }

    async fn deliver(
        &self,
        settings: &Settings,
        mut message: EmailMessage,
    ) -> Result<EmailMessage, EmailError> {
        let options = self.generate_options(&message);
        let client = AwsSesClient::with_transport(settings, self.transport.clone())?;

        debug!("Sending email via SES to: {:?}", message.to);
        let response = client.send_raw_email(&options).await?;

        match response.message_id {
            Some(message_id) => {
                info!("Email sent via SES. Message ID: {}", message_id);
                message.set_message_id(message_id);
            }
            None => debug!("SES accepted the email without returning a message id"),
        }

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::api::{AwsCredentials, SendRawEmailResponse};
    use crate::email::{AWS_ACCESS_KEY_ID, AWS_DEFAULT_REGION, AWS_SECRET_ACCESS_KEY};
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeSes {
        message_id: Option<String>,
        requests: Mutex<Vec<SendRawEmailRequest>>,
    }

    impl FakeSes {
        fn returning(message_id: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                message_id: message_id.map(str::to_string),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SesTransport for FakeSes {
        async fn send_raw_email(
            &self,
            _credentials: &AwsCredentials,
            request: &SendRawEmailRequest,
        ) -> Result<SendRawEmailResponse, EmailError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(SendRawEmailResponse {
                message_id: self.message_id.clone(),
            })
        }
    }

    fn settings() -> Settings {
        [
            (AWS_ACCESS_KEY_ID, "AKIA"),
            (AWS_DEFAULT_REGION, "eu-west-1"),
            (AWS_SECRET_ACCESS_KEY, "secret"),
        ]
        .into_iter()
        .collect()
    }

    fn message() -> EmailMessage {
        EmailMessage::new("to@example.com", "from@example.com", "Subject")
            .with_delivery_handler("delivery_handler")
            .with_header("delivery_system", "ses")
            .with_header("tag", "tag_value")
            .with_header("configuration_set_name", "test_events_tracking")
            .with_text("Body")
    }

    #[test]
    fn test_generate_options() {
        let message = message();
        let options = AwsSesBackend::new().generate_options(&message);

        assert_eq!(
            options,
            SendRawEmailRequest {
                raw_message_data: message.to_rfc822(),
                tags: vec![SesTag {
                    name: "delivery_handler".to_string(),
                    value: Some(json!("tag_value")),
                }],
                configuration_set_name: Some(json!("test_events_tracking")),
            }
        );
    }

    #[test]
    fn test_generate_options_without_optional_headers() {
        let message = EmailMessage::new("to@example.com", "from@example.com", "Subject");
        let options = AwsSesBackend::new().generate_options(&message);

        assert_eq!(options.tags[0].name, "");
        assert_eq!(options.tags[0].value, None);
        assert_eq!(options.configuration_set_name, None);
    }

    #[test]
    fn test_generate_options_with_cleared_headers() {
        let message = message()
            .with_header("tag", json!(null))
            .with_header("configuration_set_name", json!(null));
        let options = AwsSesBackend::new().generate_options(&message);

        assert_eq!(options.tags[0].value, None);
        assert_eq!(options.configuration_set_name, None);
        assert!(!options.raw_message_data.contains("null"));
    }

    #[tokio::test]
    async fn test_deliver_sets_message_id() {
        let transport = FakeSes::returning(Some("message_id"));
        let backend = AwsSesBackend::with_transport(transport.clone());

        let delivered = backend.deliver(&settings(), message()).await.unwrap();
        assert_eq!(delivered.message_id(), Some("message_id"));

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0], backend.generate_options(&message()));
    }

    #[tokio::test]
    async fn test_deliver_without_message_id_leaves_it_unset() {
        let backend = AwsSesBackend::with_transport(FakeSes::returning(None));

        let delivered = backend.deliver(&settings(), message()).await.unwrap();
        assert_eq!(delivered.message_id(), None);
    }

    #[tokio::test]
    async fn test_deliver_checks_credentials_before_sending() {
        let transport = FakeSes::returning(Some("message_id"));
        let backend = AwsSesBackend::with_transport(transport.clone());

        let result = backend.deliver(&Settings::default(), message()).await;
        assert!(matches!(result, Err(EmailError::MissingCredentials { .. })));
        assert!(transport.requests.lock().unwrap().is_empty());
    }
}
