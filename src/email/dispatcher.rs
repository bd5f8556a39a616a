use serde_json::Value;
use tracing::debug;

use crate::email::helper::{check_backend_available, raw_value};
use crate::email::{
    BackendRegistry, DeliverySystem, EmailError, EmailMessage, MailerConfig, Settings,
};

pub const DELIVERY_SYSTEM_HEADER: &str = "delivery_system";

/// Routes each message to the backend named by its `delivery_system` header.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    settings: Settings,
    registry: BackendRegistry,
}

impl Dispatcher {
    pub fn new(config: &MailerConfig) -> Self {
        Self::with_overrides(config, std::iter::empty::<(String, String)>())
    }

    /// Seeds settings from `config`, then applies `overrides` on top.
    pub fn with_overrides<I, K, V>(config: &MailerConfig, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            settings: Settings::from_config(config).merge(overrides),
            registry: BackendRegistry::with_defaults(),
        }
    }

    pub fn with_registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn delivery_system(message: &EmailMessage) -> Result<DeliverySystem, EmailError> {
        match raw_value(message.header(DELIVERY_SYSTEM_HEADER)) {
            None => Err(EmailError::missing_delivery_system()),
            Some(Value::String(selector)) => selector.parse(),
            Some(_) => Err(EmailError::unsupported_delivery_system()),
        }
    }

    pub async fn deliver(&self, message: EmailMessage) -> Result<EmailMessage, EmailError> {
        let system = Self::delivery_system(&message)?;
        let backend = check_backend_available(&self.registry, system)?;

        debug!("Dispatching email to {} via {}", system, backend.name());
        backend.deliver(&self.settings, message).await
    }
}
