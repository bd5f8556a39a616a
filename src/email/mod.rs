pub mod api;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod field;
pub mod helper;
pub mod providers;
pub mod types;

pub use config::*;
pub use dispatcher::Dispatcher;
pub use error::*;
pub use field::{CURRENT_FORMAT_VERSION, Field, FieldAccessor};
pub use types::*;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Value of the `delivery_system` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeliverySystem {
    Ses,
    SparkPost,
}

impl DeliverySystem {
    pub const ALL: [DeliverySystem; 2] = [DeliverySystem::Ses, DeliverySystem::SparkPost];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliverySystem::Ses => "ses",
            DeliverySystem::SparkPost => "sparkpost",
        }
    }

    /// Name of the API client the backend delivers through.
    pub fn api_client(&self) -> &'static str {
        match self {
            DeliverySystem::Ses => "AwsSesClient",
            DeliverySystem::SparkPost => "SparkPostClient",
        }
    }
}

impl FromStr for DeliverySystem {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ses" => Ok(DeliverySystem::Ses),
            "sparkpost" => Ok(DeliverySystem::SparkPost),
            _ => Err(EmailError::unsupported_delivery_system()),
        }
    }
}

impl fmt::Display for DeliverySystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait DeliveryBackend: Send + Sync {
    fn system(&self) -> DeliverySystem;
    fn name(&self) -> &str;

    /// Sends `message` and returns it with the remote message id filled in
    /// when the remote service reported one.
    async fn deliver(
        &self,
        settings: &Settings,
        message: EmailMessage,
    ) -> Result<EmailMessage, EmailError>;
}

pub type DynDeliveryBackend = Arc<dyn DeliveryBackend>;

pub fn create_backend(system: DeliverySystem) -> DynDeliveryBackend {
    match system {
        DeliverySystem::Ses => Arc::new(providers::ses::AwsSesBackend::new()),
        DeliverySystem::SparkPost => Arc::new(providers::sparkpost::SparkPostBackend::new()),
    }
}

/// Backends the dispatcher may route to, keyed by delivery system.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: BTreeMap<DeliverySystem, DynDeliveryBackend>,
}

impl BackendRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        DeliverySystem::ALL
            .into_iter()
            .fold(Self::empty(), |registry, system| {
                registry.register(create_backend(system))
            })
    }

    pub fn register(mut self, backend: DynDeliveryBackend) -> Self {
        self.backends.insert(backend.system(), backend);
        self
    }

    pub fn get(&self, system: DeliverySystem) -> Option<DynDeliveryBackend> {
        self.backends.get(&system).cloned()
    }

    pub fn systems(&self) -> impl Iterator<Item = DeliverySystem> + '_ {
        self.backends.keys().copied()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.backends.values().map(|backend| backend.name()))
            .finish()
    }
}
