use thiserror::Error;
use tracing::{error, info, warn};

use crate::email::api::{AwsSesClient, SparkPostClient};
use crate::email::helper::check_credentials;
use crate::email::{DeliverySystem, Dispatcher};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("No delivery backend is ready to send")]
    NoUsableBackend,

    #[error("Credentials for '{system}' are incomplete. Required: [{}]", .required.join(", "))]
    MissingCredentials {
        system: DeliverySystem,
        required: Vec<String>,
    },

    #[error("SparkPost endpoint is misconfigured: {0}")]
    SparkPostEndpoint(String),
}

impl StartupCheckError {
    /// Whether the dispatcher can still deliver through some backend.
    pub fn is_critical(&self) -> bool {
        matches!(self, StartupCheckError::NoUsableBackend)
    }
}

pub fn required_settings(system: DeliverySystem) -> &'static [&'static str] {
    match system {
        DeliverySystem::Ses => &AwsSesClient::REQUIRED_SETTINGS,
        DeliverySystem::SparkPost => &SparkPostClient::REQUIRED_SETTINGS,
    }
}

/// Checks every registered backend for usable settings. Returns the systems
/// that are ready to deliver, or every problem found.
pub fn perform_startup_checks(
    dispatcher: &Dispatcher,
) -> Result<Vec<DeliverySystem>, Vec<StartupCheckError>> {
    let mut errors = Vec::new();
    let mut ready = Vec::new();

    info!("Performing startup checks...");

    let systems: Vec<DeliverySystem> = dispatcher.registry().systems().collect();
    if systems.is_empty() {
        error!("No delivery backends are registered");
        return Err(vec![StartupCheckError::NoUsableBackend]);
    }

    for system in systems {
        let required = required_settings(system);
        if check_credentials(dispatcher.settings(), required).is_err() {
            warn!("Credentials for '{}' are incomplete", system);
            errors.push(StartupCheckError::MissingCredentials {
                system,
                required: required.iter().map(|key| key.to_string()).collect(),
            });
            continue;
        }
        info!("Credentials for '{}' are present", system);

        if system == DeliverySystem::SparkPost {
            let endpoint = SparkPostClient::new(dispatcher.settings())
                .and_then(|client| client.endpoint());
            match endpoint {
                Ok(endpoint) => info!("SparkPost endpoint: {}", endpoint.base_url),
                Err(e) => {
                    error!("SparkPost endpoint is misconfigured: {}", e);
                    errors.push(StartupCheckError::SparkPostEndpoint(e.to_string()));
                    continue;
                }
            }
        }

        ready.push(system);
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(ready)
    } else {
        warn!("Startup checks found {} problem(s)", errors.len());
        if ready.is_empty() {
            errors.push(StartupCheckError::NoUsableBackend);
        }
        Err(errors)
    }
}
