use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::email::{BackendRegistry, DeliveryBackend, DeliverySystem, EmailError, Field, Settings};

/// Crate an API client needs in order to talk to its remote service.
pub fn dependency_for(client: &str) -> &'static str {
    match client {
        "AwsSesClient" => "aws-sdk-sesv2",
        "SparkPostClient" => "reqwest",
        _ => "unknown",
    }
}

/// Looks up the backend registered for `system`.
pub fn check_backend_available(
    registry: &BackendRegistry,
    system: DeliverySystem,
) -> Result<Arc<dyn DeliveryBackend>, EmailError> {
    registry.get(system).ok_or_else(|| {
        let dependency = dependency_for(system.api_client());
        warn!(
            "No backend registered for delivery system '{}' ({})",
            system, dependency
        );
        EmailError::DeliverySystemNotDefined(dependency.to_string())
    })
}

/// Fails unless every key in `required` has a non-empty value. The error
/// always lists the full `required` set.
pub fn check_credentials(settings: &Settings, required: &[&str]) -> Result<(), EmailError> {
    let complete = required
        .iter()
        .all(|key| settings.get(key).is_some_and(|value| !value.is_empty()));

    if complete {
        Ok(())
    } else {
        Err(EmailError::MissingCredentials {
            required: required.iter().map(|key| key.to_string()).collect(),
        })
    }
}

pub fn raw_value(field: Option<&Field>) -> Option<&Value> {
    field?.raw_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;
    use serde_json::json;

    #[test]
    fn test_dependency_for() {
        assert_eq!(dependency_for("AwsSesClient"), "aws-sdk-sesv2");
        assert_eq!(dependency_for("SparkPostClient"), "reqwest");
        assert_eq!(dependency_for("NotDefined"), "unknown");
    }

    #[test]
    fn test_check_backend_available_on_empty_registry() {
        let registry = BackendRegistry::empty();

        let err = check_backend_available(&registry, DeliverySystem::Ses)
            .err()
            .unwrap();
        assert!(matches!(err, EmailError::DeliverySystemNotDefined(_)));
        assert_eq!(err.to_string(), "Please install aws-sdk-sesv2.");

        let err = check_backend_available(&registry, DeliverySystem::SparkPost)
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Please install reqwest.");
    }

    #[test]
    fn test_check_backend_available_with_defaults() {
        let registry = BackendRegistry::with_defaults();
        let backend = check_backend_available(&registry, DeliverySystem::SparkPost).unwrap();
        assert_eq!(backend.system(), DeliverySystem::SparkPost);
    }

    #[test]
    fn test_check_credentials_missing_key() {
        let settings = Settings::default();
        let err = check_credentials(&settings, &["required_value"]).unwrap_err();

        assert!(matches!(err, EmailError::MissingCredentials { .. }));
        assert_eq!(
            err.to_string(),
            "Please provide all credential values. Required: [required_value]"
        );
    }

    #[test]
    fn test_check_credentials_empty_value() {
        let settings: Settings = [("required_value", "")].into_iter().collect();
        assert!(check_credentials(&settings, &["required_value"]).is_err());
    }

    #[test]
    fn test_check_credentials_present() {
        let settings: Settings = [("required_value", "value")].into_iter().collect();
        assert!(check_credentials(&settings, &["required_value"]).is_ok());
        assert!(check_credentials(&settings, &[]).is_ok());
    }

    #[test]
    fn test_raw_value() {
        assert_eq!(raw_value(None), None);

        for version in [
            Version::new(2, 7, 1),
            Version::new(2, 7, 0),
            Version::new(2, 6, 9),
        ] {
            let field = Field::with_version("metadata", json!({ "website": "test" }), version);
            assert_eq!(raw_value(Some(&field)), Some(&json!({ "website": "test" })));
        }
    }
}
