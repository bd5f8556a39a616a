use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub mod email;
pub mod startup_checks;

use email::{Dispatcher, MailerConfig, SPARKPOST_API_URL};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml_edit::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub sparkpost: SparkPostConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

/// Credentials from the config file. Each one that is set wins over the
/// matching environment variable.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub aws_access_key_id: Option<String>,
    #[serde(default)]
    pub aws_default_region: Option<String>,
    #[serde(default)]
    pub aws_secret_access_key: Option<String>,
    #[serde(default)]
    pub sparkpost_api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SparkPostConfig {
    #[serde(default)]
    pub api_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "relaymail".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml_edit::de::from_str::<Config>(&content)?)
    }

    /// Applies the file's credentials on top of `base`.
    pub fn mailer_config(&self, mut base: MailerConfig) -> MailerConfig {
        let credentials = &self.credentials;
        base.configure(|config| {
            let fields = [
                (&mut config.aws_access_key_id, &credentials.aws_access_key_id),
                (&mut config.aws_default_region, &credentials.aws_default_region),
                (
                    &mut config.aws_secret_access_key,
                    &credentials.aws_secret_access_key,
                ),
                (&mut config.sparkpost_api_key, &credentials.sparkpost_api_key),
            ];
            for (field, value) in fields {
                if let Some(value) = value {
                    *field = value.clone();
                }
            }
        });
        base
    }

    pub fn settings_overrides(&self) -> Vec<(String, String)> {
        self.sparkpost
            .api_url
            .iter()
            .map(|url| (SPARKPOST_API_URL.to_string(), url.clone()))
            .collect()
    }

    pub fn dispatcher(&self, base: MailerConfig) -> Dispatcher {
        Dispatcher::with_overrides(&self.mailer_config(base), self.settings_overrides())
    }
}
