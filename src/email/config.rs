use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const AWS_ACCESS_KEY_ID: &str = "aws_access_key_id";
pub const AWS_DEFAULT_REGION: &str = "aws_default_region";
pub const AWS_SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
pub const SPARKPOST_API_KEY: &str = "sparkpost_api_key";
pub const SPARKPOST_API_URL: &str = "sparkpost_api_url";

/// Credentials shared by every dispatcher built in this process.
///
/// Build it once at start-up (usually with [`MailerConfig::from_env`]) and
/// hand it to [`crate::email::Dispatcher`] by reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MailerConfig {
    #[serde(default)]
    pub aws_access_key_id: String,
    #[serde(default)]
    pub aws_default_region: String,
    #[serde(default)]
    pub aws_secret_access_key: String,
    #[serde(default)]
    pub sparkpost_api_key: String,
}

impl MailerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads each credential through `lookup`, using an empty string for
    /// variables it does not know.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).unwrap_or_default();

        Self {
            aws_access_key_id: read("AWS_ACCESS_KEY_ID"),
            aws_default_region: read("AWS_DEFAULT_REGION"),
            aws_secret_access_key: read("AWS_SECRET_ACCESS_KEY"),
            sparkpost_api_key: read("SPARKPOST_API_KEY"),
        }
    }

    pub fn configure<F>(&mut self, mutator: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        mutator(self);
        self
    }
}

/// Merged credential and override map handed to backends and API clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    pub fn from_config(config: &MailerConfig) -> Self {
        let values = [
            (AWS_ACCESS_KEY_ID, &config.aws_access_key_id),
            (AWS_DEFAULT_REGION, &config.aws_default_region),
            (AWS_SECRET_ACCESS_KEY, &config.aws_secret_access_key),
            (SPARKPOST_API_KEY, &config.sparkpost_api_key),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect();

        Self { values }
    }

    /// Applies caller overrides on top of the current values. Unknown keys
    /// are kept as-is.
    pub fn merge<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in overrides {
            self.values.insert(key.into(), value.into());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Settings
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Settings::default().merge(iter)
    }
}
