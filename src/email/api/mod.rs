//! Thin credential-checking wrappers around the single remote operation each
//! delivery service needs.

pub mod ses;
pub mod sparkpost;

pub use ses::{
    AwsCredentials, AwsSesClient, SdkSesTransport, SendRawEmailRequest, SendRawEmailResponse,
    SesTag, SesTransport,
};
pub use sparkpost::{
    HttpSparkPostTransport, Recipient, RecipientAddress, SparkPostClient, SparkPostEndpoint,
    SparkPostTransport, Transmission, TransmissionContent,
};

use serde_json::Value;

/// Text form of a header value for APIs that only take strings.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
