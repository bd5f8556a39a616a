use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("{0}")]
    WrongDeliverySystem(String),

    #[error("Please install {0}.")]
    DeliverySystemNotDefined(String),

    #[error("Please provide all credential values. Required: [{}]", .required.join(", "))]
    MissingCredentials { required: Vec<String> },

    #[error("Email configuration error: {0}")]
    Config(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("AWS SDK error: {0}")]
    AwsError(String),

    #[error("SparkPost API error ({status}): {message}")]
    SparkPostApi { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EmailError {
    pub(crate) fn missing_delivery_system() -> Self {
        Self::WrongDeliverySystem("Delivery system is missing.".to_string())
    }

    pub(crate) fn unsupported_delivery_system() -> Self {
        Self::WrongDeliverySystem("The given delivery system is not supported.".to_string())
    }
}
