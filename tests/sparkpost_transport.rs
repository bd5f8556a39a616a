use relaymail::email::api::{HttpSparkPostTransport, SparkPostClient, Transmission};
use relaymail::email::providers::SparkPostBackend;
use relaymail::email::{
    DeliveryBackend, EmailError, EmailMessage, SPARKPOST_API_KEY, SPARKPOST_API_URL, Settings,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings_for(server: &MockServer) -> Settings {
    [
        (SPARKPOST_API_KEY, "test-api-key".to_string()),
        (SPARKPOST_API_URL, server.uri()),
    ]
    .into_iter()
    .collect()
}

fn message() -> EmailMessage {
    EmailMessage::new("to@example.com", "from@example.com", "Hello")
        .with_header("delivery_system", "sparkpost")
        .with_header("tag", "tag_value")
        .with_header("metadata", json!({ "website": "testwebsite" }))
        .with_text("Body")
}

fn transmission(message: &EmailMessage) -> Transmission {
    SparkPostBackend::new().generate_options(message)
}

#[tokio::test]
async fn test_create_transmission_success() {
    let mock_server = MockServer::start().await;
    let message = message();

    Mock::given(method("POST"))
        .and(path("/api/v1/transmissions"))
        .and(header("Authorization", "test-api-key"))
        .and(body_json(json!({
            "campaign_id": "tag_value",
            "content": { "email_rfc822": message.to_rfc822() },
            "metadata": { "website": "testwebsite" },
            "recipients": [
                { "address": { "email": "to@example.com" }, "tags": ["tag_value"] }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": {
                "total_rejected_recipients": 0,
                "total_accepted_recipients": 1,
                "id": "11668787484950529"
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = SparkPostClient::new(&settings_for(&mock_server)).unwrap();
    let response = client
        .create_transmission(&transmission(&message))
        .await
        .unwrap();

    assert_eq!(response["results"]["id"], "11668787484950529");
}

#[tokio::test]
async fn test_backend_writes_transmission_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/transmissions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": { "id": "84537359" }
        })))
        .mount(&mock_server)
        .await;

    let delivered = SparkPostBackend::new()
        .deliver(&settings_for(&mock_server), message())
        .await
        .unwrap();

    assert_eq!(delivered.message_id(), Some("84537359"));
}

#[tokio::test]
async fn test_transport_uses_supplied_client() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/transmissions"))
        .and(header("User-Agent", "relaymail-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": { "id": "7" }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let http = reqwest::Client::builder()
        .user_agent("relaymail-tests")
        .build()
        .unwrap();
    let client = SparkPostClient::with_transport(
        &settings_for(&mock_server),
        Arc::new(HttpSparkPostTransport::with_client(http)),
    )
    .unwrap();

    let response = client
        .create_transmission(&transmission(&message()))
        .await
        .unwrap();
    assert_eq!(response["results"]["id"], "7");
}

#[tokio::test]
async fn test_null_headers_are_not_sent() {
    let mock_server = MockServer::start().await;
    let message = message()
        .with_header("tag", json!(null))
        .with_header("metadata", json!(null));

    Mock::given(method("POST"))
        .and(path("/api/v1/transmissions"))
        .and(body_json(json!({
            "content": { "email_rfc822": message.to_rfc822() },
            "recipients": [
                { "address": { "email": "to@example.com" }, "tags": [] }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": { "id": "8" }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = SparkPostClient::new(&settings_for(&mock_server)).unwrap();
    client
        .create_transmission(&transmission(&message))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_api_error_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/transmissions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{ "message": "Unauthorized.", "description": "Invalid API key" }]
        })))
        .mount(&mock_server)
        .await;

    let client = SparkPostClient::new(&settings_for(&mock_server)).unwrap();
    let err = client
        .create_transmission(&transmission(&message()))
        .await
        .unwrap_err();

    match err {
        EmailError::SparkPostApi { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Unauthorized.: Invalid API key");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_api_key_never_reaches_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let settings: Settings = [(SPARKPOST_API_URL, mock_server.uri())].into_iter().collect();
    let result = SparkPostBackend::new().deliver(&settings, message()).await;

    assert!(matches!(result, Err(EmailError::MissingCredentials { .. })));
}
