use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::errors::{PostFailure, Result, VictorOpsError};
use crate::observer::{Delivery, DeliveryObserver};
use crate::payload::{AlertData, AlertPayload, AlertVerb};
use crate::response::AlertResponse;
use crate::settings::{Settings, SettingsOptions};

/// Client for the VictorOps REST alert endpoint
///
/// Each verb method builds a payload, POSTs it to `{api_url}/{routing_key}`
/// and resolves once the service has answered. Nothing is queued or retried.
///
/// # Example
///
/// ```rust,no_run
/// use victorops_client::{AlertData, SettingsOptions, VictorOpsClient};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = VictorOpsClient::from_options(
///         SettingsOptions::new("https://alert.victorops.com/integrations/generic/20131114/alert/api-key", "ops"),
///         Duration::from_secs(10),
///     )?;
///
///     let response = client
///         .critical(AlertData::new().with_message("Replication lag over 5 minutes"))
///         .await?;
///     println!("{:?}", response.entity_id());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct VictorOpsClient {
    client: ClientWithMiddleware,
    settings: Settings,
    observer: Option<Arc<dyn DeliveryObserver>>,
}

impl VictorOpsClient {
    /// Create a new client
    ///
    /// # Arguments
    ///
    /// * `settings` - Validated configuration
    /// * `timeout` - Request timeout duration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: Settings, timeout: Duration) -> Result<Self> {
        let builder = Client::builder().timeout(timeout);

        #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
        let builder = builder.min_tls_version(reqwest::tls::Version::TLS_1_2);

        let client = builder.build().map_err(VictorOpsError::BuildHttpClient)?;
        let client = ClientBuilder::new(client).build();

        Ok(Self::with_client(client, settings))
    }

    /// Validate `options` and create a client
    ///
    /// # Errors
    ///
    /// Returns [`VictorOpsError::MissingSettings`] for incomplete options, or
    /// an error if the HTTP client cannot be built.
    pub fn from_options(options: SettingsOptions, timeout: Duration) -> Result<Self> {
        Self::new(Settings::new(options)?, timeout)
    }

    /// Create a new client with a custom reqwest middleware client
    ///
    /// This allows you to add custom middleware (retry, logging, proxies, etc.)
    pub fn with_client(client: ClientWithMiddleware, settings: Settings) -> Self {
        Self {
            client,
            settings,
            observer: None,
        }
    }

    /// Register a hook that sees every payload and its outcome
    pub fn with_observer(mut self, observer: Arc<dyn DeliveryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Send a `CRITICAL` alert; `message` becomes `state_message`
    pub async fn critical(&self, data: AlertData) -> Result<AlertResponse> {
        self.alert(AlertVerb::Critical, data).await
    }

    /// Send a `WARNING` alert; `message` becomes `state_message`
    pub async fn warn(&self, data: AlertData) -> Result<AlertResponse> {
        self.alert(AlertVerb::Warning, data).await
    }

    /// Send an `INFO` alert; `message` becomes `state_message`
    pub async fn info(&self, data: AlertData) -> Result<AlertResponse> {
        self.alert(AlertVerb::Info, data).await
    }

    /// Acknowledge an incident
    ///
    /// `message` becomes `ack_msg`; `author` becomes `ack_author`, defaulting
    /// to the current monitoring tool.
    pub async fn ack(&self, data: AlertData) -> Result<AlertResponse> {
        self.alert(AlertVerb::Acknowledge, data).await
    }

    /// Send a `RECOVERY` alert; `message` becomes `state_message`
    pub async fn recovery(&self, data: AlertData) -> Result<AlertResponse> {
        self.alert(AlertVerb::Recovery, data).await
    }

    /// Build and send a payload for any verb
    pub async fn alert(&self, verb: AlertVerb, data: AlertData) -> Result<AlertResponse> {
        let payload = self.build_payload(verb, data)?;
        self.send(&payload).await
    }

    /// Build a payload against the current settings without sending it
    pub fn build_payload(&self, verb: AlertVerb, data: AlertData) -> Result<AlertPayload> {
        AlertPayload::builder(&self.settings)
            .verb(verb)
            .data(data)
            .build()
    }

    /// POST a payload and decode the response
    ///
    /// # Errors
    ///
    /// Returns [`VictorOpsError::PostFailure`] if:
    /// - The endpoint is not a valid URL
    /// - The HTTP request fails (connection, TLS, timeout)
    /// - The service returns a non-success status code
    /// - The body is not a JSON object
    /// - The body reports `result: failure`
    #[instrument(
        name = "VictorOpsClient::send",
        skip_all,
        fields(message_type = payload.message_type().unwrap_or_default())
    )]
    pub async fn send(&self, payload: &AlertPayload) -> Result<AlertResponse> {
        let endpoint = self.endpoint();
        let outcome = self.post(&endpoint, payload).await;

        if let Some(observer) = &self.observer {
            observer.on_delivery(&Delivery {
                endpoint: &endpoint,
                payload,
                outcome: outcome.as_ref(),
            });
        }

        match outcome {
            Ok(response) => {
                debug!(entity_id = ?response.entity_id(), "Alert accepted by VictorOps");
                Ok(response)
            }
            Err(failure) => {
                warn!(error = %failure, "Failed to post alert to VictorOps");
                Err(failure.into())
            }
        }
    }

    async fn post(
        &self,
        endpoint: &str,
        payload: &AlertPayload,
    ) -> std::result::Result<AlertResponse, PostFailure> {
        let url = Url::parse(endpoint).map_err(|source| PostFailure::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;

        debug!(url = %url, "Posting alert to VictorOps");

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(PostFailure::Request)?;

        let status = response.status();
        let body = response.bytes().await.map_err(PostFailure::Body)?;

        if !status.is_success() {
            return Err(PostFailure::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let response: AlertResponse = serde_json::from_slice(&body).map_err(PostFailure::Decode)?;

        if response.is_failure() {
            return Err(PostFailure::Rejected(response));
        }

        Ok(response)
    }

    /// `{api_url}/{routing_key}`
    pub fn endpoint(&self) -> String {
        self.settings.endpoint()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn entity_display_name(&self) -> String {
        self.settings.entity_display_name()
    }

    pub fn entity_id(&self) -> String {
        self.settings.entity_id()
    }

    pub fn monitoring_tool(&self) -> String {
        self.settings.monitoring_tool()
    }

    /// Pin `entity_display_name` for payloads built from now on
    pub fn set_entity_display_name(&mut self, value: &str) {
        self.settings.set_entity_display_name(value);
    }

    /// Pin `monitoring_tool` for payloads built from now on
    pub fn set_monitoring_tool(&mut self, value: &str) {
        self.settings.set_monitoring_tool(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> VictorOpsClient {
        VictorOpsClient::from_options(
            SettingsOptions::new(&server.uri(), "1234"),
            Duration::from_secs(10),
        )
        .unwrap()
    }

    fn success() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "result": "success",
            "entity_id": "localhost/rust REST client"
        }))
    }

    #[derive(Default)]
    struct Recorder {
        deliveries: Mutex<Vec<(String, Option<String>, bool)>>,
    }

    impl DeliveryObserver for Recorder {
        fn on_delivery(&self, delivery: &Delivery<'_>) {
            self.deliveries.lock().unwrap().push((
                delivery.endpoint.to_string(),
                delivery.payload.message_type().map(str::to_string),
                delivery.is_success(),
            ));
        }
    }

    #[tokio::test]
    async fn test_critical_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1234"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(json!({
                "message_type": "CRITICAL",
                "state_message": "test",
                "entity_id": "localhost/rust REST client",
                "entity_display_name": "localhost/rust REST client",
                "monitoring_tool": "1234::rust REST client"
            })))
            .respond_with(success())
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let response = client
            .critical(AlertData::new().with_message("test"))
            .await
            .unwrap();

        assert_eq!(response.result(), Some("success"));
        assert_eq!(response.entity_id(), Some("localhost/rust REST client"));
    }

    #[tokio::test]
    async fn test_state_message_verbs_success() {
        let mock_server = MockServer::start().await;

        for message_type in ["WARNING", "INFO", "RECOVERY"] {
            Mock::given(method("POST"))
                .and(path("/1234"))
                .and(body_partial_json(json!({
                    "message_type": message_type,
                    "state_message": "test"
                })))
                .respond_with(success())
                .expect(1)
                .mount(&mock_server)
                .await;
        }

        let client = client_for(&mock_server);
        let data = AlertData::new().with_message("test");

        assert!(client.warn(data.clone()).await.is_ok());
        assert!(client.info(data.clone()).await.is_ok());
        assert!(client.recovery(data).await.is_ok());
    }

    #[tokio::test]
    async fn test_ack_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1234"))
            .and(body_partial_json(json!({
                "message_type": "ACKNOWLEDGEMENT",
                "ack_msg": "on it",
                "ack_author": "1234::rust REST client"
            })))
            .respond_with(success())
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let response = client
            .ack(AlertData::new().with_message("on it"))
            .await
            .unwrap();

        assert_eq!(response.result(), Some("success"));
    }

    #[tokio::test]
    async fn test_overrides_reach_the_wire() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1234"))
            .and(body_partial_json(json!({
                "entity_display_name": "db1",
                "entity_id": "db1",
                "monitoring_tool": "nagios",
                "ack_author": "alice"
            })))
            .respond_with(success())
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut client = client_for(&mock_server);
        client.set_entity_display_name("db1");
        client.set_monitoring_tool("nagios");

        let result = client.ack(AlertData::new().with_author("alice")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_failure_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1234"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "failure",
                "message": "Missing fields: message_type"
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result = client.info(AlertData::new()).await;

        match result {
            Err(VictorOpsError::PostFailure(PostFailure::Rejected(response))) => {
                assert_eq!(response.message(), Some("Missing fields: message_type"));
            }
            other => panic!("Expected Rejected post failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1234"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result = client.critical(AlertData::new()).await;

        assert!(matches!(
            result,
            Err(VictorOpsError::PostFailure(PostFailure::Decode(_)))
        ));
    }

    #[tokio::test]
    async fn test_empty_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1234"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result = client.critical(AlertData::new()).await;

        assert!(matches!(
            result,
            Err(VictorOpsError::PostFailure(PostFailure::Decode(_)))
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1234"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service unavailable"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result = client.warn(AlertData::new()).await;

        match result {
            Err(VictorOpsError::PostFailure(failure)) => {
                assert!(failure.is_retryable());
                assert!(matches!(
                    failure,
                    PostFailure::Status { status: 503, ref body } if body == "Service unavailable"
                ));
            }
            other => panic!("Expected PostFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = VictorOpsClient::from_options(
            SettingsOptions::new(&format!("http://127.0.0.1:{port}"), "1234"),
            Duration::from_secs(5),
        )
        .unwrap();

        let result = client.critical(AlertData::new()).await;
        assert!(matches!(
            result,
            Err(VictorOpsError::PostFailure(PostFailure::Request(_)))
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_retryable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1234"))
            .respond_with(success().set_delay(Duration::from_secs(2)))
            .mount(&mock_server)
            .await;

        let client = VictorOpsClient::from_options(
            SettingsOptions::new(&mock_server.uri(), "1234"),
            Duration::from_millis(100),
        )
        .unwrap();

        let error = client.info(AlertData::new()).await.unwrap_err();
        let failure = error.post_failure().expect("post failure");
        assert!(matches!(failure, PostFailure::Request(_)));
        assert!(failure.is_retryable());
    }

    #[tokio::test]
    async fn test_invalid_endpoint() {
        let client = VictorOpsClient::from_options(
            SettingsOptions::new("test url", "test key"),
            Duration::from_secs(10),
        )
        .unwrap();

        let result = client.critical(AlertData::new()).await;
        assert!(matches!(
            result,
            Err(VictorOpsError::PostFailure(PostFailure::InvalidEndpoint { .. }))
        ));
    }

    #[tokio::test]
    async fn test_observer_sees_success_and_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1234"))
            .and(body_partial_json(json!({"message_type": "CRITICAL"})))
            .respond_with(success())
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/1234"))
            .and(body_partial_json(json!({"message_type": "RECOVERY"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "failure"})))
            .mount(&mock_server)
            .await;

        let recorder = Arc::new(Recorder::default());
        let client = client_for(&mock_server).with_observer(recorder.clone());

        assert!(client.critical(AlertData::new()).await.is_ok());
        assert!(client.recovery(AlertData::new()).await.is_err());

        let endpoint = format!("{}/1234", mock_server.uri());
        let deliveries = recorder.deliveries.lock().unwrap();
        assert_eq!(
            *deliveries,
            vec![
                (endpoint.clone(), Some("CRITICAL".to_string()), true),
                (endpoint, Some("RECOVERY".to_string()), false),
            ]
        );
    }

    #[tokio::test]
    async fn test_send_prebuilt_payload() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1234"))
            .and(body_partial_json(json!({"special_var": "i am special"})))
            .respond_with(success())
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let payload = client
            .build_payload(
                AlertVerb::Info,
                AlertData::new().with_field("special_var", "i am special"),
            )
            .unwrap();

        let response = client.send(&payload).await.unwrap();
        assert_eq!(response.result(), Some("success"));
    }

    #[test]
    fn test_endpoint_getter() {
        let client = VictorOpsClient::from_options(
            SettingsOptions::new("http://example.com/", "1234"),
            Duration::from_secs(10),
        )
        .unwrap();

        assert_eq!(client.endpoint(), "http://example.com/1234");
        assert_eq!(client.settings().api_url(), "http://example.com");
    }

    #[test]
    fn test_identity_accessors() {
        let mut client = VictorOpsClient::from_options(
            SettingsOptions::new("http://example.com", "test key"),
            Duration::from_secs(10),
        )
        .unwrap();

        assert_eq!(client.entity_display_name(), "localhost/rust REST client");
        assert_eq!(client.entity_id(), "localhost/rust REST client");
        assert_eq!(client.monitoring_tool(), "test key::rust REST client");

        client.set_monitoring_tool("cool name bro");
        assert_eq!(client.monitoring_tool(), "cool name bro");
    }

    #[test]
    fn test_missing_settings_fails_construction() {
        let options = SettingsOptions {
            api_url: Some("http://example.com".to_string()),
            ..SettingsOptions::default()
        };
        let result = VictorOpsClient::from_options(options, Duration::from_secs(10));
        assert!(matches!(result, Err(VictorOpsError::MissingSettings("routing_key"))));
    }
}
