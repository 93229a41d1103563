//! The Moodstocks API client: build, send, interpret.
//!
//! # Design
//! `ApiClient` pairs the stateless `MoodstocksClient` with a `Transport`.
//! Each operation is the same three steps with a fixed method and path, so
//! the type owns nothing mutable and can be shared across threads freely.

use crate::auth::Credentials;
use crate::client::MoodstocksClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::HttpRequest;
use crate::request::ImageSource;
use crate::transport::{Transport, UreqTransport};
use crate::types::Record;

/// Authenticated client for the Moodstocks HTTP API.
#[derive(Clone)]
pub struct ApiClient<T = UreqTransport> {
    builder: MoodstocksClient,
    transport: T,
}

impl ApiClient<UreqTransport> {
    /// Client for the production endpoint.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self::from_config(&ClientConfig::new(api_key, api_secret))
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_transport(&config.endpoint, UreqTransport::new(config.credentials()))
    }

    /// Client for an explicit endpoint, e.g. a staging or mock server.
    pub fn with_endpoint(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        endpoint: &str,
    ) -> Self {
        Self::with_transport(
            endpoint,
            UreqTransport::new(Credentials::new(api_key, api_secret)),
        )
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(endpoint: &str, transport: T) -> Self {
        Self {
            builder: MoodstocksClient::new(endpoint),
            transport,
        }
    }

    pub fn endpoint(&self) -> &str {
        self.builder.endpoint()
    }

    fn call(&self, request: HttpRequest) -> Result<Record> {
        let response = self.transport.execute(&request)?;
        self.builder.parse_response(response)
    }

    /// Index a reference image, e.g. `{"id": "my_id", "is_update": false}`.
    ///
    /// The image only becomes searchable server-side; see
    /// [`make_image_offline`](Self::make_image_offline) for on-device use.
    pub fn add_image(&self, image_id: &str, source: &ImageSource) -> Result<Record> {
        self.call(self.builder.build_add_image(image_id, source)?)
    }

    /// Remove a reference image, e.g. `{"id": "my_id", "existed": false}`.
    pub fn remove_image(&self, image_id: &str) -> Result<Record> {
        self.call(self.builder.build_remove_image(image_id))
    }

    /// Flag an image as offline, e.g. `{"id": "my_id", "was_offline": false}`.
    pub fn make_image_offline(&self, image_id: &str) -> Result<Record> {
        self.call(self.builder.build_make_image_offline(image_id))
    }

    /// Unflag an offline image, e.g. `{"id": "my_id", "was_offline": true}`.
    pub fn remove_image_offline(&self, image_id: &str) -> Result<Record> {
        self.call(self.builder.build_remove_image_offline(image_id))
    }

    /// Status of a reference image, e.g. `{"id": "my_id", "is_offline": true}`.
    /// Unknown identifiers fail with a 404 `ApiError::Api`.
    pub fn image_info(&self, image_id: &str) -> Result<Record> {
        self.call(self.builder.build_image_info(image_id))
    }

    /// Count and ids of indexed images, e.g. `{"count": 2, "ids": ["a", "b"]}`.
    pub fn list_images(&self, offline: bool) -> Result<Record> {
        self.call(self.builder.build_list_images(offline))
    }

    /// Server-side search, e.g. `{"found": true, "id": "my_id"}`.
    pub fn search_image(&self, source: &ImageSource) -> Result<Record> {
        self.call(self.builder.build_search_image(source)?)
    }

    pub fn echo<I, K, V>(&self, params: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.call(self.builder.build_echo(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::http::{HttpMethod, HttpResponse};
    use std::sync::Mutex;

    /// Records every request and replays one canned response.
    struct Recorder {
        sent: Mutex<Vec<HttpRequest>>,
        status: u16,
        body: String,
    }

    impl Recorder {
        fn new(status: u16, body: &str) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                status,
                body: body.to_string(),
            }
        }

        fn sent(&self) -> Vec<HttpRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Transport for &Recorder {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.sent.lock().unwrap().push(request.clone());
            Ok(HttpResponse {
                status: self.status,
                headers: Vec::new(),
                body: self.body.clone(),
            })
        }
    }

    #[test]
    fn operation_returns_service_record() {
        let recorder = Recorder::new(200, r#"{"id": "x", "is_update": false}"#);
        let client = ApiClient::with_transport("http://localhost:3000", &recorder);

        let record = client
            .add_image("x", &ImageSource::url("http://example.com/x.jpg"))
            .unwrap();
        assert_eq!(record["id"], "x");
        assert_eq!(record["is_update"], false);

        let sent = recorder.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Put);
        assert_eq!(sent[0].path, "http://localhost:3000/ref/x");
        assert_eq!(sent[0].query_param("image_url"), Some("http://example.com/x.jpg"));
    }

    #[test]
    fn service_error_surfaces_status_and_body() {
        let recorder = Recorder::new(404, "not found");
        let client = ApiClient::with_transport("http://localhost:3000", &recorder);

        let err = client.image_info("missing").unwrap_err();
        assert!(matches!(err, ApiError::Api { status: 404, ref body } if body == "not found"));
    }

    #[test]
    fn unreadable_file_sends_nothing() {
        let recorder = Recorder::new(200, "{}");
        let client = ApiClient::with_transport("http://localhost:3000", &recorder);

        let err = client
            .add_image("x", &ImageSource::file("/no/such/image.jpg"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Io { .. }));
        assert!(recorder.sent().is_empty());
    }

    #[test]
    fn echo_sends_params_untouched() {
        let recorder = Recorder::new(200, r#"{"http_verb": "GET", "results": {"foo": "bar"}}"#);
        let client = ApiClient::with_transport("http://localhost:3000", &recorder);

        let record = client.echo([("foo", "bar")]).unwrap();
        assert_eq!(record["results"]["foo"], "bar");

        let sent = recorder.sent();
        assert_eq!(sent[0].path, "http://localhost:3000/echo");
        assert_eq!(sent[0].query, vec![("foo".to_string(), "bar".to_string())]);
    }

    #[test]
    fn sequential_calls_share_no_request_state() {
        let recorder = Recorder::new(200, "{}");
        let client = ApiClient::with_transport("http://localhost:3000", &recorder);

        client.echo([("first", "1")]).unwrap();
        client.image_info("a").unwrap();
        client.image_info("b").unwrap();

        let sent = recorder.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1].path, "http://localhost:3000/ref/a");
        assert!(sent[1].query.is_empty());
        assert_eq!(sent[2].path, "http://localhost:3000/ref/b");
        assert!(sent[2].query.is_empty());
    }

    #[test]
    fn list_images_offline_flag_picks_path() {
        let recorder = Recorder::new(200, r#"{"count": 0, "ids": []}"#);
        let client = ApiClient::with_transport("http://localhost:3000", &recorder);

        client.list_images(true).unwrap();
        client.list_images(false).unwrap();

        let sent = recorder.sent();
        assert_eq!(sent[0].path, "http://localhost:3000/stats/offline/refs");
        assert_eq!(sent[1].path, "http://localhost:3000/stats/refs");
    }

    #[test]
    fn client_is_shareable_across_threads() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<ApiClient>();
    }

    #[test]
    fn from_config_uses_configured_endpoint() {
        let config = ClientConfig::new("k", "s").with_endpoint("http://localhost:9999/");
        let client = ApiClient::from_config(&config);
        assert_eq!(client.endpoint(), "http://localhost:9999");
        assert_eq!(
            ApiClient::new("k", "s").endpoint(),
            crate::config::DEFAULT_ENDPOINT
        );
    }
}
