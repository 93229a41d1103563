//! Stateless HTTP request builder and response parser for the Moodstocks API.
//!
//! # Design
//! `MoodstocksClient` holds only the endpoint and carries no mutable state
//! between calls. Each operation has a `build_*` method producing an
//! `HttpRequest`; every response goes through the single `parse_response`.
//! The caller (or `ApiClient`) executes the HTTP round-trip in between.

use serde_json::Value;
use tracing::warn;

use crate::config::DEFAULT_ENDPOINT;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::request::{ImageSource, RequestBuilder};
use crate::types::Record;

const REF: &str = "/ref/{id}";
const REF_OFFLINE: &str = "/ref/{id}/offline";
const STATS_REFS: &str = "/stats/refs";
const STATS_OFFLINE_REFS: &str = "/stats/offline/refs";
const SEARCH: &str = "/search";
const ECHO: &str = "/echo";

/// Synthetic upload filename for reference images.
pub const REF_FILENAME: &str = "ref.jpg";
/// Synthetic upload filename for query images.
pub const QUERY_FILENAME: &str = "qry.jpg";

/// Synchronous, stateless request builder for the Moodstocks API.
#[derive(Debug, Clone)]
pub struct MoodstocksClient {
    endpoint: String,
}

impl Default for MoodstocksClient {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl MoodstocksClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Index a reference image from a local file or a remote URL.
    pub fn build_add_image(&self, image_id: &str, source: &ImageSource) -> Result<HttpRequest> {
        Ok(RequestBuilder::new(HttpMethod::Put, REF)
            .identifier(image_id)
            .image(source, REF_FILENAME)?
            .build(&self.endpoint))
    }

    pub fn build_remove_image(&self, image_id: &str) -> HttpRequest {
        RequestBuilder::new(HttpMethod::Delete, REF)
            .identifier(image_id)
            .build(&self.endpoint)
    }

    /// Flag a reference image for synchronization into on-device databases.
    pub fn build_make_image_offline(&self, image_id: &str) -> HttpRequest {
        RequestBuilder::new(HttpMethod::Post, REF_OFFLINE)
            .identifier(image_id)
            .build(&self.endpoint)
    }

    /// Unflag an offline image. It stays searchable server-side.
    pub fn build_remove_image_offline(&self, image_id: &str) -> HttpRequest {
        RequestBuilder::new(HttpMethod::Delete, REF_OFFLINE)
            .identifier(image_id)
            .build(&self.endpoint)
    }

    pub fn build_image_info(&self, image_id: &str) -> HttpRequest {
        RequestBuilder::new(HttpMethod::Get, REF)
            .identifier(image_id)
            .build(&self.endpoint)
    }

    /// Count and list indexed images, or only the offline ones.
    pub fn build_list_images(&self, offline: bool) -> HttpRequest {
        let template = if offline { STATS_OFFLINE_REFS } else { STATS_REFS };
        RequestBuilder::new(HttpMethod::Get, template).build(&self.endpoint)
    }

    /// Server-side search from a local file or a remote URL.
    pub fn build_search_image(&self, source: &ImageSource) -> Result<HttpRequest> {
        Ok(RequestBuilder::new(HttpMethod::Post, SEARCH)
            .image(source, QUERY_FILENAME)?
            .build(&self.endpoint))
    }

    pub fn build_echo<I, K, V>(&self, params: I) -> HttpRequest
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        RequestBuilder::new(HttpMethod::Get, ECHO)
            .params(params)
            .build(&self.endpoint)
    }

    /// Validate the status and decode the body of any operation's response.
    ///
    /// Anything but 200 becomes `ApiError::Api` with the body kept verbatim.
    /// A 200 whose body is not a JSON object is a `Decode` error.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Record> {
        if response.status != 200 {
            warn!(status = response.status, "service returned an error");
            return Err(ApiError::Api {
                status: response.status,
                body: response.body,
            });
        }
        match serde_json::from_str::<Value>(&response.body)? {
            Value::Object(record) => Ok(record),
            other => Err(ApiError::Decode(serde::de::Error::custom(format!(
                "expected a JSON object, got {other}"
            )))),
        }
    }
}
