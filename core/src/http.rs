//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The client
//! builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network; a `Transport` (or the host) performs the actual I/O.
//!
//! Query parameters are kept as an ordered list of raw `(key, value)` pairs
//! and only percent-encoded when the request target is rendered, so tests can
//! assert on exactly what the caller passed in.

use std::fmt;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-part `multipart/form-data` payload carrying one file.
///
/// The file content is fully buffered; uploads are not streamed.
#[derive(Clone, PartialEq, Eq)]
pub struct MultipartBody {
    pub boundary: String,
    pub field: String,
    pub filename: String,
    pub data: Vec<u8>,
}

impl MultipartBody {
    pub fn new(field: &str, filename: &str, data: Vec<u8>) -> Self {
        Self {
            boundary: format!("------------------------{}", uuid::Uuid::new_v4().simple()),
            field: field.to_string(),
            filename: filename.to_string(),
            data,
        }
    }

    /// Value for the request's `content-type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Serialize the payload into its wire form.
    pub fn encode(&self) -> Vec<u8> {
        let head = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            self.boundary, self.field, self.filename
        );
        let tail = format!("\r\n--{}--\r\n", self.boundary);

        let mut out = Vec::with_capacity(head.len() + self.data.len() + tail.len());
        out.extend_from_slice(head.as_bytes());
        out.extend_from_slice(&self.data);
        out.extend_from_slice(tail.as_bytes());
        out
    }
}

// Image bytes are noise in logs and assertion output.
impl fmt::Debug for MultipartBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartBody")
            .field("boundary", &self.boundary)
            .field("field", &self.field)
            .field("filename", &self.filename)
            .field("len", &self.data.len())
            .finish()
    }
}

/// An HTTP request described as plain data.
///
/// `path` is the absolute URL without its query string. Built by
/// `MoodstocksClient::build_*` methods.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<MultipartBody>,
}

impl HttpRequest {
    /// First value of the query parameter `key`, if present.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Percent-encoded query string without the leading `?`.
    pub fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Absolute URL including the encoded query string.
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string())
        }
    }

    /// Origin-form request target (`/v2/ref/abc?x=y`), as it appears on the
    /// request line. Digest authentication hashes this value.
    pub fn request_uri(&self) -> String {
        let after_scheme = match self.path.find("://") {
            Some(idx) => &self.path[idx + 3..],
            None => self.path.as_str(),
        };
        let origin = match after_scheme.find('/') {
            Some(idx) => &after_scheme[idx..],
            None => "/",
        };
        if self.query.is_empty() {
            origin.to_string()
        } else {
            format!("{origin}?{}", self.query_string())
        }
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a header that may repeat, such as `WWW-Authenticate`.
    pub fn headers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
