//! Request assembly shared by every operation.
//!
//! # Design
//! An operation is a method, a path template and an input mapping. The
//! image to submit is an `ImageSource` variant rather than two optional
//! fields, so "file or URL" is decided by the type system. Reading a file
//! happens here, before any request value exists, which keeps local I/O
//! failures strictly separate from service errors.

use std::path::PathBuf;

use tracing::debug;

use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, MultipartBody};

/// Multipart field name the service reads image data from.
pub const IMAGE_FIELD: &str = "image_file";

/// Query parameter carrying a remote image location.
pub const IMAGE_URL_PARAM: &str = "image_url";

/// Placeholder substituted with the reference image identifier.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Where the image for an add or search operation comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageSource {
    /// A local file, uploaded as multipart form data.
    File(PathBuf),
    /// A remote image the service fetches itself.
    Url(String),
    /// No image. The service rejects add/search requests without one.
    #[default]
    None,
}

impl ImageSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }
}

/// Builder for one operation's `HttpRequest`.
#[derive(Debug, Clone)]
pub struct RequestBuilder<'a> {
    method: HttpMethod,
    template: &'a str,
    identifier: Option<&'a str>,
    query: Vec<(String, String)>,
    body: Option<MultipartBody>,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(method: HttpMethod, template: &'a str) -> Self {
        Self {
            method,
            template,
            identifier: None,
            query: Vec::new(),
            body: None,
        }
    }

    /// Identifier substituted for `{id}` in the template. It is
    /// percent-encoded as a single path segment when the request is built.
    pub fn identifier(mut self, id: &'a str) -> Self {
        self.identifier = Some(id);
        self
    }

    /// Attach the image input. Files are read fully here and sent as a
    /// multipart part named `image_file` with the synthetic `filename`.
    pub fn image(mut self, source: &ImageSource, filename: &str) -> Result<Self> {
        match source {
            ImageSource::File(path) => {
                let data = std::fs::read(path).map_err(|source| ApiError::Io {
                    path: path.clone(),
                    source,
                })?;
                self.body = Some(MultipartBody::new(IMAGE_FIELD, filename, data));
            }
            ImageSource::Url(url) => {
                self.query.push((IMAGE_URL_PARAM.to_string(), url.clone()));
            }
            ImageSource::None => {}
        }
        Ok(self)
    }

    /// Extra query parameters, forwarded verbatim and in order.
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn build(self, endpoint: &str) -> HttpRequest {
        let resource = match self.identifier {
            Some(id) => self
                .template
                .replace(ID_PLACEHOLDER, &urlencoding::encode(id)),
            None => self.template.to_string(),
        };
        let headers = match &self.body {
            Some(body) => vec![("content-type".to_string(), body.content_type())],
            None => Vec::new(),
        };

        debug!(
            method = %self.method,
            resource = %resource,
            query_keys = ?self.query.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            upload_bytes = ?self.body.as_ref().map(|b| b.data.len()),
            "built request"
        );

        HttpRequest {
            method: self.method,
            path: format!("{endpoint}{resource}"),
            query: self.query,
            headers,
            body: self.body,
        }
    }
}
