//! Synchronous client for the Moodstocks image-recognition API.
//!
//! # Overview
//! Register reference images, flag them for on-device (offline) recognition,
//! inspect and list them, run server-side searches, and issue diagnostic
//! echo calls. Every call is authenticated with HTTP digest authentication,
//! so the API secret never travels over the wire.
//!
//! # Design
//! - `MoodstocksClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_response` consumes an `HttpResponse`. No I/O happens there except
//!   reading an image file to upload.
//! - `ApiClient` pairs it with a `Transport` (by default `UreqTransport`) that
//!   performs the round-trip and answers digest challenges.
//! - Results are raw JSON objects (`Record`); `types` holds optional typed
//!   views.
//! - `ApiError` separates service rejections (`Api`) from local failures
//!   (`Io`, `Decode`, `Auth`, `Transport`, `Config`).
//!
//! ```no_run
//! use moodstocks_core::{ApiClient, ImageSource};
//!
//! let client = ApiClient::new("my-api-key", "my-api-secret");
//! client.add_image("my_id", &ImageSource::file("./ref.jpg"))?;
//! let found = client.search_image(&ImageSource::url("http://example.com/query.jpg"))?;
//! println!("{found:?}");
//! # Ok::<(), moodstocks_core::ApiError>(())
//! ```

pub mod api;
pub mod auth;
pub mod b64;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod request;
pub mod transport;
pub mod types;

pub use api::ApiClient;
pub use auth::{Authenticator, Credentials, DigestAuth, DigestChallenge};
pub use b64::{b64_decode, b64_encode};
pub use client::MoodstocksClient;
pub use config::{ClientConfig, DEFAULT_ENDPOINT};
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, MultipartBody};
pub use request::ImageSource;
pub use transport::{Transport, UreqTransport};
pub use types::{
    from_record, AddedImage, EchoResult, ImageInfo, ImageList, OfflineChange, Record, RemovedImage,
    SearchResult,
};

/// Version of this client library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
