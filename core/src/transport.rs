//! Executing requests over the network.
//!
//! # Design
//! `Transport` is the seam between the deterministic core and real I/O:
//! anything able to turn an `HttpRequest` into an `HttpResponse` can drive
//! `ApiClient`. `UreqTransport` is the default, a blocking `ureq` agent that
//! answers digest challenges through an injected `Authenticator`.
//!
//! A logical call may take two round trips: the first, unauthenticated, draws
//! the `401` challenge; the second carries the computed `Authorization`.
//! Non-2xx statuses are returned as data, never as transport errors.

use tracing::debug;

use crate::auth::{Authenticator, Credentials, DigestAuth, DigestChallenge};
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one `HttpRequest` and returns the final response.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Blocking HTTP transport with digest authentication.
#[derive(Clone)]
pub struct UreqTransport<A = DigestAuth> {
    agent: ureq::Agent,
    authenticator: A,
}

impl UreqTransport<DigestAuth> {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_authenticator(DigestAuth::new(credentials))
    }
}

impl<A: Authenticator> UreqTransport<A> {
    pub fn with_authenticator(authenticator: A) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self {
            agent,
            authenticator,
        }
    }

    fn send(&self, request: &HttpRequest, authorization: Option<&str>) -> Result<HttpResponse> {
        let url = request.url();
        let body = request.body.as_ref().map(|b| b.encode());

        let result = match (request.method, body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(&url), request, authorization).call(),
            (HttpMethod::Delete, _) => {
                with_headers(self.agent.delete(&url), request, authorization).call()
            }
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(&url), request, authorization).send(&body[..])
            }
            (HttpMethod::Post, None) => {
                with_headers(self.agent.post(&url), request, authorization).send_empty()
            }
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(&url), request, authorization).send(&body[..])
            }
            (HttpMethod::Put, None) => {
                with_headers(self.agent.put(&url), request, authorization).send_empty()
            }
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    request: &HttpRequest,
    authorization: Option<&str>,
) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(authorization) = authorization {
        builder = builder.header("authorization", authorization);
    }
    builder
}

impl<A: Authenticator> Transport for UreqTransport<A> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let response = self.send(request, None)?;
        answer_challenge(&self.authenticator, request, response, |authorization| {
            self.send(request, Some(authorization))
        })
    }
}

/// Retry `request` once with digest credentials if `response` is a digest
/// challenge; otherwise hand `response` back untouched.
pub(crate) fn answer_challenge(
    authenticator: &dyn Authenticator,
    request: &HttpRequest,
    response: HttpResponse,
    resend: impl FnOnce(&str) -> Result<HttpResponse>,
) -> Result<HttpResponse> {
    if response.status != 401 {
        return Ok(response);
    }
    let Some(header) = response
        .headers_named("www-authenticate")
        .find(|h| DigestChallenge::is_digest(h))
        .map(str::to_string)
    else {
        return Ok(response);
    };
    let challenge = DigestChallenge::parse(&header)?;

    let uri = request.request_uri();
    debug!(
        method = %request.method,
        uri = %uri,
        realm = %challenge.realm,
        algorithm = challenge.algorithm.as_str(),
        "answering digest challenge"
    );
    let authorization = authenticator.authorization(request.method, &uri, &challenge)?;
    resend(&authorization)
}
