//! HTTP digest authentication (RFC 7616, compatible with RFC 2617).
//!
//! # Design
//! Nothing is precomputed or cached. The service answers an unauthenticated
//! request with a `WWW-Authenticate: Digest ...` challenge; the transport
//! hands that challenge to an `Authenticator`, which derives the
//! `Authorization` value for the retried request. The response hash is a pure
//! function of the credentials, the challenge, the request method and target,
//! and the client nonce, so the secret never leaves the process.

use std::fmt;

use md5::Md5;
use sha2::{Digest, Sha256};

use crate::error::{ApiError, Result};
use crate::http::HttpMethod;

/// Nonce count sent with every response. Each logical call answers a fresh
/// challenge exactly once.
pub const NONCE_COUNT: &str = "00000001";

/// API key / secret pair identifying a Moodstocks account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Hash algorithm announced by the challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Md5Sess,
    Sha256,
    Sha256Sess,
}

impl DigestAlgorithm {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_uppercase().as_str() {
            "MD5" => Ok(Self::Md5),
            "MD5-SESS" => Ok(Self::Md5Sess),
            "SHA-256" => Ok(Self::Sha256),
            "SHA-256-SESS" => Ok(Self::Sha256Sess),
            other => Err(ApiError::Auth(format!("unsupported digest algorithm {other}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Md5Sess => "MD5-sess",
            Self::Sha256 => "SHA-256",
            Self::Sha256Sess => "SHA-256-sess",
        }
    }

    fn is_session(&self) -> bool {
        matches!(self, Self::Md5Sess | Self::Sha256Sess)
    }

    fn hash(&self, data: &str) -> String {
        match self {
            Self::Md5 | Self::Md5Sess => hex::encode(Md5::digest(data.as_bytes())),
            Self::Sha256 | Self::Sha256Sess => hex::encode(Sha256::digest(data.as_bytes())),
        }
    }
}

/// A parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub algorithm: DigestAlgorithm,
    /// `true` when the server offered `qop=auth`; `auth-int` is not supported.
    pub qop_auth: bool,
    pub stale: bool,
}

impl DigestChallenge {
    /// Returns `true` if `header` announces the digest scheme.
    pub fn is_digest(header: &str) -> bool {
        header
            .trim_start()
            .get(..6)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("digest"))
    }

    pub fn parse(header: &str) -> Result<Self> {
        if !Self::is_digest(header) {
            return Err(ApiError::Auth(format!("not a digest challenge: {header}")));
        }
        let params = parse_params(&header.trim_start()[6..]);
        let get = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };

        let nonce = get("nonce").ok_or_else(|| ApiError::Auth("challenge has no nonce".to_string()))?;
        let algorithm = match get("algorithm") {
            Some(value) => DigestAlgorithm::parse(&value)?,
            None => DigestAlgorithm::Md5,
        };
        let qop_auth = match get("qop") {
            Some(value) => {
                let offered: Vec<&str> = value.split(',').map(str::trim).collect();
                if !offered.iter().any(|q| q.eq_ignore_ascii_case("auth")) {
                    return Err(ApiError::Auth(format!("unsupported qop {value}")));
                }
                true
            }
            None => false,
        };

        Ok(Self {
            realm: get("realm").unwrap_or_default(),
            nonce,
            opaque: get("opaque"),
            algorithm,
            qop_auth,
            stale: get("stale").is_some_and(|v| v.eq_ignore_ascii_case("true")),
        })
    }
}

/// Split `key=value, key="quoted, value"` into lowercase keys and unquoted
/// values.
fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && *c != ',') {
            key.push(c);
        }
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.next_if_eq(&'=').is_some() {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            if chars.next_if_eq(&'"').is_some() {
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        '"' => break,
                        _ => value.push(c),
                    }
                }
            } else {
                while let Some(c) = chars.next_if(|c| *c != ',') {
                    value.push(c);
                }
                value = value.trim().to_string();
            }
        }
        params.push((key, value));
    }

    params
}

/// Compute the `response` field of a digest `Authorization` header.
pub fn digest_response(
    credentials: &Credentials,
    challenge: &DigestChallenge,
    method: HttpMethod,
    uri: &str,
    cnonce: &str,
    nc: &str,
) -> String {
    let algorithm = challenge.algorithm;
    let mut ha1 = algorithm.hash(&format!(
        "{}:{}:{}",
        credentials.api_key, challenge.realm, credentials.api_secret
    ));
    if algorithm.is_session() {
        ha1 = algorithm.hash(&format!("{ha1}:{}:{cnonce}", challenge.nonce));
    }
    let ha2 = algorithm.hash(&format!("{}:{uri}", method.as_str()));

    if challenge.qop_auth {
        algorithm.hash(&format!("{ha1}:{}:{nc}:{cnonce}:auth:{ha2}", challenge.nonce))
    } else {
        algorithm.hash(&format!("{ha1}:{}:{ha2}", challenge.nonce))
    }
}

/// Render a complete `Authorization` header value.
pub fn authorization_header(
    credentials: &Credentials,
    challenge: &DigestChallenge,
    method: HttpMethod,
    uri: &str,
    cnonce: &str,
) -> String {
    let response = digest_response(credentials, challenge, method, uri, cnonce, NONCE_COUNT);
    let mut header = format!(
        "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{uri}\", algorithm={}, response=\"{response}\"",
        credentials.api_key,
        challenge.realm,
        challenge.nonce,
        challenge.algorithm.as_str(),
    );
    if let Some(opaque) = &challenge.opaque {
        header.push_str(&format!(", opaque=\"{opaque}\""));
    }
    if challenge.qop_auth {
        header.push_str(&format!(", qop=auth, nc={NONCE_COUNT}, cnonce=\"{cnonce}\""));
    }
    header
}

/// Computes credentials for one request in answer to a server challenge.
pub trait Authenticator: Send + Sync {
    fn authorization(
        &self,
        method: HttpMethod,
        uri: &str,
        challenge: &DigestChallenge,
    ) -> Result<String>;
}

/// Digest authenticator backed by an API key / secret pair.
#[derive(Debug, Clone)]
pub struct DigestAuth {
    credentials: Credentials,
}

impl DigestAuth {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

impl Authenticator for DigestAuth {
    fn authorization(
        &self,
        method: HttpMethod,
        uri: &str,
        challenge: &DigestChallenge,
    ) -> Result<String> {
        let cnonce = uuid::Uuid::new_v4().simple().to_string()[..16].to_string();
        Ok(authorization_header(&self.credentials, challenge, method, uri, &cnonce))
    }
}
