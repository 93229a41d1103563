//! In-memory stand-in for the Moodstocks API v2.
//!
//! Serves the reference image, stats, search and echo resources behind HTTP
//! digest authentication (MD5, `qop=auth`). A reference image is stored as
//! raw bytes; a search matches when the query bytes are identical. Images
//! submitted by URL are stored as the URL string itself, since the mock never
//! fetches anything.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use md5::{Digest, Md5};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, warn};

pub const REALM: &str = "Moodstocks API";
pub const DEFAULT_API_KEY: &str = "test-key";
pub const DEFAULT_API_SECRET: &str = "test-secret";
pub const IMAGE_FIELD: &str = "image_file";

/// The single account the mock accepts.
#[derive(Clone, Debug)]
pub struct Account {
    pub api_key: String,
    pub api_secret: String,
}

impl Account {
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        }
    }

    /// `MOODSTOCKS_API_KEY` / `MOODSTOCKS_API_SECRET`, falling back to the
    /// test defaults.
    pub fn from_env() -> Self {
        let var = |name: &str, default: &str| std::env::var(name).unwrap_or_else(|_| default.to_string());
        Self {
            api_key: var("MOODSTOCKS_API_KEY", DEFAULT_API_KEY),
            api_secret: var("MOODSTOCKS_API_SECRET", DEFAULT_API_SECRET),
        }
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY, DEFAULT_API_SECRET)
    }
}

#[derive(Clone, Debug)]
struct Reference {
    image: Vec<u8>,
    offline: bool,
}

type Db = Arc<RwLock<BTreeMap<String, Reference>>>;

#[derive(Clone)]
pub struct AppState {
    account: Arc<Account>,
    nonce: Arc<str>,
    opaque: Arc<str>,
    refs: Db,
}

type ApiResult = Result<Json<Value>, (StatusCode, String)>;

pub fn app() -> Router {
    app_with_account(Account::default())
}

pub fn app_with_account(account: Account) -> Router {
    let state = AppState {
        account: Arc::new(account),
        nonce: uuid::Uuid::new_v4().simple().to_string().into(),
        opaque: uuid::Uuid::new_v4().simple().to_string().into(),
        refs: Arc::new(RwLock::new(BTreeMap::new())),
    };
    Router::new()
        .route("/ref/{id}", get(image_info).put(add_image).delete(remove_image))
        .route("/ref/{id}/offline", post(make_offline).delete(remove_offline))
        .route("/stats/refs", get(list_refs))
        .route("/stats/offline/refs", get(list_offline_refs))
        .route("/search", post(search))
        .route("/echo", get(echo))
        .layer(middleware::from_fn_with_state(state.clone(), require_digest))
        .with_state(state)
}

pub async fn run(listener: TcpListener, account: Account) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_account(account)).await
}

// --- digest authentication ---

async fn require_digest(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let authorized = match request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        Some(authorization) => {
            let ok = state.verify(request.method().as_str(), target, authorization);
            if !ok {
                warn!(uri = %target, "rejected digest credentials");
            }
            ok
        }
        None => false,
    };

    if authorized {
        next.run(request).await
    } else {
        state.challenge()
    }
}

impl AppState {
    fn challenge(&self) -> Response {
        let value = format!(
            r#"Digest realm="{REALM}", nonce="{}", opaque="{}", qop="auth", algorithm=MD5"#,
            self.nonce, self.opaque
        );
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, value)],
            "Unauthorized",
        )
            .into_response()
    }

    fn verify(&self, method: &str, target: &str, authorization: &str) -> bool {
        let Some(params) = authorization.strip_prefix("Digest ").map(parse_auth_params) else {
            return false;
        };
        let field = |name: &str| params.get(name).map(String::as_str);
        let (Some(username), Some(nonce), Some(uri), Some(response)) =
            (field("username"), field("nonce"), field("uri"), field("response"))
        else {
            return false;
        };
        if username != self.account.api_key || nonce != &*self.nonce || uri != target {
            return false;
        }

        let ha1 = md5_hex(&format!("{username}:{REALM}:{}", self.account.api_secret));
        let ha2 = md5_hex(&format!("{method}:{uri}"));
        let expected = match (field("qop"), field("nc"), field("cnonce")) {
            (Some("auth"), Some(nc), Some(cnonce)) => {
                md5_hex(&format!("{ha1}:{nonce}:{nc}:{cnonce}:auth:{ha2}"))
            }
            (None, _, _) => md5_hex(&format!("{ha1}:{nonce}:{ha2}")),
            _ => return false,
        };
        expected == response
    }
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

fn parse_auth_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut rest = input.trim();
    while let Some((key, after)) = rest.split_once('=') {
        let after = after.trim_start();
        let (value, remaining) = match after.strip_prefix('"') {
            Some(quoted) => quoted.split_once('"').unwrap_or((quoted, "")),
            None => after.split_once(',').unwrap_or((after, "")),
        };
        params.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        rest = remaining.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
    }
    params
}

// --- handlers ---

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "not found".to_string())
}

fn bad_request(message: impl Into<String>) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, message.into())
}

/// Image bytes from the `image_file` part, or the `image_url` parameter.
async fn read_image(
    state: &AppState,
    params: &HashMap<String, String>,
    request: Request,
) -> Result<Vec<u8>, (StatusCode, String)> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if is_multipart {
        let mut multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| bad_request(e.to_string()))?;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| bad_request(e.to_string()))?
        {
            if field.name() == Some(IMAGE_FIELD) {
                let bytes = field.bytes().await.map_err(|e| bad_request(e.to_string()))?;
                return Ok(bytes.to_vec());
            }
        }
        return Err(bad_request("missing image_file part"));
    }

    match params.get("image_url") {
        Some(url) => Ok(url.as_bytes().to_vec()),
        None => Err(bad_request("missing image_file or image_url")),
    }
}

async fn add_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    request: Request,
) -> ApiResult {
    let image = read_image(&state, &params, request).await?;
    let mut refs = state.refs.write().await;
    let is_update = match refs.get_mut(&id) {
        Some(existing) => {
            existing.image = image;
            true
        }
        None => {
            refs.insert(id.clone(), Reference { image, offline: false });
            false
        }
    };
    debug!(%id, is_update, "indexed reference image");
    Ok(Json(json!({ "id": id, "is_update": is_update })))
}

async fn remove_image(State(state): State<AppState>, Path(id): Path<String>) -> Json<Value> {
    let existed = state.refs.write().await.remove(&id).is_some();
    Json(json!({ "id": id, "existed": existed }))
}

async fn image_info(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let refs = state.refs.read().await;
    let reference = refs.get(&id).ok_or_else(not_found)?;
    Ok(Json(json!({ "id": id, "is_offline": reference.offline })))
}

async fn set_offline(state: &AppState, id: String, offline: bool) -> ApiResult {
    let mut refs = state.refs.write().await;
    let reference = refs.get_mut(&id).ok_or_else(not_found)?;
    let was_offline = std::mem::replace(&mut reference.offline, offline);
    Ok(Json(json!({ "id": id, "was_offline": was_offline })))
}

async fn make_offline(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    set_offline(&state, id, true).await
}

async fn remove_offline(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    set_offline(&state, id, false).await
}

async fn stats(state: &AppState, offline_only: bool) -> Json<Value> {
    let refs = state.refs.read().await;
    let ids: Vec<&String> = refs
        .iter()
        .filter(|(_, r)| !offline_only || r.offline)
        .map(|(id, _)| id)
        .collect();
    Json(json!({ "count": ids.len(), "ids": ids }))
}

async fn list_refs(State(state): State<AppState>) -> Json<Value> {
    stats(&state, false).await
}

async fn list_offline_refs(State(state): State<AppState>) -> Json<Value> {
    stats(&state, true).await
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    request: Request,
) -> ApiResult {
    let image = read_image(&state, &params, request).await?;
    let refs = state.refs.read().await;
    let result = match refs.iter().find(|(_, r)| r.image == image) {
        Some((id, _)) => json!({ "found": true, "id": id }),
        None => json!({ "found": false }),
    };
    Ok(Json(result))
}

async fn echo(method: Method, Query(params): Query<BTreeMap<String, String>>) -> Json<Value> {
    Json(json!({ "http_verb": method.as_str(), "results": params }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState {
            account: Arc::new(Account::new("key", "secret")),
            nonce: "n0nce".into(),
            opaque: "opaque".into(),
            refs: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    fn authorization(method: &str, uri: &str, secret: &str) -> String {
        let ha1 = md5_hex(&format!("key:{REALM}:{secret}"));
        let ha2 = md5_hex(&format!("{method}:{uri}"));
        let response = md5_hex(&format!("{ha1}:n0nce:00000001:c1:auth:{ha2}"));
        format!(
            r#"Digest username="key", realm="{REALM}", nonce="n0nce", uri="{uri}", algorithm=MD5, response="{response}", qop=auth, nc=00000001, cnonce="c1""#
        )
    }

    #[test]
    fn parses_quoted_and_bare_params() {
        let params = parse_auth_params(r#"username="k", uri="/echo?a=1,2", qop=auth, nc=00000001"#);
        assert_eq!(params["username"], "k");
        assert_eq!(params["uri"], "/echo?a=1,2");
        assert_eq!(params["qop"], "auth");
        assert_eq!(params["nc"], "00000001");
    }

    #[test]
    fn verifies_correct_digest() {
        let header = authorization("GET", "/echo?foo=bar", "secret");
        assert!(state().verify("GET", "/echo?foo=bar", &header));
    }

    #[test]
    fn rejects_wrong_secret_method_or_target() {
        let s = state();
        assert!(!s.verify("GET", "/echo", &authorization("GET", "/echo", "wrong")));
        assert!(!s.verify("POST", "/echo", &authorization("GET", "/echo", "secret")));
        assert!(!s.verify("GET", "/stats/refs", &authorization("GET", "/echo", "secret")));
        assert!(!s.verify("GET", "/echo", "Basic a2V5OnNlY3JldA=="));
    }

    #[test]
    fn rfc2069_digest_without_qop_is_accepted() {
        let ha1 = md5_hex(&format!("key:{REALM}:secret"));
        let ha2 = md5_hex("GET:/echo");
        let response = md5_hex(&format!("{ha1}:n0nce:{ha2}"));
        let header = format!(
            r#"Digest username="key", realm="{REALM}", nonce="n0nce", uri="/echo", response="{response}""#
        );
        assert!(state().verify("GET", "/echo", &header));
    }
}
