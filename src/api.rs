//! HTTP boundary to the lobster API
//!
//! Every call resolves to an [`ApiResponse`]; nothing here returns `Err` or
//! panics on a bad network. Callers must check `status` before using `data`:
//!
//! - transport failure: `status: None, data: None`
//! - non-2xx: `status: Some(code), data: None`
//! - 2xx with a body that does not match the expected shape: logged, then
//!   reported as `status: None` (treated as a generic failure)

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::Session;
use crate::comments::{Comment, Reply};
use crate::debug::{self, cat};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("request did not complete: {0}")]
    Transport(String),
    #[error("not authorised (HTTP {0})")]
    Unauthorized(u16),
    #[error("server answered HTTP {0}")]
    Status(u16),
    #[error("server sent an unusable {0}")]
    Malformed(String),
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub status: Option<u16>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: Some(200),
            data: Some(data),
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            status: Some(200),
            data: None,
        }
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            data: None,
        }
    }

    /// Request never completed (or the body was unusable).
    pub fn failed() -> Self {
        Self {
            status: None,
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(s) if (200..300).contains(&s))
    }

    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        match self.status {
            Some(s) if (200..300).contains(&s) => Ok(self.data),
            Some(s @ (401 | 403)) => Err(ApiError::Unauthorized(s)),
            Some(s) => Err(ApiError::Status(s)),
            None => Err(ApiError::Transport("no usable response".into())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedTokens {
    pub access_token: String,
}

#[async_trait(?Send)]
pub trait AuthApi {
    async fn login(&self, email: &str, password: &str) -> ApiResponse<Tokens>;
    async fn refresh_access_token(&self, refresh_token: &str) -> ApiResponse<RefreshedTokens>;
}

#[async_trait(?Send)]
pub trait CommentsApi {
    async fn post_comments(&self, post_uuid: &str) -> ApiResponse<Vec<Comment>>;
    async fn create_comment(&self, post_uuid: &str, text: &str) -> ApiResponse<Comment>;
    async fn update_comment(&self, uuid: &str, text: &str) -> ApiResponse<Comment>;
    async fn remove_comment(&self, uuid: &str) -> ApiResponse<Comment>;
    async fn undelete_comment(&self, uuid: &str) -> ApiResponse<Comment>;
    async fn create_reply(&self, comment_uuid: &str, text: &str) -> ApiResponse<Reply>;
    async fn update_reply(&self, uuid: &str, text: &str) -> ApiResponse<Reply>;
    async fn remove_reply(&self, uuid: &str) -> ApiResponse<Reply>;
    async fn undelete_reply(&self, uuid: &str) -> ApiResponse<Reply>;
}

static HTTP: OnceLock<reqwest::Client> = OnceLock::new();

fn http_client() -> &'static reqwest::Client {
    HTTP.get_or_init(|| {
        #[cfg(not(target_arch = "wasm32"))]
        {
            reqwest::Client::builder()
                .pool_max_idle_per_host(8)
                .tcp_nodelay(true)
                .build()
                .unwrap_or_default()
        }

        #[cfg(target_arch = "wasm32")]
        {
            reqwest::Client::new()
        }
    })
}

/// reqwest-backed client; the bearer token is read from the session per request.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    timeout: Duration,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout_ms: u64, session: Session) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(timeout_ms),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn request(&self, method: reqwest::Method, path: &str, bearer: Option<&str>) -> reqwest::RequestBuilder {
        let mut rb = http_client().request(method, format!("{}{}", self.base_url, path));
        #[cfg(not(target_arch = "wasm32"))]
        {
            rb = rb.timeout(self.timeout);
        }
        if let Some(token) = bearer {
            rb = rb.bearer_auth(token);
        }
        rb
    }

    fn authed(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let token = self.session.access_token();
        self.request(method, path, token.as_deref())
    }

    async fn handle<T: DeserializeOwned>(&self, rb: reqwest::RequestBuilder, label: &str) -> ApiResponse<T> {
        debug::log(cat::API, format!("-> {label}"));
        let res = match rb.send().await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("[api] {label} transport error: {e}");
                return ApiResponse::failed();
            }
        };

        let status = res.status().as_u16();
        if !res.status().is_success() {
            debug::log(cat::API, format!("<- {label} HTTP {status}"));
            return ApiResponse::with_status(status);
        }

        let body = match res.text().await {
            Ok(b) => b,
            Err(e) => {
                log::warn!("[api] {label} body read failed: {e}");
                return ApiResponse::failed();
            }
        };
        if body.trim().is_empty() {
            return ApiResponse::with_status(status);
        }
        match serde_json::from_str::<T>(&body) {
            Ok(data) => {
                debug::log(cat::API, format!("<- {label} HTTP {status}"));
                ApiResponse {
                    status: Some(status),
                    data: Some(data),
                }
            }
            Err(e) => {
                log::error!("[api] {label} unexpected response shape: {e}");
                ApiResponse::failed()
            }
        }
    }
}

// Request bodies use the server's snake_case field names.

fn new_comment_body(post_uuid: &str, text: &str) -> serde_json::Value {
    json!({ "post_uuid": post_uuid, "content": text })
}

fn new_reply_body(comment_uuid: &str, text: &str) -> serde_json::Value {
    json!({ "comment_uuid": comment_uuid, "content": text })
}

fn content_body(text: &str) -> serde_json::Value {
    json!({ "content": text })
}

#[async_trait(?Send)]
impl AuthApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> ApiResponse<Tokens> {
        let rb = self
            .request(reqwest::Method::POST, "/users", None)
            .json(&json!({ "email": email, "password": password }));
        self.handle(rb, "login").await
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> ApiResponse<RefreshedTokens> {
        let rb = self.request(reqwest::Method::POST, "/tokens", Some(refresh_token));
        self.handle(rb, "refresh").await
    }
}

#[async_trait(?Send)]
impl CommentsApi for ApiClient {
    async fn post_comments(&self, post_uuid: &str) -> ApiResponse<Vec<Comment>> {
        let rb = self.authed(reqwest::Method::GET, &format!("/posts/{post_uuid}/comments"));
        self.handle(rb, "post comments").await
    }

    async fn create_comment(&self, post_uuid: &str, text: &str) -> ApiResponse<Comment> {
        let rb = self
            .authed(reqwest::Method::POST, "/comments")
            .json(&new_comment_body(post_uuid, text));
        self.handle(rb, "create comment").await
    }

    async fn update_comment(&self, uuid: &str, text: &str) -> ApiResponse<Comment> {
        let rb = self
            .authed(reqwest::Method::PUT, &format!("/comments/{uuid}"))
            .json(&content_body(text));
        self.handle(rb, "update comment").await
    }

    async fn remove_comment(&self, uuid: &str) -> ApiResponse<Comment> {
        let rb = self.authed(reqwest::Method::DELETE, &format!("/comments/{uuid}"));
        self.handle(rb, "remove comment").await
    }

    async fn undelete_comment(&self, uuid: &str) -> ApiResponse<Comment> {
        let rb = self.authed(reqwest::Method::PATCH, &format!("/comments/{uuid}"));
        self.handle(rb, "undelete comment").await
    }

    async fn create_reply(&self, comment_uuid: &str, text: &str) -> ApiResponse<Reply> {
        let rb = self
            .authed(reqwest::Method::POST, "/replies")
            .json(&new_reply_body(comment_uuid, text));
        self.handle(rb, "create reply").await
    }

    async fn update_reply(&self, uuid: &str, text: &str) -> ApiResponse<Reply> {
        let rb = self
            .authed(reqwest::Method::PUT, &format!("/replies/{uuid}"))
            .json(&content_body(text));
        self.handle(rb, "update reply").await
    }

    async fn remove_reply(&self, uuid: &str) -> ApiResponse<Reply> {
        let rb = self.authed(reqwest::Method::DELETE, &format!("/replies/{uuid}"));
        self.handle(rb, "remove reply").await
    }

    async fn undelete_reply(&self, uuid: &str) -> ApiResponse<Reply> {
        let rb = self.authed(reqwest::Method::PATCH, &format!("/replies/{uuid}"));
        self.handle(rb, "undelete reply").await
    }
}
