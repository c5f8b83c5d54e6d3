//! Session tokens for the lobster client.
//! - Tokens live in the key/value store under `accessToken` / `refreshToken`
//! - Identity (user id, permissions) comes from the access token's JWT claims
//! - Every access-token change is broadcast (`lobster:access-token` on web)
//! - A failed refresh forces a logout
//! - Debug category: [lobster][auth]
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine;
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::api::{ApiError, AuthApi};
use crate::debug::{self, cat};
use crate::storage::{KeyValueStore, MemoryStore};
use crate::util::liveness::Liveness;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Browser-wide event fired whenever the access token changes.
pub const TOKEN_CHANGED_EVENT: &str = "lobster:access-token";

/// Access tokens are refreshed on this cadence regardless of activity.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user_id: Option<String>,
    pub permissions: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct Claims {
    #[serde(default)]
    user_id: serde_json::Value,
    #[serde(default)]
    permissions: serde_json::Value,
}

/// Decode the (unverified) payload segment of a JWT into `(user_id, permissions)`.
pub fn decode_claims(jwt: &str) -> Option<(String, serde_json::Value)> {
    let payload = jwt.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    let user_id = match claims.user_id {
        serde_json::Value::String(s) if !s.is_empty() => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some((user_id, claims.permissions))
}

/// Shared handle to the signed-in identity. Clones share state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<AuthState>>,
    store: Arc<dyn KeyValueStore>,
    events: broadcast::Sender<Option<String>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("logged_in", &self.is_logged_in())
            .finish()
    }
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Mutex::new(AuthState::default())),
            store,
            events,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    #[cfg(target_arch = "wasm32")]
    pub fn browser() -> Self {
        Self::new(Arc::new(crate::storage::LocalStorage))
    }

    #[inline]
    pub fn state(&self) -> AuthState {
        if let Ok(guard) = self.inner.lock() {
            guard.clone()
        } else {
            AuthState::default()
        }
    }

    #[inline]
    pub fn access_token(&self) -> Option<String> {
        self.state().access_token.filter(|t| !t.is_empty())
    }

    #[inline]
    pub fn refresh_token(&self) -> Option<String> {
        self.state().refresh_token.filter(|t| !t.is_empty())
    }

    #[inline]
    pub fn user_id(&self) -> Option<String> {
        self.state().user_id
    }

    pub fn is_logged_in(&self) -> bool {
        let s = self.state();
        s.user_id.is_some() && matches!(s.access_token.as_deref(), Some(t) if !t.is_empty())
    }

    /// Receive the new access token (or `None` on logout) after every change.
    pub fn subscribe(&self) -> broadcast::Receiver<Option<String>> {
        self.events.subscribe()
    }

    /// Restore tokens persisted by an earlier visit. Returns the refresh token
    /// so the caller can exchange it right away.
    pub fn bootstrap_from_storage(&self) -> Option<String> {
        let access = self.store.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty());
        let refresh = self.store.get(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty());
        if let Ok(mut s) = self.inner.lock() {
            s.refresh_token = refresh.clone();
            if let Some(tok) = access {
                apply_access_token(&mut s, tok);
            }
        }
        debug::log(cat::AUTH, format!("bootstrap (refresh token: {})", refresh.is_some()));
        refresh
    }

    /// Adopt a refresh token obtained elsewhere (CLI flag, config file).
    pub fn restore_refresh_token(&self, refresh_token: String) {
        self.store.set(REFRESH_TOKEN_KEY, &refresh_token);
        if let Ok(mut s) = self.inner.lock() {
            s.refresh_token = Some(refresh_token);
        }
    }

    pub fn set_tokens(&self, access_token: String, refresh_token: String) {
        self.store.set(REFRESH_TOKEN_KEY, &refresh_token);
        if let Ok(mut s) = self.inner.lock() {
            s.refresh_token = Some(refresh_token);
        }
        self.set_access_token(access_token);
    }

    pub fn set_access_token(&self, access_token: String) {
        self.store.set(ACCESS_TOKEN_KEY, &access_token);
        if let Ok(mut s) = self.inner.lock() {
            apply_access_token(&mut s, access_token.clone());
        }
        debug::log(cat::AUTH, "access token set");
        self.announce(Some(access_token));
    }

    pub fn logout(&self) {
        if let Ok(mut s) = self.inner.lock() {
            *s = AuthState::default();
        }
        self.store.remove(ACCESS_TOKEN_KEY);
        self.store.remove(REFRESH_TOKEN_KEY);
        debug::log(cat::AUTH, "logged out");
        self.announce(None);
    }

    pub async fn login<A: AuthApi + ?Sized>(&self, api: &A, email: &str, password: &str) -> Result<(), ApiError> {
        match api.login(email, password).await.into_result()? {
            Some(tokens) => {
                self.set_tokens(tokens.access_token, tokens.refresh_token);
                Ok(())
            }
            None => {
                log::error!("[auth] login succeeded without tokens");
                Err(ApiError::Transport("login response had no tokens".into()))
            }
        }
    }

    /// Exchange the refresh token for a new access token. Any failure logs out.
    pub async fn refresh<A: AuthApi + ?Sized>(&self, api: &A) -> Result<(), ApiError> {
        let Some(refresh_token) = self.refresh_token() else {
            self.logout();
            return Err(ApiError::Unauthorized(401));
        };
        let outcome = api.refresh_access_token(&refresh_token).await.into_result();
        match outcome {
            Ok(Some(t)) => {
                self.set_access_token(t.access_token);
                Ok(())
            }
            Ok(None) => {
                log::warn!("[auth] refresh returned no token; logging out");
                self.logout();
                Err(ApiError::Transport("refresh response had no token".into()))
            }
            Err(e) => {
                log::warn!("[auth] refresh failed ({e}); logging out");
                self.logout();
                Err(e)
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn announce(&self, token: Option<String>) {
        let _ = self.events.send(token);
        if let Some(win) = web_sys::window() {
            if let Ok(ev) = web_sys::Event::new(TOKEN_CHANGED_EVENT) {
                let _ = win.dispatch_event(&ev);
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn announce(&self, token: Option<String>) {
        // no receivers is fine
        let _ = self.events.send(token);
    }
}

fn apply_access_token(s: &mut AuthState, token: String) {
    match decode_claims(&token) {
        Some((user_id, permissions)) => {
            s.user_id = Some(user_id);
            s.permissions = permissions;
        }
        None => {
            log::warn!("[auth] access token has no usable claims");
            s.user_id = None;
            s.permissions = serde_json::Value::Null;
        }
    }
    s.access_token = Some(token);
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        async fn sleep(d: Duration) {
            gloo_timers::future::sleep(d).await;
        }
    } else {
        async fn sleep(d: Duration) {
            tokio::time::sleep(d).await;
        }
    }
}

/// Refresh the access token every `interval` while `alive` holds.
///
/// Ticks without a refresh token are skipped, so the loop can start before
/// the user signs in.
pub async fn run_refresh_loop<A: AuthApi + ?Sized>(
    session: Session,
    api: &A,
    interval: Duration,
    alive: Liveness,
) {
    loop {
        sleep(interval).await;
        if !alive.is_alive() {
            debug::log(cat::AUTH, "refresh loop stopped");
            return;
        }
        if session.refresh_token().is_some() {
            let _ = session.refresh(api).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(payload: &str) -> String {
        let enc = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!("{}.{}.sig", enc.encode(r#"{"alg":"none"}"#), enc.encode(payload))
    }

    #[test]
    fn decodes_string_and_numeric_user_ids() {
        let (id, perms) = decode_claims(&jwt(r#"{"user_id":"u-1","permissions":[1,2]}"#)).unwrap();
        assert_eq!(id, "u-1");
        assert_eq!(perms, serde_json::json!([1, 2]));
        let (id, _) = decode_claims(&jwt(r#"{"user_id":42}"#)).unwrap();
        assert_eq!(id, "42");
    }

    #[test]
    fn rejects_garbage_tokens() {
        assert!(decode_claims("nope").is_none());
        assert!(decode_claims("a.!!!.c").is_none());
        assert!(decode_claims(&jwt(r#"{"sub":"x"}"#)).is_none());
    }

    #[test]
    fn tokens_persist_and_clear() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(store.clone());
        let mut rx = session.subscribe();
        session.set_tokens(jwt(r#"{"user_id":"7"}"#), "r1".into());
        assert!(session.is_logged_in());
        assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("r1"));
        assert!(store.get(ACCESS_TOKEN_KEY).is_some());
        assert!(matches!(rx.try_recv(), Ok(Some(_))));

        session.logout();
        assert!(!session.is_logged_in());
        assert_eq!(store.get(REFRESH_TOKEN_KEY), None);
        assert_eq!(store.get(ACCESS_TOKEN_KEY), None);
        assert_eq!(rx.try_recv().ok(), Some(None));
    }

    #[test]
    fn bootstrap_reads_store() {
        let store = Arc::new(MemoryStore::new());
        store.set(ACCESS_TOKEN_KEY, &jwt(r#"{"user_id":"9"}"#));
        store.set(REFRESH_TOKEN_KEY, "r9");
        let session = Session::new(store);
        assert_eq!(session.bootstrap_from_storage().as_deref(), Some("r9"));
        assert_eq!(session.user_id().as_deref(), Some("9"));
    }

    #[test]
    fn bootstrap_with_empty_store() {
        let session = Session::in_memory();
        assert_eq!(session.bootstrap_from_storage(), None);
        assert!(!session.is_logged_in());
    }
}
