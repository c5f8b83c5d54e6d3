//! Path router for the lobster client
//!
//! Tracks where the user is (current path), where they came from (history
//! stack), and which page that maps to (page key). The address bar is kept in
//! sync through a [`UrlSink`], but native browser history is never read back.
//!
//! ## Page keys
//!
//! The page key is the first non-empty `/` segment of the path, ignoring any
//! query or fragment:
//!
//! - `/post?uuid=123` -> `post`
//! - `//profile/5` -> `profile`
//! - `/` or `` -> `` (renders [`Page::Empty`])
//!
//! ## Example
//!
//! ```rust
//! use lobster::router::Router;
//!
//! let mut router = Router::new("/login");
//! router.navigate_to("/profile?userId=5");
//! assert_eq!(router.page(), "profile");
//! assert_eq!(router.history(), ["/login"]);
//!
//! router.go_back();
//! assert_eq!(router.path(), "/login");
//! assert!(router.history().is_empty());
//! ```

use serde::Serialize;

use crate::debug::{self, cat};

/// Landing path used before the browser location has been read.
pub const INITIAL_PATH: &str = "/login";

/// Strip query and fragment from URL path
#[inline]
fn strip_query_frag(s: &str) -> &str {
    match s.find(['?', '#']) {
        Some(i) => &s[..i],
        None => s,
    }
}

/// Derive the page key from a path.
///
/// Pure and idempotent; malformed input degrades to an empty key.
pub fn page_key(path: &str) -> &str {
    strip_query_frag(path.trim())
        .split('/')
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

/// Look up a query parameter (`?name=value`) in a path, URL-decoded.
pub fn query_param(path: &str, name: &str) -> Option<String> {
    let query = path.split_once('?')?.1;
    let query = query.split('#').next().unwrap_or_default();
    for kv in query.split('&') {
        let mut it = kv.splitn(2, '=');
        let k = it.next().unwrap_or_default();
        if k != name {
            continue;
        }
        let v = it.next().unwrap_or_default();
        return Some(
            urlencoding::decode(v)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| v.to_string()),
        );
    }
    None
}

/// Last `/` segment of the path portion (query and fragment excluded).
pub fn last_path_segment(path: &str) -> &str {
    let p = strip_query_frag(path);
    match p.rfind('/') {
        Some(i) => &p[i + 1..],
        None => p,
    }
}

/// Derive the initial router path from a full location (`window.location.href`).
///
/// Only the last path segment is kept, together with its query string:
/// `https://host/app/post?uuid=1` becomes `/post?uuid=1`. Returns `None` when
/// the input is not a recognisable absolute URL or absolute path.
pub fn path_from_location(href: &str) -> Option<String> {
    let s = href.trim();
    let rest = if let Some(pos) = s.find("://") {
        let after = &s[pos + 3..];
        match after.find(['/', '?', '#']) {
            Some(i) => &after[i..],
            None => "/",
        }
    } else if s.starts_with('/') {
        s
    } else {
        return None;
    };

    let (pathname, tail) = match rest.find(['?', '#']) {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    let last = match pathname.rfind('/') {
        Some(i) => &pathname[i + 1..],
        None => pathname,
    };
    Some(format!("/{last}{tail}"))
}

/// Screens reachable through the router.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    Profile,
    Account,
    Login,
    AcceptInvitation,
    ResetPassword,
    Post,
    NewPost,
    EditPost,
    Comments,
    Search,
    /// Unknown or empty page key; renders nothing.
    Empty,
}

impl Page {
    pub const ALL: [Page; 10] = [
        Page::Profile,
        Page::Account,
        Page::Login,
        Page::AcceptInvitation,
        Page::ResetPassword,
        Page::Post,
        Page::NewPost,
        Page::EditPost,
        Page::Comments,
        Page::Search,
    ];

    pub fn from_key(key: &str) -> Page {
        match key {
            "profile" => Page::Profile,
            "account" => Page::Account,
            "login" => Page::Login,
            "accept-invitation" => Page::AcceptInvitation,
            "reset-password" => Page::ResetPassword,
            "post" => Page::Post,
            "new-post" => Page::NewPost,
            "edit-post" => Page::EditPost,
            "comments" => Page::Comments,
            "search" => Page::Search,
            _ => Page::Empty,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Page::Profile => "profile",
            Page::Account => "account",
            Page::Login => "login",
            Page::AcceptInvitation => "accept-invitation",
            Page::ResetPassword => "reset-password",
            Page::Post => "post",
            Page::NewPost => "new-post",
            Page::EditPost => "edit-post",
            Page::Comments => "comments",
            Page::Search => "search",
            Page::Empty => "",
        }
    }
}

/// Mirrors the router path into the visible URL without reloading.
pub trait UrlSink {
    fn push(&mut self, path: &str);
}

/// Sink for hosts without an address bar (native, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoUrl;

impl UrlSink for NoUrl {
    fn push(&mut self, _path: &str) {}
}

/// `history.pushState` on the browser window.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserUrl;

#[cfg(target_arch = "wasm32")]
impl UrlSink for BrowserUrl {
    fn push(&mut self, path: &str) {
        if let Some(win) = web_sys::window() {
            if let Ok(hist) = win.history() {
                let _ = hist.push_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(path));
            }
        }
    }
}

/// Read the initial path from `window.location` (falls back to empty).
#[cfg(target_arch = "wasm32")]
pub fn browser_initial_path() -> String {
    web_sys::window()
        .and_then(|w| w.location().href().ok())
        .and_then(|href| path_from_location(&href))
        .unwrap_or_default()
}

/// Snapshot of the router, suitable for rendering or serialising to JS.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RouterState {
    pub path: String,
    pub history: Vec<String>,
    pub page: String,
}

pub struct Router {
    path: String,
    history: Vec<String>,
    url: Box<dyn UrlSink>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("path", &self.path)
            .field("history", &self.history)
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(INITIAL_PATH)
    }
}

impl Router {
    pub fn new(initial: &str) -> Self {
        Self::with_url_sink(initial, Box::new(NoUrl))
    }

    pub fn with_url_sink(initial: &str, url: Box<dyn UrlSink>) -> Self {
        Self {
            path: initial.to_string(),
            history: Vec::new(),
            url,
        }
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Page key of the current path; recomputed on every call.
    #[inline]
    pub fn page(&self) -> &str {
        page_key(&self.path)
    }

    #[inline]
    pub fn current_page(&self) -> Page {
        Page::from_key(self.page())
    }

    /// Prior paths, oldest first.
    #[inline]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    #[inline]
    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn state(&self) -> RouterState {
        RouterState {
            path: self.path.clone(),
            history: self.history.clone(),
            page: self.page().to_string(),
        }
    }

    /// Reset to a path read from the browser at startup. History is emptied.
    pub fn set_initial_path(&mut self, path: &str) {
        self.path = path.to_string();
        self.history.clear();
        debug::log(cat::ROUTER, format!("initial path {path:?}"));
    }

    /// Same as [`Router::set_initial_path`], parsing a full location first.
    /// An unparseable location leaves an empty path.
    pub fn set_initial_location(&mut self, href: &str) {
        let path = path_from_location(href).unwrap_or_default();
        self.set_initial_path(&path);
    }

    /// Push the current path onto history and move to `path`.
    ///
    /// The router does not deduplicate; navigating to the current path pushes
    /// it onto history like any other path.
    pub fn navigate_to(&mut self, path: &str) {
        let prev = std::mem::replace(&mut self.path, path.to_string());
        debug::log(cat::ROUTER, format!("push {prev:?} -> {path:?}"));
        self.history.push(prev);
        self.url.push(path);
    }

    /// Move to `path` without making the current path reachable through `go_back`.
    pub fn navigate_without_history(&mut self, path: &str) {
        self.path = path.to_string();
        debug::log(cat::ROUTER, format!("goto {path:?} (no history)"));
        self.url.push(path);
    }

    /// Pop the most recent history entry into the current path.
    ///
    /// Returns `false` (and changes nothing) when history is empty.
    pub fn go_back(&mut self) -> bool {
        let Some(prev) = self.history.pop() else {
            return false;
        };
        debug::log(cat::ROUTER, format!("pop -> {prev:?}"));
        self.path = prev;
        self.url.push(&self.path);
        true
    }

    /// Drop all history, keeping the current path.
    pub fn clear_history(&mut self) {
        self.history.clear();
        debug::log(cat::ROUTER, "history cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorded(Arc<Mutex<Vec<String>>>);

    impl UrlSink for Recorded {
        fn push(&mut self, path: &str) {
            self.0.lock().unwrap().push(path.to_string());
        }
    }

    #[test]
    fn test_page_key() {
        assert_eq!(page_key("/post?uuid=123"), "post");
        assert_eq!(page_key("/profile/5"), "profile");
        assert_eq!(page_key("//comments"), "comments");
        assert_eq!(page_key("search"), "search");
        assert_eq!(page_key("/new-post#top"), "new-post");
        assert_eq!(page_key("/"), "");
        assert_eq!(page_key(""), "");
        assert_eq!(page_key("/?x=1"), "");
    }

    #[test]
    fn test_page_from_key() {
        for page in Page::ALL {
            assert_eq!(Page::from_key(page.key()), page);
        }
        assert_eq!(Page::from_key("nope"), Page::Empty);
        assert_eq!(Page::from_key(""), Page::Empty);
    }

    #[test]
    fn test_query_param() {
        assert_eq!(query_param("/post?uuid=123", "uuid").as_deref(), Some("123"));
        assert_eq!(
            query_param("/search?q=power%20drill&page=2", "q").as_deref(),
            Some("power drill")
        );
        assert_eq!(query_param("/search?q=x#frag", "q").as_deref(), Some("x"));
        assert_eq!(query_param("/post", "uuid"), None);
        assert_eq!(query_param("/post?other=1", "uuid"), None);
    }

    #[test]
    fn test_last_path_segment() {
        assert_eq!(last_path_segment("/accept-invitation/abc123?x=1"), "abc123");
        assert_eq!(last_path_segment("/login"), "login");
        assert_eq!(last_path_segment("/"), "");
    }

    #[test]
    fn test_path_from_location() {
        assert_eq!(
            path_from_location("https://lobster.example/app/post?uuid=1").as_deref(),
            Some("/post?uuid=1")
        );
        assert_eq!(
            path_from_location("http://127.0.0.1:5173/login").as_deref(),
            Some("/login")
        );
        assert_eq!(path_from_location("http://127.0.0.1:5173").as_deref(), Some("/"));
        assert_eq!(path_from_location("/comments").as_deref(), Some("/comments"));
        assert_eq!(path_from_location("not a url"), None);
        assert_eq!(path_from_location(""), None);
    }

    #[test]
    fn test_initial_location_unparseable_keeps_empty_path() {
        let mut r = Router::new("/login");
        r.navigate_to("/post");
        r.set_initial_location("garbage");
        assert_eq!(r.path(), "");
        assert_eq!(r.page(), "");
        assert!(r.history().is_empty());
    }

    #[test]
    fn test_navigate_and_back() {
        let url = Recorded::default();
        let mut r = Router::with_url_sink("/login", Box::new(url.clone()));
        r.navigate_to("/profile?userId=5");
        assert_eq!(r.page(), "profile");
        assert_eq!(r.history(), ["/login"]);
        assert!(r.go_back());
        assert_eq!(r.path(), "/login");
        assert!(r.history().is_empty());
        assert_eq!(*url.0.lock().unwrap(), vec!["/profile?userId=5", "/login"]);
    }

    #[test]
    fn test_go_back_on_empty_history_is_noop() {
        let mut r = Router::new("/login");
        assert!(!r.go_back());
        assert_eq!(r.path(), "/login");
    }

    #[test]
    fn test_navigate_without_history() {
        let mut r = Router::new("/login");
        r.navigate_without_history("/post?uuid=1");
        assert_eq!(r.page(), "post");
        assert!(!r.can_go_back());
    }

    #[test]
    fn test_clear_history_keeps_path() {
        let mut r = Router::new("/login");
        r.navigate_to("/post");
        r.navigate_to("/comments");
        r.clear_history();
        assert_eq!(r.path(), "/comments");
        assert!(!r.go_back());
    }

    #[test]
    fn test_no_dedup() {
        let mut r = Router::new("/login");
        r.navigate_to("/login");
        assert_eq!(r.history(), ["/login"]);
    }

    #[test]
    fn test_state_snapshot() {
        let mut r = Router::new("/login");
        r.navigate_to("/search?q=saw");
        let s = r.state();
        assert_eq!(s.page, "search");
        assert_eq!(s.path, "/search?q=saw");
        assert_eq!(s.history, vec!["/login".to_string()]);
    }
}
