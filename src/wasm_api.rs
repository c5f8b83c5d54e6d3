//! JS -> Rust surface for the browser client.
//!
//! ```javascript
//! import init, { WasmNavigator, WasmComments, lobster_start_session } from "./lobster.js";
//! await init();
//! lobster_start_session("https://api.example");
//! const nav = new WasmNavigator("slider");
//! nav.handle_action_json(JSON.stringify({ type: "GoTo", path: "/post?uuid=1", direction: "left" }));
//! window.addEventListener("lobster:navigated", () => render(JSON.parse(nav.snapshot_json())));
//! ```
//!
//! Handles are `Rc<RefCell<..>>` inside so timer and network completions can
//! reach the same state after the call that started them has returned.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_time::{Duration, Instant};

use crate::api::{ApiClient, DEFAULT_SERVER_URL};
use crate::auth::{self, Session};
use crate::comments::{Action, Commenter, CommentsScreen, Composer, Pending};
use crate::navigator::{NavOutcome, NavSnapshot, Navigator};
use crate::notify::Info;
use crate::router::{browser_initial_path, BrowserUrl, Router, INITIAL_PATH};
use crate::slider::{Controller, Direction, TRANSITION_MS};
use crate::util::liveness::Liveness;

pub const NAVIGATED_EVENT: &str = "lobster:navigated";
pub const COMMENTS_CHANGED_EVENT: &str = "lobster:comments-changed";

const TIMEOUT_MS: u64 = 10_000;

thread_local! {
    static SESSION: RefCell<Option<Session>> = const { RefCell::new(None) };
    static SERVER_URL: RefCell<String> = RefCell::new(DEFAULT_SERVER_URL.to_string());
    static REFRESH_LOOP: RefCell<Option<Liveness>> = const { RefCell::new(None) };
}

fn session() -> Session {
    SESSION.with(|s| s.borrow_mut().get_or_insert_with(Session::browser).clone())
}

fn api_client() -> ApiClient {
    let url = SERVER_URL.with(|u| u.borrow().clone());
    ApiClient::new(&url, TIMEOUT_MS, session())
}

fn fire(name: &str) {
    if let Some(win) = web_sys::window() {
        if let Ok(ev) = web_sys::Event::new(name) {
            let _ = win.dispatch_event(&ev);
        }
    }
}

fn to_json<T: Serialize>(value: &T, what: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        log::error!("Failed to serialize {what}: {e}");
        "{}".to_string()
    })
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
    crate::debug::init_from_url_and_storage_once();
}

/// Restore stored tokens, refresh once, then keep refreshing every 15 minutes.
#[wasm_bindgen]
pub fn lobster_start_session(server_url: String) {
    if !server_url.is_empty() {
        SERVER_URL.with(|u| *u.borrow_mut() = server_url);
    }
    let session = session();
    let refresh = session.bootstrap_from_storage();
    let alive = REFRESH_LOOP.with(|l| Liveness::renew(&mut l.borrow_mut()));
    spawn_local(async move {
        let client = api_client();
        if refresh.is_some() {
            let _ = session.refresh(&client).await;
        }
        auth::run_refresh_loop(session, &client, auth::REFRESH_INTERVAL, alive).await;
    });
}

#[wasm_bindgen]
pub fn lobster_is_logged_in() -> bool {
    session().is_logged_in()
}

#[wasm_bindgen]
pub fn lobster_logout() {
    session().logout();
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum NavAction {
    /// Navigate and keep the current page reachable through back.
    GoTo { path: String, direction: Direction },
    /// Navigate without touching history.
    Replace { path: String, direction: Direction },
    Back {
        #[serde(default)]
        direction: Option<Direction>,
    },
    ClearHistory,
}

/// Router + slider, with slide classes applied to a container element.
#[wasm_bindgen]
pub struct WasmNavigator {
    inner: Rc<RefCell<Navigator>>,
    container_id: String,
    duration: Duration,
}

#[wasm_bindgen]
impl WasmNavigator {
    #[wasm_bindgen(constructor)]
    pub fn new(container_id: String) -> WasmNavigator {
        let mut initial = browser_initial_path();
        if initial.is_empty() {
            initial = INITIAL_PATH.to_string();
        }
        let router = Router::with_url_sink(&initial, Box::new(BrowserUrl));
        let duration = Duration::from_millis(TRANSITION_MS);
        let slider = Controller::new(router.page()).with_duration(duration);
        log::info!("[router] starting at {initial}");
        WasmNavigator {
            inner: Rc::new(RefCell::new(Navigator::with_controller(router, slider))),
            container_id,
            duration,
        }
    }

    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> String {
        let snap: NavSnapshot = self.inner.borrow().snapshot();
        to_json(&snap, "NavSnapshot")
    }

    /// Apply a JSON-encoded [`NavAction`]; returns the new snapshot.
    #[wasm_bindgen]
    pub fn handle_action_json(&self, action_json: String) -> String {
        match serde_json::from_str::<NavAction>(&action_json) {
            Ok(action) => self.apply(action),
            Err(e) => log::warn!("Failed to deserialize NavAction ({e}): {action_json:?}"),
        }
        self.snapshot_json()
    }
}

impl WasmNavigator {
    fn apply(&self, action: NavAction) {
        let now = Instant::now();
        let outcome = {
            let mut nav = self.inner.borrow_mut();
            match action {
                NavAction::GoTo { path, direction } => nav.go_to_with_back(&path, direction, now),
                NavAction::Replace { path, direction } => nav.go_to(&path, direction, now),
                NavAction::Back { direction } => nav.go_back(direction, now),
                NavAction::ClearHistory => {
                    nav.clear_history();
                    NavOutcome::Replaced
                }
            }
        };
        // the host mounts the incoming page on this event, before any class is set
        fire(NAVIGATED_EVENT);
        match outcome {
            NavOutcome::Sliding(t) => self.schedule_slide(t.class),
            NavOutcome::Dropped(reason) => {
                crate::debug::log(crate::debug::cat::ROUTER, format!("dropped: {reason}"));
            }
            NavOutcome::Replaced | NavOutcome::NoHistory => {}
        }
    }

    /// Apply `class` on the next task so the browser paints the start
    /// position first, then settle once the transition has run.
    fn schedule_slide(&self, class: &'static str) {
        let inner = Rc::clone(&self.inner);
        let id = self.container_id.clone();
        let delay = self.duration;
        spawn_local(async move {
            gloo_timers::future::sleep(Duration::ZERO).await;
            set_class(&id, class);
            gloo_timers::future::sleep(delay).await;
            let settled = inner.borrow_mut().complete();
            if let Some(s) = settled {
                set_class(&id, s.class);
                fire(NAVIGATED_EVENT);
            }
        });
    }
}

fn set_class(id: &str, class: &str) {
    let el = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(id));
    match el {
        Some(el) => el.set_class_name(class),
        None => log::warn!("[slider] container #{id} not found"),
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum CommentsAction {
    SetText { text: String },
    SetActiveComment { uuid: String },
    EditComment { uuid: String, text: String },
    EditReply { uuid: String, parent: String, text: String },
    ClearAll,
    Submit,
    Post { text: String },
    RemoveComment { uuid: String },
    UndeleteComment { uuid: String },
    RemoveReply { parent: String, uuid: String },
    UndeleteReply { parent: String, uuid: String },
    CloseModal,
}

#[derive(Serialize)]
struct CommentsSnapshot<'a> {
    comments: &'a [crate::comments::Comment],
    composer: &'a Composer,
    button_text: &'static str,
    placeholder: &'static str,
    submit_disabled: bool,
    modal: Option<&'a Info>,
}

#[wasm_bindgen]
pub struct WasmComments {
    screen: Rc<RefCell<CommentsScreen>>,
}

#[wasm_bindgen]
impl WasmComments {
    #[wasm_bindgen(constructor)]
    pub fn new(post_uuid: String) -> WasmComments {
        let screen = Rc::new(RefCell::new(CommentsScreen::new(post_uuid)));
        let handle = Rc::clone(&screen);
        let alive = screen.borrow().liveness();
        spawn_local(async move {
            let client = api_client();
            let post = handle.borrow().post_uuid().to_string();
            let res = crate::api::CommentsApi::post_comments(&client, &post).await.into_result();
            if !alive.is_alive() {
                return;
            }
            handle.borrow_mut().apply_loaded(res);
            fire(COMMENTS_CHANGED_EVENT);
        });
        WasmComments { screen }
    }

    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> String {
        let screen = self.screen.borrow();
        let composer = screen.composer();
        let snap = CommentsSnapshot {
            comments: screen.comments(),
            composer,
            button_text: composer.button_text(),
            placeholder: composer.placeholder(),
            submit_disabled: composer.submit_disabled(),
            modal: screen.modal().current(),
        };
        to_json(&snap, "CommentsSnapshot")
    }

    #[wasm_bindgen]
    pub fn handle_action_json(&self, action_json: String) -> String {
        match serde_json::from_str::<CommentsAction>(&action_json) {
            Ok(action) => self.apply(action),
            Err(e) => log::warn!("Failed to deserialize CommentsAction ({e}): {action_json:?}"),
        }
        self.snapshot_json()
    }

    /// The page is unmounting; responses still in flight are dropped.
    #[wasm_bindgen]
    pub fn teardown(&self) {
        self.screen.borrow().teardown();
    }
}

impl WasmComments {
    fn apply(&self, action: CommentsAction) {
        let begun = {
            let mut s = self.screen.borrow_mut();
            match action {
                CommentsAction::SetText { text } => {
                    s.dispatch(Action::SetText(text));
                    Ok(None)
                }
                CommentsAction::SetActiveComment { uuid } => {
                    s.dispatch(Action::SetActiveComment(uuid));
                    Ok(None)
                }
                CommentsAction::EditComment { uuid, text } => {
                    s.dispatch(Action::EditComment { uuid, text });
                    Ok(None)
                }
                CommentsAction::EditReply { uuid, parent, text } => {
                    s.dispatch(Action::EditReply { uuid, parent, text });
                    Ok(None)
                }
                CommentsAction::ClearAll => {
                    s.dispatch(Action::ClearAll);
                    Ok(None)
                }
                CommentsAction::CloseModal => {
                    s.modal_mut().close();
                    Ok(None)
                }
                CommentsAction::Submit => s.begin_submit(),
                CommentsAction::Post { text } => Ok(Some(s.begin_create_comment(&text, Commenter::default()))),
                CommentsAction::RemoveComment { uuid } => s.begin_remove_comment(&uuid).map(Some),
                CommentsAction::UndeleteComment { uuid } => s.begin_undelete_comment(&uuid).map(Some),
                CommentsAction::RemoveReply { parent, uuid } => s.begin_remove_reply(&parent, &uuid).map(Some),
                CommentsAction::UndeleteReply { parent, uuid } => {
                    s.begin_undelete_reply(&parent, &uuid).map(Some)
                }
            }
        };
        match begun {
            Ok(Some(pending)) => self.send(pending),
            Ok(None) => {}
            Err(e) => log::warn!("[comments] refused: {e}"),
        }
        fire(COMMENTS_CHANGED_EVENT);
    }

    fn send(&self, pending: Pending) {
        let screen = Rc::clone(&self.screen);
        spawn_local(async move {
            let client = api_client();
            let outcome = pending.send(&client).await;
            screen.borrow_mut().finish(pending, outcome);
            fire(COMMENTS_CHANGED_EVENT);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn container(id: &str) -> web_sys::Element {
        let doc = web_sys::window().and_then(|w| w.document()).expect("document");
        let el = doc.create_element("div").expect("div");
        el.set_id(id);
        doc.document_element()
            .expect("root element")
            .append_child(&el)
            .expect("append container");
        el
    }

    #[wasm_bindgen_test]
    async fn slide_class_lands_after_navigation_event() {
        let el = container("lobster-slide-test");
        let nav = WasmNavigator::new("lobster-slide-test".into());
        nav.handle_action_json(r#"{"type":"GoTo","path":"/post","direction":"left"}"#.into());
        // host has been told to mount the page; the start position is still unstyled
        assert_eq!(el.class_name(), "");
        gloo_timers::future::sleep(Duration::from_millis(20)).await;
        assert_eq!(el.class_name(), "slide-left");
    }

    #[wasm_bindgen_test]
    fn restarting_session_stops_old_refresh_loop() {
        lobster_start_session(String::new());
        let first = REFRESH_LOOP.with(|l| l.borrow().clone()).expect("refresh loop");
        lobster_start_session(String::new());
        let second = REFRESH_LOOP.with(|l| l.borrow().clone()).expect("refresh loop");
        assert!(!first.is_alive());
        assert!(second.is_alive());
    }
}

