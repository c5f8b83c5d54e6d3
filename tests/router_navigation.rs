//! Router + navigator behaviour as seen by pages

use std::time::{Duration, Instant};

use lobster::navigator::{NavOutcome, Navigator};
use lobster::router::{self, Page, Router};
use lobster::slider::{Direction, Rejected, TRANSITION_MS};
use rand::{Rng, SeedableRng};

#[test]
fn login_to_profile_and_back() {
    let mut r = Router::new("/login");
    r.navigate_to("/profile?userId=5");
    assert_eq!(r.page(), "profile");
    assert_eq!(r.history(), ["/login".to_string()]);
    assert_eq!(router::query_param(r.path(), "userId").as_deref(), Some("5"));

    assert!(r.go_back());
    assert_eq!(r.path(), "/login");
    assert!(r.history().is_empty());
}

#[test]
fn back_undoes_each_navigation_in_order() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let pages = ["/post?uuid=1", "/comments?uuid=1", "/search", "/account", "/", ""];
    let mut r = Router::new("/login");
    let mut visited = vec![r.path().to_string()];
    for _ in 0..50 {
        let p = pages[rng.gen_range(0..pages.len())];
        r.navigate_to(p);
        visited.push(p.to_string());
    }
    while visited.len() > 1 {
        visited.pop();
        assert!(r.go_back());
        assert_eq!(r.path(), visited.last().unwrap());
    }
    // exhausted history is a no-op
    assert!(!r.go_back());
    assert!(!r.go_back());
    assert_eq!(r.path(), "/login");
}

#[test]
fn page_key_is_first_non_empty_segment() {
    let cases = [
        ("/", ""),
        ("", ""),
        ("//post//x", "post"),
        ("/comments?uuid=9", "comments"),
        ("/search#top", "search"),
        ("new-post/draft", "new-post"),
        ("?x=1", ""),
    ];
    for (path, key) in cases {
        assert_eq!(router::page_key(path), key, "path {path:?}");
        // idempotent through the key itself
        assert_eq!(router::page_key(router::page_key(path)), key);
    }
}

#[test]
fn unknown_pages_render_nothing() {
    assert_eq!(Page::from_key("nope"), Page::Empty);
    assert_eq!(Page::from_key(""), Page::Empty);
    for page in Page::ALL {
        assert_eq!(Page::from_key(page.key()), page);
    }
}

#[test]
fn initial_location_keeps_last_segment_and_query() {
    let mut r = Router::new("/login");
    r.navigate_to("/search");
    r.set_initial_location("https://lobster.example/app/post?uuid=3");
    assert_eq!(r.path(), "/post?uuid=3");
    assert!(r.history().is_empty());

    r.set_initial_location("not a url");
    assert_eq!(r.path(), "");
    assert_eq!(r.page(), "");
}

#[test]
fn navigator_drops_requests_during_a_slide() {
    let t0 = Instant::now();
    let mut nav = Navigator::new(Router::new("/post?uuid=1"));
    assert!(matches!(
        nav.go_to_with_back("/comments?uuid=1", Direction::Left, t0),
        NavOutcome::Sliding(_)
    ));
    let dropped = nav.go_to_with_back("/search", Direction::Up, t0);
    assert_eq!(dropped, NavOutcome::Dropped(Rejected::InTransition));
    assert_eq!(nav.router().path(), "/comments?uuid=1");
    assert_eq!(nav.go_back(None, t0), NavOutcome::Dropped(Rejected::InTransition));

    let t1 = t0 + Duration::from_millis(TRANSITION_MS);
    assert!(nav.poll(t1).is_some());
    assert_eq!(nav.slider().active_key(), "comments");
    assert!(nav.can_go_back());
}

#[test]
fn same_page_navigation_replaces_without_sliding() {
    let t0 = Instant::now();
    let mut nav = Navigator::new(Router::new("/post?uuid=1"));
    let out = nav.go_to_with_back("/post?uuid=2", Direction::Left, t0);
    assert_eq!(out, NavOutcome::Replaced);
    assert!(!nav.slider().in_transition());
    assert_eq!(nav.router().path(), "/post?uuid=2");
    assert_eq!(nav.router().history(), ["/post?uuid=1".to_string()]);
}

#[test]
fn go_to_without_history_is_not_reachable_by_back() {
    let t0 = Instant::now();
    let mut nav = Navigator::new(Router::new("/login"));
    assert!(matches!(nav.go_to("/profile", Direction::Up, t0), NavOutcome::Sliding(_)));
    nav.complete();
    assert!(!nav.can_go_back());
    assert_eq!(nav.go_back(None, t0), NavOutcome::NoHistory);

    let snap = nav.snapshot();
    assert_eq!(snap.router.page, "profile");
    assert_eq!(snap.flop_page, Page::Profile);
    // outgoing page stays mounted in the inactive slot
    assert_eq!(snap.flip_page, Page::Login);
}
