//! Filterable diagnostic logging for the client core
//!
//! Categories: ROUTER, SLIDER, SYNC, AUTH, API, NOTIFY
//! Enable via: ?lbdebug=all or localStorage.setItem('lobster.debug','router,sync')
//! Native: LOBSTER_DEBUG=router,slider
//!
//! Messages are forwarded to the `log` facade under the `lobster::<category>`
//! target, so the active logger (env_logger / wasm-logger) decides where they land.

use std::sync::atomic::{AtomicU32, Ordering};

pub mod cat {
    pub const ROUTER: u32 = 1 << 0;
    pub const SLIDER: u32 = 1 << 1;
    pub const SYNC: u32 = 1 << 2;
    pub const AUTH: u32 = 1 << 3;
    pub const API: u32 = 1 << 4;
    pub const NOTIFY: u32 = 1 << 5;
    pub const ALL: u32 = 0xffff_ffff;
}

static MASK: AtomicU32 = AtomicU32::new(0);

#[inline]
pub fn mask() -> u32 {
    MASK.load(Ordering::Relaxed)
}

#[inline]
pub fn set(mask: u32) {
    MASK.store(mask, Ordering::Relaxed)
}

#[inline]
pub fn enable(bits: u32) {
    MASK.fetch_or(bits, Ordering::Relaxed);
}

#[inline]
pub fn disable(bits: u32) {
    MASK.fetch_and(!bits, Ordering::Relaxed);
}

#[inline]
pub fn is(cat: u32) -> bool {
    (MASK.load(Ordering::Relaxed) & cat) != 0
}

#[inline]
pub fn cat_name(cat: u32) -> &'static str {
    match cat {
        c if c == cat::ROUTER => "router",
        c if c == cat::SLIDER => "slider",
        c if c == cat::SYNC => "sync",
        c if c == cat::AUTH => "auth",
        c if c == cat::API => "api",
        c if c == cat::NOTIFY => "notify",
        _ => "misc",
    }
}

/// Parse a comma-separated category list into a mask.
pub fn parse_list(list: &str) -> u32 {
    let mut m: u32 = 0;
    for tok in list.split(',').map(|s| s.trim().to_ascii_lowercase()) {
        match tok.as_str() {
            "" | "none" => m = 0,
            "all" => m = cat::ALL,
            "router" => m |= cat::ROUTER,
            "slider" => m |= cat::SLIDER,
            "sync" => m |= cat::SYNC,
            "auth" => m |= cat::AUTH,
            "api" => m |= cat::API,
            "notify" => m |= cat::NOTIFY,
            _ => {}
        }
    }
    m
}

#[inline]
pub fn set_from_list(list: &str) {
    set(parse_list(list));
}

#[cfg(target_arch = "wasm32")]
pub fn init_from_url_and_storage_once() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        use web_sys::window;
        if let Some(win) = window() {
            // URL query: ?lbdebug=router,sync
            if let Ok(search) = win.location().search() {
                let qs = search.trim_start_matches('?');
                for part in qs.split('&') {
                    let mut it = part.splitn(2, '=');
                    let key = it.next().unwrap_or_default();
                    let val = it.next().unwrap_or_default();
                    if key.eq_ignore_ascii_case("lbdebug") {
                        if let Ok(decoded) = urlencoding::decode(val) {
                            set_from_list(&decoded);
                        }
                    }
                }
            }
            // localStorage: lobster.debug = "router,sync"
            if let Ok(Some(storage)) = win.local_storage() {
                if let Ok(Some(v)) = storage.get_item("lobster.debug") {
                    set_from_list(&v);
                }
            }
        }
        log(cat::ROUTER, "debug init (wasm) complete");
    });
}

#[cfg(not(target_arch = "wasm32"))]
pub fn init_from_url_and_storage_once() {
    if let Ok(list) = std::env::var("LOBSTER_DEBUG") {
        set_from_list(&list);
    }
}

#[inline]
pub fn log(cat: u32, msg: impl AsRef<str>) {
    if !is(cat) {
        return;
    }
    log::debug!(target: "lobster", "[{}] {}", cat_name(cat), msg.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_combines_categories() {
        assert_eq!(parse_list("router,sync"), cat::ROUTER | cat::SYNC);
        assert_eq!(parse_list(" Slider , AUTH "), cat::SLIDER | cat::AUTH);
        assert_eq!(parse_list("all"), cat::ALL);
        assert_eq!(parse_list("router,none"), 0);
        assert_eq!(parse_list("bogus"), 0);
    }

    #[test]
    fn names_are_stable() {
        assert_eq!(cat_name(cat::NOTIFY), "notify");
        assert_eq!(cat_name(cat::API), "api");
        assert_eq!(cat_name(1 << 20), "misc");
    }
}
