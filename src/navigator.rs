//! Router + slider in one place
//!
//! The router decides where the user is; the slider decides how the view gets
//! there. Every history entry remembers the direction it was left in, so going
//! back plays the opposite slide unless the caller asks for another one.

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

use serde::Serialize;

use crate::router::{page_key, Page, Router, RouterState};
use crate::slider::{Controller, Direction, Rejected, Settled, Transition, TransitionState};

/// What a navigation request ended up doing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavOutcome {
    /// Path changed and a slide to the new page started.
    Sliding(Transition),
    /// Path changed but the page did not (e.g. a different query), so nothing animates.
    Replaced,
    /// Request dropped; nothing changed.
    Dropped(Rejected),
    /// `back` with nothing to go back to.
    NoHistory,
}

impl NavOutcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, NavOutcome::Dropped(_) | NavOutcome::NoHistory)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct NavSnapshot {
    pub router: RouterState,
    pub slider: TransitionState,
    pub flip_page: Page,
    pub flop_page: Page,
    pub can_go_back: bool,
}

#[derive(Debug)]
pub struct Navigator {
    router: Router,
    slider: Controller,
    directions: Vec<Direction>,
}

impl Navigator {
    /// Build from a router; the slider lands on the router's current page.
    pub fn new(router: Router) -> Self {
        let slider = Controller::new(router.page());
        Self::with_controller(router, slider)
    }

    pub fn with_controller(router: Router, mut slider: Controller) -> Self {
        if slider.active_key() != router.page() {
            slider.set(router.page());
        }
        Self {
            router,
            slider,
            directions: Vec::new(),
        }
    }

    #[inline]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[inline]
    pub fn slider(&self) -> &Controller {
        &self.slider
    }

    pub fn can_go_back(&self) -> bool {
        !self.slider.in_transition() && self.router.can_go_back()
    }

    pub fn snapshot(&self) -> NavSnapshot {
        let slider = self.slider.state().clone();
        NavSnapshot {
            router: self.router.state(),
            flip_page: Page::from_key(&slider.flip_key),
            flop_page: Page::from_key(&slider.flop_key),
            slider,
            can_go_back: self.can_go_back(),
        }
    }

    /// Reset to the startup path with no history and no animation.
    pub fn set_initial_path(&mut self, path: &str) {
        self.router.set_initial_path(path);
        self.directions.clear();
        self.slider.set(page_key(path));
    }

    /// Navigate without making the current page reachable through `back`.
    pub fn go_to(&mut self, path: &str, direction: Direction, now: Instant) -> NavOutcome {
        self.navigate(path, direction, now, false)
    }

    /// Navigate and remember the current page for `back`.
    pub fn go_to_with_back(&mut self, path: &str, direction: Direction, now: Instant) -> NavOutcome {
        self.navigate(path, direction, now, true)
    }

    /// Return to the previous page. Without an explicit direction, the slide
    /// that brought us here is played in reverse.
    pub fn go_back(&mut self, direction: Option<Direction>, now: Instant) -> NavOutcome {
        if self.slider.in_transition() {
            return NavOutcome::Dropped(Rejected::InTransition);
        }
        let Some(prev) = self.router.history().last() else {
            return NavOutcome::NoHistory;
        };
        let target = page_key(prev).to_string();
        let recorded = self.directions.last().copied().unwrap_or(Direction::Forward);
        let direction = direction.unwrap_or_else(|| recorded.opposite());

        self.router.go_back();
        self.directions.pop();
        self.slide_or_replace(direction, &target, now)
    }

    pub fn clear_history(&mut self) {
        self.router.clear_history();
        self.directions.clear();
    }

    /// Drive the slider clock; see [`Controller::poll`].
    pub fn poll(&mut self, now: Instant) -> Option<Settled> {
        self.slider.poll(now)
    }

    /// Animation timer fired; see [`Controller::complete`].
    pub fn complete(&mut self) -> Option<Settled> {
        self.slider.complete()
    }

    fn navigate(&mut self, path: &str, direction: Direction, now: Instant, with_back: bool) -> NavOutcome {
        if self.slider.in_transition() {
            return NavOutcome::Dropped(Rejected::InTransition);
        }
        let target = page_key(path).to_string();
        if with_back {
            self.router.navigate_to(path);
            self.directions.push(direction);
        } else {
            self.router.navigate_without_history(path);
        }
        self.slide_or_replace(direction, &target, now)
    }

    fn slide_or_replace(&mut self, direction: Direction, target: &str, now: Instant) -> NavOutcome {
        match self.slider.begin(direction, target, now) {
            Ok(t) => NavOutcome::Sliding(t.clone()),
            Err(Rejected::AlreadyActive(_)) => NavOutcome::Replaced,
            Err(e) => NavOutcome::Dropped(e),
        }
    }
}
