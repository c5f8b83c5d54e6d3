//! Double-buffered page slider
//!
//! Two rendering slots (`flip` and `flop`) let the outgoing page stay mounted
//! while the incoming page slides in. A transition runs in three steps:
//!
//! 1. [`Controller::begin`] mounts the target in the inactive slot and marks
//!    the controller as in transition. The returned [`Transition`] carries the
//!    CSS class the host applies on the next paint.
//! 2. After [`TRANSITION_MS`] the host calls [`Controller::poll`] (or
//!    [`Controller::complete`] from its timer) which swaps the active side.
//! 3. The host applies [`Settled::class`] to pin the new page in place.
//!
//! The inactive slot keeps its page until the next transition overwrites it.
//!
//! The clock is injected so the state machine can be driven without timers.

use std::collections::HashMap;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::debug::{self, cat};

/// Animation-completion delay. One millisecond longer than the 400ms CSS
/// transition so the commit never lands before the animation finishes.
pub const TRANSITION_MS: u64 = 401;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Flip,
    Flop,
}

impl Side {
    #[inline]
    pub fn other(self) -> Side {
        match self {
            Side::Flip => Side::Flop,
            Side::Flop => Side::Flip,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Back,
    Forward,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::Back,
        Direction::Forward,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Back => Direction::Forward,
            Direction::Forward => Direction::Back,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Back => "back",
            Direction::Forward => "forward",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            "back" => Ok(Direction::Back),
            "forward" => Ok(Direction::Forward),
            _ => Err(anyhow::anyhow!(
                "Invalid direction '{s}'. Valid options: up, down, left, right, back, forward"
            )),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CSS class that animates a slide, given which side is active when it starts.
///
/// Up, left, back and forward play forwards from the flip side; down and right
/// play the reverse keyframes from the flip side. The flop side mirrors that.
pub fn slide_class(direction: Direction, active: Side) -> &'static str {
    match (direction, active) {
        (Direction::Up, Side::Flip) => "slide-up",
        (Direction::Up, Side::Flop) => "slide-up-reverse",
        (Direction::Down, Side::Flip) => "slide-down-reverse",
        (Direction::Down, Side::Flop) => "slide-down",
        (Direction::Left, Side::Flip) => "slide-left",
        (Direction::Left, Side::Flop) => "slide-left-reverse",
        (Direction::Right, Side::Flip) => "slide-right-reverse",
        (Direction::Right, Side::Flop) => "slide-right",
        (Direction::Back, Side::Flip) => "slide-back",
        (Direction::Back, Side::Flop) => "slide-back-reverse",
        (Direction::Forward, Side::Flip) => "slide-forward",
        (Direction::Forward, Side::Flop) => "slide-forward-reverse",
    }
}

/// Resting class once a slide away from `from` has finished.
pub fn settle_class(from: Side) -> &'static str {
    match from {
        Side::Flip => "show-flop",
        Side::Flop => "show-flip",
    }
}

/// Adjacency between named pages for direction-only navigation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageGraph {
    edges: HashMap<String, HashMap<Direction, String>>,
}

impl PageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ring over `pages`: left, up and forward move to the next page;
    /// right, down and back move to the previous one.
    pub fn cyclic(pages: &[&str]) -> Self {
        let mut g = Self::new();
        let n = pages.len();
        for (i, page) in pages.iter().enumerate() {
            let next = pages[(i + 1) % n];
            let prev = pages[(i + n - 1) % n];
            for dir in [Direction::Left, Direction::Up, Direction::Forward] {
                g.link(page, dir, next);
            }
            for dir in [Direction::Right, Direction::Down, Direction::Back] {
                g.link(page, dir, prev);
            }
        }
        g
    }

    pub fn link(&mut self, from: &str, direction: Direction, to: &str) -> &mut Self {
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(direction, to.to_string());
        self
    }

    pub fn neighbor(&self, from: &str, direction: Direction) -> Option<&str> {
        self.edges.get(from)?.get(&direction).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.edges.contains_key(key)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransitionState {
    pub active_side: Side,
    pub active_key: String,
    pub flip_key: String,
    pub flop_key: String,
    pub in_transition: bool,
}

impl TransitionState {
    fn landing(key: &str) -> Self {
        Self {
            active_side: Side::Flip,
            active_key: key.to_string(),
            flip_key: key.to_string(),
            flop_key: String::new(),
            in_transition: false,
        }
    }

    pub fn key_of(&self, side: Side) -> &str {
        match side {
            Side::Flip => &self.flip_key,
            Side::Flop => &self.flop_key,
        }
    }

    fn slot_mut(&mut self, side: Side) -> &mut String {
        match side {
            Side::Flip => &mut self.flip_key,
            Side::Flop => &mut self.flop_key,
        }
    }
}

/// An accepted slide, waiting for its deadline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub direction: Direction,
    pub target: String,
    /// Class to apply on the next paint.
    pub class: &'static str,
    pub started: Instant,
    pub deadline: Instant,
}

/// Result of committing a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settled {
    pub active_side: Side,
    pub active_key: String,
    pub class: &'static str,
}

/// Why a slide request was dropped. Dropped requests are not queued.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    #[error("a transition is already running")]
    InTransition,
    #[error("page {0:?} is already active")]
    AlreadyActive(String),
    #[error("no {direction} neighbour for page {from:?}")]
    NoNeighbor { from: String, direction: Direction },
}

#[derive(Debug, Clone)]
pub struct Controller {
    state: TransitionState,
    pending: Option<Transition>,
    duration: Duration,
    graph: PageGraph,
}

impl Controller {
    pub fn new(landing: &str) -> Self {
        Self {
            state: TransitionState::landing(landing),
            pending: None,
            duration: Duration::from_millis(TRANSITION_MS),
            graph: PageGraph::new(),
        }
    }

    pub fn with_graph(mut self, graph: PageGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    #[inline]
    pub fn state(&self) -> &TransitionState {
        &self.state
    }

    #[inline]
    pub fn active_key(&self) -> &str {
        &self.state.active_key
    }

    #[inline]
    pub fn in_transition(&self) -> bool {
        self.state.in_transition
    }

    #[inline]
    pub fn pending(&self) -> Option<&Transition> {
        self.pending.as_ref()
    }

    #[inline]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    #[inline]
    pub fn graph(&self) -> &PageGraph {
        &self.graph
    }

    /// Jump to `key` without animating. Any running transition is discarded.
    pub fn set(&mut self, key: &str) {
        let side = self.state.active_side;
        self.state.active_key = key.to_string();
        *self.state.slot_mut(side) = key.to_string();
        *self.state.slot_mut(side.other()) = String::new();
        self.state.in_transition = false;
        self.pending = None;
        debug::log(cat::SLIDER, format!("set {key:?} on {side:?}"));
    }

    /// Start sliding `target` in from `direction`.
    pub fn begin(
        &mut self,
        direction: Direction,
        target: &str,
        now: Instant,
    ) -> Result<&Transition, Rejected> {
        if self.state.in_transition {
            debug::log(cat::SLIDER, format!("drop {direction} -> {target:?}: busy"));
            return Err(Rejected::InTransition);
        }
        if self.state.active_key == target {
            return Err(Rejected::AlreadyActive(target.to_string()));
        }

        let active = self.state.active_side;
        *self.state.slot_mut(active.other()) = target.to_string();
        self.state.in_transition = true;

        debug::log(
            cat::SLIDER,
            format!("arriving {target:?} via {direction} on {:?}", active.other()),
        );
        Ok(self.pending.insert(Transition {
            direction,
            target: target.to_string(),
            class: slide_class(direction, active),
            started: now,
            deadline: now + self.duration,
        }))
    }

    /// Commit the running transition once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<Settled> {
        let due = matches!(&self.pending, Some(t) if now >= t.deadline);
        if due {
            self.complete()
        } else {
            None
        }
    }

    /// Commit the running transition immediately (animation timer fired).
    pub fn complete(&mut self) -> Option<Settled> {
        self.pending.take()?;
        let from = self.state.active_side;
        let to = from.other();
        self.state.active_side = to;
        self.state.active_key = self.state.key_of(to).to_string();
        self.state.in_transition = false;
        debug::log(
            cat::SLIDER,
            format!("settled {:?} on {to:?}", self.state.active_key),
        );
        Some(Settled {
            active_side: to,
            active_key: self.state.active_key.clone(),
            class: settle_class(from),
        })
    }

    pub fn slide_up(&mut self, key: &str, now: Instant) -> Result<&Transition, Rejected> {
        self.begin(Direction::Up, key, now)
    }

    pub fn slide_down(&mut self, key: &str, now: Instant) -> Result<&Transition, Rejected> {
        self.begin(Direction::Down, key, now)
    }

    pub fn slide_left(&mut self, key: &str, now: Instant) -> Result<&Transition, Rejected> {
        self.begin(Direction::Left, key, now)
    }

    pub fn slide_right(&mut self, key: &str, now: Instant) -> Result<&Transition, Rejected> {
        self.begin(Direction::Right, key, now)
    }

    pub fn slide_back(&mut self, key: &str, now: Instant) -> Result<&Transition, Rejected> {
        self.begin(Direction::Back, key, now)
    }

    pub fn slide_forward(&mut self, key: &str, now: Instant) -> Result<&Transition, Rejected> {
        self.begin(Direction::Forward, key, now)
    }

    /// Slide to the neighbour of the active page in the page graph.
    pub fn go(&mut self, direction: Direction, now: Instant) -> Result<&Transition, Rejected> {
        let from = self.state.active_key.clone();
        let Some(target) = self.graph.neighbor(&from, direction).map(str::to_string) else {
            log::warn!("[slider] no {direction} neighbour for page {from:?}");
            return Err(Rejected::NoNeighbor { from, direction });
        };
        self.begin(direction, &target, now)
    }

    pub fn go_up(&mut self, now: Instant) -> Result<&Transition, Rejected> {
        self.go(Direction::Up, now)
    }

    pub fn go_down(&mut self, now: Instant) -> Result<&Transition, Rejected> {
        self.go(Direction::Down, now)
    }

    pub fn go_left(&mut self, now: Instant) -> Result<&Transition, Rejected> {
        self.go(Direction::Left, now)
    }

    pub fn go_right(&mut self, now: Instant) -> Result<&Transition, Rejected> {
        self.go(Direction::Right, now)
    }

    pub fn go_back(&mut self, now: Instant) -> Result<&Transition, Rejected> {
        self.go(Direction::Back, now)
    }

    pub fn go_forward(&mut self, now: Instant) -> Result<&Transition, Rejected> {
        self.go(Direction::Forward, now)
    }
}
