//! Lobster - marketplace client core
//!
//! The state machines behind the lobster web client, usable from the browser
//! (wasm32, `dom-web`) and from the native command-line client (`native`).
//!
//! ## Architecture
//!
//! - **Navigation**: [`router`] owns the path and history, [`slider`] animates
//!   between two page slots, [`navigator`] ties them together.
//! - **Writes**: [`reconcile`] applies optimistic changes and undoes them on
//!   failure; [`comments`] instantiates it for comments and replies.
//! - **Session**: [`auth`] keeps tokens in [`storage`] and refreshes them
//!   through [`api`].
//!
//! ## Usage
//!
//! For native builds:
//! ```bash
//! cargo build --features native
//! ```
//!
//! For web builds:
//! ```bash
//! wasm-pack build --target web --no-default-features --features dom-web
//! ```

// Core modules (available on all platforms)
pub mod config;
pub mod debug;
pub mod validate;

// Navigation
pub mod navigator;
pub mod router;
pub mod slider;

// Optimistic writes
pub mod comments;
pub mod notify;
pub mod reconcile;

// Session + HTTP boundary
pub mod api;
pub mod auth;
pub mod storage;

// Utility modules (shared across all targets)
pub mod util;

// WASM-facing exports (JS -> Rust) are only built on wasm32.
#[cfg(target_arch = "wasm32")]
pub mod wasm_api;

// Re-export commonly used types
pub use config::{Config, FileConfig};
pub use navigator::{NavOutcome, Navigator};
pub use router::{Page, Router};
pub use slider::{Controller, Direction, Side};
