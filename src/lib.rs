//! feedx - live social feed monitor
//!
//! Polls a feed backend for ranked posts annotated with follower and identity
//! metadata, and highlights or hides them according to user rules.
//!
//! ## Architecture
//!
//! - `scheduler` is a clock-free countdown state machine; `refresh` drives it
//!   from a tokio task (native only).
//! - `filter` is the pure rule engine: (item, rules, block-list) -> verdict.
//! - `prefs` and `blocklist` persist through the `store::KvStore` port.
//! - `app` and `ui` are the terminal presentation.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -- --api-url http://127.0.0.1:8080 --refresh-interval-secs 10
//! ```

// Core modules (available on all platforms)
pub mod config;
pub mod types;
pub mod util_text;

pub mod filter;
pub mod scheduler;

// Persistence
pub mod blocklist;
pub mod prefs;
pub mod store;

// Backend access
pub mod feed_api;

#[cfg(feature = "native")]
pub mod refresh;

pub mod app;
pub mod ui;

// Platform abstraction layer
pub mod platform;

// Re-export commonly used types
pub use app::{App, InputMode};
pub use config::Config;
pub use filter::{evaluate, CompiledRules, RuleSet, Verdict};
pub use scheduler::{Phase, RefreshScheduler};
pub use types::{AppEvent, FeedItem, FeedSnapshot};
