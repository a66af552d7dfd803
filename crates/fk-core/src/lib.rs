//! fokus Core Library
//!
//! This crate decides whether the page loaded in a browser should be blocked,
//! temporarily exempted, or allowed, and drives the overlay/countdown UI that
//! reflects that decision.
//!
//! # Architecture
//!
//! All state lives behind a [`Store`]: the block list, the global enable flag,
//! one global exemption deadline and the per-day counters. Components borrow
//! the store and never keep an authoritative in-memory copy, so every
//! evaluation observes what was last persisted.
//!
//! # Modules
//!
//! - `store`: key/value persistence seam and an in-memory implementation
//! - `file_store`: JSON file backed store (feature `runtime`)
//! - `clock`: wall-clock seam
//! - `url`: host extraction and normalization
//! - `policy`: block list and global enable flag
//! - `exemption`: the single global exemption window
//! - `counters`: per-day block/exemption tallies
//! - `engine`: the decision function
//! - `controller`: overlay state machine and user actions
//! - `ticker`: countdown pulse sources
//! - `config`: tunables (exemption length and unit, tick period)
//! - `types`: shared type definitions

pub mod clock;
pub mod config;
pub mod controller;
pub mod counters;
pub mod engine;
pub mod error;
pub mod exemption;
#[cfg(feature = "runtime")]
pub mod file_store;
pub mod policy;
pub mod store;
pub mod ticker;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ExemptionUnit, FokusConfig};
pub use controller::{CountdownView, MenuAction, MenuCommand, OverlayController, OverlayView, Renderer, TickOutcome};
pub use counters::{DailyCounters, DailyTally};
pub use engine::{DecisionEngine, Evaluation};
pub use error::FokusError;
pub use exemption::ExemptionWindow;
#[cfg(feature = "runtime")]
pub use file_store::JsonFileStore;
pub use policy::BlockListPolicy;
pub use store::{MemoryStore, Store, StoreError};
#[cfg(feature = "runtime")]
pub use ticker::Ticker;
pub use ticker::{ManualTicker, TickSource};
pub use types::{Decision, HostOutcome, OverlayState};
pub use url::Host;
