//! Core library for calmirror.
//!
//! This crate mirrors the events of a primary calendar onto every calendar
//! enrolled as a target:
//! - `sync` holds the incremental runner, the replicator and reset
//! - `provider`, `store` and `lock` are the seams to the outside world,
//!   each with an in-memory implementation for tests and embedders

pub mod calendar;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod lock;
pub mod projection;
pub mod provider;
pub mod store;
pub mod sync;

pub use calendar::{Calendar, CalendarEntry, CalendarSet};
pub use config::MirrorConfig;
pub use error::{MirrorError, MirrorResult};
pub use event::{Event, EventStatus, EventTime, Transparency, Visibility};
pub use sync::{Mirror, SyncOptions};
