//! State watching: snapshots in, change notices and domain events out
//!
//! ```text
//! (prev, next, origin) ─► ChangeWatcher ─► TriggerQueue ─► DomainEventDetector
//!                          origin gate      800 ms debounce   coarse events
//! ```
//!
//! Only user-originated changes ever produce notices or events. Changes the
//! assistant or the system made are dropped at the gate.

mod detector;
mod required;
mod trigger;
mod watcher;

pub use detector::DomainEventDetector;
pub use required::{RequiredFields, StaticRequiredFields};
pub use trigger::TriggerQueue;
pub use watcher::ChangeWatcher;
