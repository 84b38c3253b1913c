//! Change-event model
//!
//! - Item / ChangeEvent / WatcherState definitions
//! - Snapshot differ (pure)
//! - Substring triggers for log lines

pub mod differ;
pub mod trigger;

mod event_types;

pub use differ::diff;
pub use event_types::{ChangeEvent, Item, WatcherState};
pub use trigger::LogTrigger;
