//! Monitoring module
//!
//! Two watchers share the same notify path:
//! - `Watcher` polls a snapshot source, diffs it against the last state and reports changes
//! - `LogTailWatcher` follows a container log and reports lines that match a trigger

pub mod log_stream;
pub mod log_watcher;
pub mod message;
pub mod processor;
pub mod source;

pub use log_stream::{DockerLogSource, LineStream, LogSource};
pub use log_watcher::{LogTailWatcher, TailStats};
pub use processor::{deliver_all, CycleReport, Watcher, WatcherPhase};
pub use source::{HttpConversationSource, ObservationSource};
