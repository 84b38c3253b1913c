//! Monitor bot
//!
//! Watches an automation platform (conversation snapshots over HTTP, or a container's
//! log stream) and relays changes to a Telegram chat.

pub mod bot;
pub mod config;
pub mod event;
pub mod monitoring;
pub mod notify;
pub mod shutdown;
pub mod utils;
