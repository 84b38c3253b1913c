//! Chat message texts

use crate::event::ChangeEvent;

/// Sent once before the first polling cycle
pub const POLL_ONLINE_MESSAGE: &str = "🤖 Monitor Bot is online and starting to poll.";

/// Sent once before the log tail starts
pub fn logs_online_message(container: &str) -> String {
    format!(
        "🤖 Monitor Bot is online and watching logs of {}.",
        container
    )
}

/// Line for a task/conversation change
pub fn format_task_event(event: &ChangeEvent) -> String {
    match event {
        ChangeEvent::Created { item } => {
            format!("🆕 New Task Started: {} (ID: {})", item.label, item.id)
        }
        ChangeEvent::Updated {
            item, new_status, ..
        } => format!("🔄 Task Status Update: {} is now {}.", item.label, new_status),
        ChangeEvent::Removed { id } => format!("🏁 Task no longer listed (ID: {})", id),
    }
}

/// Line for a matched log line. The raw line is included verbatim.
pub fn format_log_event(event: &ChangeEvent) -> String {
    match event {
        ChangeEvent::Created { item } => format!("🚨 [{}] {}", item.status, item.label),
        other => format_task_event(other),
    }
}
