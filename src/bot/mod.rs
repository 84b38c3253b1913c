//! Chat command handling (`/start`, `/help`)

pub mod commands;
pub mod listener;

pub use commands::BotCommand;
pub use listener::CommandListener;
