//! Chat commands the bot answers

/// A recognised slash command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
}

const START_REPLY: &str =
    "👋 Monitor Bot is running. I will post task updates and log alerts to this chat.";

const HELP_REPLY: &str = "Available commands:\n/start - check that the bot is alive\n/help - show this message";

impl BotCommand {
    /// Parse the first word of a message.
    ///
    /// Accepts `/help`, `/help@SomeBot` and trailing arguments; anything else is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);

        match name.to_ascii_lowercase().as_str() {
            "start" => Some(BotCommand::Start),
            "help" => Some(BotCommand::Help),
            _ => None,
        }
    }

    pub fn reply(self) -> &'static str {
        match self {
            BotCommand::Start => START_REPLY,
            BotCommand::Help => HELP_REPLY,
        }
    }
}
