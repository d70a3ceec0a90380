pub mod commands;
pub mod format;
pub mod sink;

pub use commands::{start_bot, BotDeps, Command};
pub use format::{MessageFormat, BOT_VERSION};
pub use sink::TelegramSink;
