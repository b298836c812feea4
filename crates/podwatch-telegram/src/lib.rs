//! Telegram Bot API message sink for podwatch.
//!
//! Implements [`podwatch_core::notify::MessageSink`] with one `sendMessage`
//! call per message; links become an inline keyboard row.

mod sink;

pub mod error;

pub use error::{Error, Result};
pub use sink::{DEFAULT_API_BASE_URL, TelegramConfig, TelegramSink};
