//! # nosugar-channels
//!
//! Messaging platform integrations for NoSugar.

pub mod telegram;
pub mod utils;

pub use telegram::TelegramChannel;
