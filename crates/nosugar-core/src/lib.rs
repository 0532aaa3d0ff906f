//! # nosugar-core
//!
//! Core types, traits, configuration, streak logic, and error handling for
//! the NoSugar bot.

pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod models;
pub mod streak;
pub mod traits;

pub use config::shellexpand;
