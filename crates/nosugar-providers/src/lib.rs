//! # nosugar-providers
//!
//! Text-generation provider implementations for NoSugar.

pub mod openai;

pub use openai::OpenAiProvider;
