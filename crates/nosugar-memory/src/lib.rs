//! # nosugar-memory
//!
//! Persistent storage for NoSugar (SQLite-backed).

pub mod store;

pub use store::Store;
