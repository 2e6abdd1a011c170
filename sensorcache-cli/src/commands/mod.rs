//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, show, init)
//! - [`inspect`] - Print the persisted snapshot
//! - [`rebuild`] - One-shot full or partial rebuild
//! - [`run`] - Long-running refresh daemon

pub mod config;
pub mod inspect;
pub mod rebuild;
pub mod run;
