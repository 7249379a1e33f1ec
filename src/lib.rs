//! Tether - durable sessions and history for AI coding assistants
//!
//! This crate provides the storage engine and the `tether` CLI.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (Scope, Session, Message, HistoryEntry)
//! - [`storage`] - SQLite database layer
//! - [`config`] - Database location, retention settings, scope detection
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod storage;

pub use error::{Error, Result};
pub use model::{Message, Part, Role, Scope, Session};
pub use storage::Store;
