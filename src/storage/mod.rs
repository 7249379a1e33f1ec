//! SQLite storage layer for Tether.
//!
//! This module provides the persistence layer using SQLite with:
//! - A single owned connection (`Store`)
//! - WAL mode and enforced foreign keys
//! - Transaction discipline for atomic multi-row writes
//!
//! # Submodules
//!
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Store handle, transactions, maintenance
//! - [`identity`] - Repository/branch get-or-create
//! - [`sessions`] - Session save/load/list/retention
//! - [`search`] - Regex message search
//! - [`history`] - Prompt/command history

pub mod history;
pub mod identity;
pub mod schema;
pub mod search;
pub mod sessions;
pub mod sqlite;

pub use search::SearchHit;
pub use sessions::CleanupReport;
pub use sqlite::{Store, StoreStats};
