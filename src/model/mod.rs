//! Data models for Tether.
//!
//! This module contains all domain models:
//! - Scope, Repository, Branch (source-control identity)
//! - Session, Message, Part (persisted conversations)
//! - HistoryEntry (prompt/command recall)

pub mod history;
pub mod scope;
pub mod session;

pub use history::{HistoryEntry, HistoryKind};
pub use scope::{Branch, Repository, Scope};
pub use session::{LoadedSession, Message, Part, Role, Session, SessionSummary};
