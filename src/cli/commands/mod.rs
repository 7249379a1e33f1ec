//! Command implementations.

pub mod completions;
pub mod db;
pub mod history;
pub mod init;
pub mod repo;
pub mod session;
pub mod version;

use crate::cli::ScopeArgs;
use crate::config::{detect_scope, resolve_db_path, ScopeOverrides};
use crate::error::{Error, Result};
use crate::model::Scope;
use crate::storage::Store;
use serde::Serialize;
use std::path::PathBuf;

/// Resolve the database path and open the store.
///
/// # Errors
///
/// Returns an error if no path can be resolved or the store fails to open.
pub fn open_store(db_path: Option<&PathBuf>) -> Result<Store> {
    let path = resolve_db_path(db_path.map(PathBuf::as_path))
        .ok_or_else(|| Error::Config("Could not determine database location".to_string()))?;
    Store::open(&path)
}

/// The scope for scoped commands: flags first, then git detection.
#[must_use]
pub fn resolve_scope(args: &ScopeArgs) -> Scope {
    detect_scope(&ScopeOverrides {
        host: args.host.clone(),
        org: args.org.clone(),
        project: args.project.clone(),
        branch: args.branch.clone(),
    })
}

/// Print a value as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format Unix seconds as local time for human output.
#[must_use]
pub fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| secs.to_string())
}

/// Shorten text to `max` characters, adding an ellipsis when cut.
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() <= max && line.len() == text.len() {
        return line.to_string();
    }
    let cut: String = line.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer line", 5), "a lo…");
        assert_eq!(truncate("first\nsecond", 20), "first…");
    }
}
