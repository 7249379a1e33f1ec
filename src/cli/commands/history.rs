//! History command implementations.

use crate::cli::commands::{format_timestamp, open_store, print_json, resolve_scope};
use crate::cli::{HistoryCommands, ScopeArgs};
use crate::config::Settings;
use crate::error::Result;
use crate::model::{HistoryEntry, HistoryKind, Scope};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct HistoryOutput<'a> {
    kind: HistoryKind,
    scope: &'a Scope,
    entries: Vec<HistoryEntry>,
    count: usize,
}

const fn kind_for(commands: bool) -> HistoryKind {
    if commands {
        HistoryKind::Command
    } else {
        HistoryKind::Prompt
    }
}

/// Execute history commands.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn execute(
    command: &HistoryCommands,
    db_path: Option<&PathBuf>,
    scope_args: &ScopeArgs,
    settings: &Settings,
    json: bool,
) -> Result<()> {
    let mut store = open_store(db_path)?;

    match command {
        HistoryCommands::Show { commands, limit } => {
            let scope = resolve_scope(scope_args);
            let kind = kind_for(*commands);
            let entries = store.load_history(kind, &scope, *limit)?;

            if json {
                return print_json(&HistoryOutput {
                    kind,
                    scope: &scope,
                    count: entries.len(),
                    entries,
                });
            }

            if entries.is_empty() {
                println!("No {} history for {scope}.", kind.as_str());
                return Ok(());
            }
            for entry in &entries {
                println!("{}  {}", format_timestamp(entry.timestamp).dimmed(), entry.text);
            }
            Ok(())
        }

        HistoryCommands::Add { text, command } => {
            let scope = resolve_scope(scope_args);
            let kind = kind_for(*command);
            store.append_history(kind, &scope, text, settings.history.effective_max_entries())?;

            if json {
                print_json(&serde_json::json!({
                    "kind": kind,
                    "scope": scope,
                    "text": text,
                }))
            } else {
                println!("Added {} to {scope}", kind.as_str());
                Ok(())
            }
        }

        HistoryCommands::Clear { commands } => {
            let scope = resolve_scope(scope_args);
            let kind = kind_for(*commands);
            let removed = store.clear_history(kind, &scope)?;

            if json {
                print_json(&serde_json::json!({ "kind": kind, "removed": removed }))
            } else {
                println!("Cleared {removed} {} entries for {scope}", kind.as_str());
                Ok(())
            }
        }

        HistoryCommands::Cleanup { max_age_days } => {
            let days = max_age_days.unwrap_or_else(|| settings.history.effective_max_age_days());
            let removed = store.cleanup_old_history(days)?;

            if json {
                print_json(&serde_json::json!({ "max_age_days": days, "removed": removed }))
            } else {
                println!("Removed {removed} history entries older than {days} day(s)");
                Ok(())
            }
        }
    }
}
