//! Database maintenance commands.

use crate::cli::DbCommands;
use crate::cli::commands::{open_store, print_json};
use crate::error::Result;
use colored::Colorize;
use std::path::PathBuf;

/// Execute database commands.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn execute(command: &DbCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut store = open_store(db_path)?;

    match command {
        DbCommands::Stats => {
            let stats = store.stats()?;
            if json {
                return print_json(&stats);
            }
            if let Some(path) = store.path() {
                println!("{}", path.display().to_string().bold());
            }
            println!("  Repositories:    {}", stats.repositories);
            println!("  Branches:        {}", stats.branches);
            println!("  Sessions:        {}", stats.sessions);
            println!("  Messages:        {}", stats.messages);
            println!("  Prompt history:  {}", stats.prompt_history);
            println!("  Command history: {}", stats.command_history);
            Ok(())
        }

        DbCommands::Compact => {
            store.compact()?;
            if json {
                print_json(&serde_json::json!({ "compacted": true }))
            } else {
                println!("Database compacted");
                Ok(())
            }
        }
    }
}
