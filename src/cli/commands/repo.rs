//! Repository and branch command implementations.

use crate::cli::RepoCommands;
use crate::cli::commands::{open_store, print_json};
use crate::error::Result;
use colored::Colorize;
use std::path::PathBuf;

/// Execute repository commands.
///
/// # Errors
///
/// Returns an error if the database operation fails or the ID is unknown.
pub fn execute(command: &RepoCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut store = open_store(db_path)?;

    match command {
        RepoCommands::List => {
            let repos = store.list_repositories()?;
            if json {
                return print_json(&repos);
            }
            if repos.is_empty() {
                println!("No repositories recorded.");
                return Ok(());
            }
            for repo in &repos {
                println!(
                    "{:>4}  {}/{}/{}",
                    repo.id.to_string().cyan(),
                    repo.host,
                    repo.org,
                    repo.project
                );
            }
            Ok(())
        }

        RepoCommands::Branches { id } => {
            let branches = store.list_branches(*id)?;
            if json {
                return print_json(&branches);
            }
            if branches.is_empty() {
                println!("No branches recorded for repository {id}.");
                return Ok(());
            }
            for branch in &branches {
                println!("{:>4}  {}", branch.id.to_string().cyan(), branch.name);
            }
            Ok(())
        }

        RepoCommands::Delete { id } => {
            store.delete_repository(*id)?;
            if json {
                print_json(&serde_json::json!({ "deleted_repository": id }))
            } else {
                println!("Deleted repository {id} and everything under it");
                Ok(())
            }
        }

        RepoCommands::DeleteBranch { id } => {
            store.delete_branch(*id)?;
            if json {
                print_json(&serde_json::json!({ "deleted_branch": id }))
            } else {
                println!("Deleted branch {id} with its sessions and history");
                Ok(())
            }
        }
    }
}
