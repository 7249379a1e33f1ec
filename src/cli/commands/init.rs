//! Create the Tether database.
//!
//! Opening the store creates the directory, the file and the schema, so
//! `init` is safe to run repeatedly.

use crate::cli::commands::open_store;
use crate::error::Result;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    schema_version: Option<i32>,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if the database cannot be created.
pub fn execute(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut store = open_store(db_path)?;
    let output = InitOutput {
        database: store.path().map(PathBuf::from).unwrap_or_default(),
        schema_version: store.schema_version()?,
    };
    store.close()?;

    if json {
        super::print_json(&output)?;
    } else {
        println!("Initialized Tether database");
        println!("  Path:   {}", output.database.display());
        if let Some(version) = output.schema_version {
            println!("  Schema: v{version}");
        }
    }
    Ok(())
}
