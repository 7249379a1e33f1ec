//! Tether CLI entry point.

use clap::Parser;
use std::process::ExitCode;
use tether::cli::commands;
use tether::cli::{Cli, Commands};
use tether::config::load_settings;
use tether::error::Error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<(), Error> {
    let json = cli.json;
    let db = cli.db.as_ref();

    match &cli.command {
        Commands::Init => commands::init::execute(db, json),
        Commands::Version => commands::version::execute(json),
        Commands::Session { command } => {
            let settings = load_settings()?;
            commands::session::execute(command, db, &cli.scope, &settings, json)
        }
        Commands::History { command } => {
            let settings = load_settings()?;
            commands::history::execute(command, db, &cli.scope, &settings, json)
        }
        Commands::Repo { command } => commands::repo::execute(command, db, json),
        Commands::Db { command } => commands::db::execute(command, db, json),
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
