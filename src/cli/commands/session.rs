//! Session command implementations.

use crate::cli::commands::{format_timestamp, open_store, print_json, resolve_scope, truncate};
use crate::cli::{ScopeArgs, SessionCommands};
use crate::config::Settings;
use crate::error::Result;
use crate::model::{Part, Role, SessionSummary};
use crate::storage::{SearchHit, Store};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// Output for session list command.
#[derive(Serialize)]
struct SessionListOutput {
    sessions: Vec<SessionSummary>,
    count: usize,
}

/// Output for session search command.
#[derive(Serialize)]
struct SearchOutput<'a> {
    pattern: &'a str,
    hits: Vec<SearchHit>,
    count: usize,
}

/// Execute session commands.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn execute(
    command: &SessionCommands,
    db_path: Option<&PathBuf>,
    scope_args: &ScopeArgs,
    settings: &Settings,
    json: bool,
) -> Result<()> {
    let mut store = open_store(db_path)?;

    match command {
        SessionCommands::List { all, limit } => {
            let limit = limit.unwrap_or(settings.sessions.list_limit);
            list(&store, scope_args, *all, limit, json)
        }
        SessionCommands::Show { id, messages } => show(&store, id, *messages, json),
        SessionCommands::Delete { id } => delete(&mut store, id, json),
        SessionCommands::Search { pattern, limit } => search(&store, pattern, *limit, json),
        SessionCommands::Cleanup {
            max_age_days,
            max_sessions,
        } => cleanup(
            &mut store,
            max_age_days.unwrap_or_else(|| settings.sessions.effective_max_age_days()),
            max_sessions.unwrap_or_else(|| settings.sessions.effective_max_sessions()),
            json,
        ),
    }
}

fn list(store: &Store, scope_args: &ScopeArgs, all: bool, limit: usize, json: bool) -> Result<()> {
    let (sessions, heading) = if all {
        (store.list_all_sessions(limit)?, "all repositories".to_string())
    } else {
        let scope = resolve_scope(scope_args);
        (store.list_sessions(&scope, limit)?, scope.to_string())
    };

    if json {
        return print_json(&SessionListOutput {
            count: sessions.len(),
            sessions,
        });
    }

    if sessions.is_empty() {
        println!("No sessions found for {heading}.");
        return Ok(());
    }

    println!("Sessions for {} ({}):\n", heading.bold(), sessions.len());
    for s in &sessions {
        let title = if s.first_prompt.is_empty() {
            "(no prompt)".dimmed().to_string()
        } else {
            truncate(&s.first_prompt, 60)
        };
        println!("  {}  {}", s.id.cyan(), title);
        println!(
            "    {} · {} messages · {}/{}",
            format_timestamp(s.last_updated),
            s.message_count,
            s.provider,
            s.model
        );
        if all {
            println!("    {}", s.scope.to_string().dimmed());
        }
    }
    Ok(())
}

fn show(store: &Store, id: &str, last: Option<usize>, json: bool) -> Result<()> {
    let mut loaded = store.load_session(id)?;

    if let Some(n) = last {
        let len = loaded.session.messages.len();
        loaded.session.messages.drain(..len.saturating_sub(n));
    }

    if json {
        return print_json(&loaded);
    }

    let session = &loaded.session;
    println!("Session {}", session.id.cyan().bold());
    println!("  Scope:    {}", loaded.scope);
    println!("  Provider: {}/{}", session.provider, session.model);
    println!("  Dir:      {}", session.working_dir);
    println!("  Created:  {}", format_timestamp(session.created_at));
    println!("  Updated:  {}", format_timestamp(session.last_updated));
    println!();

    for message in &session.messages {
        let role = match message.role {
            Role::User => "user".green(),
            Role::Assistant => "assistant".blue(),
            Role::System => "system".yellow(),
            Role::Tool => "tool".magenta(),
        };
        println!("[{role}] {}", format_timestamp(message.created_at).dimmed());
        for part in &message.parts {
            match part {
                Part::Text { text } => println!("{text}"),
                Part::Reasoning { text } => println!("{}", text.dimmed()),
                Part::ToolCall { name, input, .. } => {
                    println!("{} {name} {input}", "→".cyan());
                }
                Part::ToolResult {
                    output, is_error, ..
                } => {
                    let marker = if *is_error { "✗".red() } else { "←".cyan() };
                    println!("{marker} {}", truncate(output, 200));
                }
                Part::Image { media_type, .. } => println!("{}", format!("<{media_type}>").dimmed()),
            }
        }
        println!();
    }
    Ok(())
}

fn delete(store: &mut Store, id: &str, json: bool) -> Result<()> {
    store.delete_session(id)?;

    if json {
        print_json(&serde_json::json!({ "deleted": id }))
    } else {
        println!("Deleted session {id}");
        Ok(())
    }
}

fn search(store: &Store, pattern: &str, limit: usize, json: bool) -> Result<()> {
    let hits = store.search_messages(pattern, limit)?;

    if json {
        return print_json(&SearchOutput {
            pattern,
            count: hits.len(),
            hits,
        });
    }

    if hits.is_empty() {
        println!("No messages match `{pattern}`.");
        return Ok(());
    }

    for hit in &hits {
        println!(
            "{} #{} [{}] {}",
            hit.session_id.cyan(),
            hit.sequence,
            hit.role,
            format_timestamp(hit.created_at).dimmed()
        );
        println!("  {}", hit.snippet.replace('\n', " "));
    }
    Ok(())
}

fn cleanup(store: &mut Store, max_age_days: u32, max_sessions: usize, json: bool) -> Result<()> {
    let report = store.cleanup_old_sessions(max_age_days, max_sessions)?;

    if json {
        return print_json(&report);
    }

    println!(
        "Removed {} session(s): {} older than {} day(s), {} over the limit of {}",
        report.total(),
        report.expired,
        max_age_days,
        report.over_limit,
        max_sessions
    );
    Ok(())
}
