//! SQLite store handle.
//!
//! `Store` owns the one and only connection to the database file. The
//! component operations (identity, sessions, search, history) are `impl Store`
//! blocks in sibling modules, so the handle is always passed explicitly.
//!
//! SQLite serializes writers, so concurrency is capped here at a single
//! connection rather than with application-level locks. Callers that share a
//! `Store` across threads must serialize access themselves.

use crate::error::{Error, Result};
use crate::storage::schema::{apply_pragmas, apply_schema, TABLES};
use rusqlite::{Connection, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// SQLite-backed persistence handle.
#[derive(Debug)]
pub struct Store {
    conn: Option<Connection>,
    path: Option<PathBuf>,
}

/// Row counts for each top-level table. Diagnostics only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub repositories: usize,
    pub branches: usize,
    pub sessions: usize,
    pub messages: usize,
    pub prompt_history: usize,
    pub command_history: usize,
}

impl StoreStats {
    /// Returns total number of rows across all tables.
    #[must_use]
    pub fn total(&self) -> usize {
        self.repositories
            + self.branches
            + self.sessions
            + self.messages
            + self.prompt_history
            + self.command_history
    }
}

impl Store {
    /// Open a database at the given path.
    ///
    /// Creates the containing directory if needed, enables foreign keys and
    /// WAL, and applies the schema. On any failure the connection is closed
    /// before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns `Error::Initialization` naming the failed stage.
    pub fn open(path: &Path) -> Result<Self> {
        let init_err = |stage: &'static str, source: Box<dyn std::error::Error + Send + Sync>| {
            Error::Initialization {
                path: path.to_path_buf(),
                stage,
                source,
            }
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| init_err("directory", e.into()))?;
        }

        let conn = Connection::open(path).map_err(|e| init_err("connect", e.into()))?;

        if let Err((stage, e)) = initialize(&conn) {
            close_quietly(conn);
            return Err(init_err(stage, e.into()));
        }

        info!(path = %path.display(), "Opened store");
        Ok(Self {
            conn: Some(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|e| Error::Initialization {
            path: path.clone(),
            stage: "connect",
            source: e.into(),
        })?;

        if let Err((stage, e)) = initialize(&conn) {
            close_quietly(conn);
            return Err(Error::Initialization {
                path,
                stage,
                source: e.into(),
            });
        }

        Ok(Self {
            conn: Some(conn),
            path: None,
        })
    }

    /// Path of the database file, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    /// Release the connection. Calling this on a closed store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite refuses to close (the handle is still
    /// considered closed afterwards).
    pub fn close(&mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        conn.close().map_err(|(_, e)| Error::Database(e))?;
        info!("Closed store");
        Ok(())
    }

    /// Get a reference to the underlying connection (for read operations).
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreClosed` after `close`.
    pub fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(Error::StoreClosed)
    }

    /// Execute a multi-statement write atomically.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Commits, or rolls back when the closure or commit fails
    ///
    /// SQLite failures are reported as `Error::Transaction` tagged with `op`;
    /// domain errors raised by the closure pass through unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. Nothing is committed in that case.
    pub fn mutate<F, R>(&mut self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction) -> Result<R>,
    {
        let conn = self.conn.as_mut().ok_or(Error::StoreClosed)?;

        run_in_transaction(conn, f).map_err(|e| match e {
            Error::Database(source) => {
                debug!(op, error = %source, "Transaction rolled back");
                Error::Transaction {
                    op: op.to_string(),
                    source,
                }
            }
            other => other,
        })
    }

    /// Run a read against the connection.
    ///
    /// SQLite failures come back as `Error::Query` tagged with `op` and the
    /// `key` being read; domain errors raised by `f` pass through unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or `f` fails.
    pub fn read<F, R>(&self, op: &str, key: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        f(self.conn()?).map_err(|e| match e {
            Error::Database(source) => Error::Query {
                op: op.to_string(),
                key: key.to_string(),
                source,
            },
            other => other,
        })
    }

    /// Reclaim free space.
    ///
    /// Rewrites the whole file; must not overlap any other operation on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint or VACUUM fails.
    pub fn compact(&mut self) -> Result<()> {
        let conn = self.conn()?;
        // Fold the WAL back first so VACUUM sees every page.
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            .optional()?;
        conn.execute_batch("VACUUM")?;
        info!("Compacted store");
        Ok(())
    }

    /// Row counts for each top-level table.
    ///
    /// # Errors
    ///
    /// Returns an error if a count query fails.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;
        let mut counts = [0usize; 6];
        for (slot, table) in counts.iter_mut().zip(TABLES) {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
            *slot = usize::try_from(n).unwrap_or(0);
        }

        let [repositories, branches, sessions, messages, prompt_history, command_history] = counts;
        Ok(StoreStats {
            repositories,
            branches,
            sessions,
            messages,
            prompt_history,
            command_history,
        })
    }

    /// The recorded schema version, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn schema_version(&self) -> Result<Option<i32>> {
        let version = self
            .conn()?
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
        Ok(version)
    }
}

fn run_in_transaction<F, R>(conn: &mut Connection, f: F) -> Result<R>
where
    F: FnOnce(&Transaction) -> Result<R>,
{
    let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

    // Dropping `tx` on the error path rolls back.
    let result = f(&tx)?;

    tx.commit()?;
    Ok(result)
}

/// Pragmas, busy timeout and schema, tagged with the stage that failed.
fn initialize(conn: &Connection) -> std::result::Result<(), (&'static str, rusqlite::Error)> {
    conn.busy_timeout(Duration::from_secs(5))
        .map_err(|e| ("pragmas", e))?;
    apply_pragmas(conn).map_err(|e| ("pragmas", e))?;
    apply_schema(conn).map_err(|e| ("schema", e))?;
    Ok(())
}

fn close_quietly(conn: Connection) {
    if let Err((_, e)) = conn.close() {
        warn!(error = %e, "Failed to close connection after initialization error");
    }
}

/// Current time in Unix seconds.
pub(crate) fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Cutoff timestamp for an age policy in days.
pub(crate) fn age_cutoff(max_age_days: u32) -> i64 {
    now_secs() - i64::from(max_age_days) * 86_400
}

/// Convert a `0 = unbounded` limit into SQLite's `LIMIT -1` convention.
pub(crate) fn sql_limit(limit: usize) -> i64 {
    if limit == 0 {
        -1
    } else {
        i64::try_from(limit).unwrap_or(i64::MAX)
    }
}
