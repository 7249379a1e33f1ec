//! Repository and branch identity resolution.
//!
//! Maps (host, org, project) and branch names to stable integer ids,
//! creating rows on first use.

use crate::error::{Error, Result};
use crate::model::{Branch, Repository, Scope};
use crate::storage::Store;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

impl Store {
    /// Get or create the repository for (host, org, project).
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or insert fails.
    pub fn resolve_repository(&mut self, host: &str, org: &str, project: &str) -> Result<i64> {
        self.mutate("resolve_repository", |tx| {
            resolve_repository_id(tx, host, org, project)
        })
    }

    /// Get or create the branch `name` under `repository_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository does not exist or the insert fails.
    pub fn resolve_branch(&mut self, repository_id: i64, name: &str) -> Result<i64> {
        self.mutate("resolve_branch", |tx| resolve_branch_id(tx, repository_id, name))
    }

    /// Get or create both rows for a scope, returning the branch id.
    ///
    /// # Errors
    ///
    /// Returns an error if either resolution fails.
    pub fn resolve_scope(&mut self, scope: &Scope) -> Result<i64> {
        self.mutate("resolve_scope", |tx| resolve_scope_branch_id(tx, scope))
    }

    /// Look up a repository by its unique key. Absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_repository(&self, host: &str, org: &str, project: &str) -> Result<Option<Repository>> {
        self.read("get_repository", &format!("{host}/{org}/{project}"), |conn| {
            Ok(conn
                .query_row(
                    "SELECT id, host, org, project FROM repositories
                     WHERE host = ?1 AND org = ?2 AND project = ?3",
                    [host, org, project],
                    map_repository_row,
                )
                .optional()?)
        })
    }

    /// Look up a branch by its unique key. Absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_branch(&self, repository_id: i64, name: &str) -> Result<Option<Branch>> {
        self.read("get_branch", &format!("{name} in repository {repository_id}"), |conn| {
            Ok(conn
                .query_row(
                    "SELECT id, repository_id, name FROM branches
                     WHERE repository_id = ?1 AND name = ?2",
                    rusqlite::params![repository_id, name],
                    map_branch_row,
                )
                .optional()?)
        })
    }

    /// Look up the branch for a full scope without creating anything.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn find_scope(&self, scope: &Scope) -> Result<Option<Branch>> {
        match self.get_repository(&scope.host, &scope.org, &scope.project)? {
            Some(repo) => self.get_branch(repo.id, &scope.branch),
            None => Ok(None),
        }
    }

    /// List all repositories, ordered by host, org and project.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_repositories(&self) -> Result<Vec<Repository>> {
        self.read("list_repositories", "all repositories", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, host, org, project FROM repositories ORDER BY host, org, project",
            )?;
            let repos = stmt
                .query_map([], map_repository_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(repos)
        })
    }

    /// List the branches of a repository, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_branches(&self, repository_id: i64) -> Result<Vec<Branch>> {
        self.read("list_branches", &format!("repository {repository_id}"), |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, repository_id, name FROM branches WHERE repository_id = ?1 ORDER BY name",
            )?;
            let branches = stmt
                .query_map([repository_id], map_branch_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(branches)
        })
    }

    /// Delete a repository and, via cascade, its branches, sessions,
    /// messages and history.
    ///
    /// # Errors
    ///
    /// Returns `Error::RepositoryNotFound` if no row was removed.
    pub fn delete_repository(&mut self, id: i64) -> Result<()> {
        let affected = self.mutate("delete_repository", |tx| {
            Ok(tx.execute("DELETE FROM repositories WHERE id = ?1", [id])?)
        })?;
        if affected == 0 {
            return Err(Error::RepositoryNotFound { id: id.to_string() });
        }
        info!(repository_id = id, "Deleted repository");
        Ok(())
    }

    /// Delete a branch and, via cascade, its sessions, messages and history.
    ///
    /// # Errors
    ///
    /// Returns `Error::BranchNotFound` if no row was removed.
    pub fn delete_branch(&mut self, id: i64) -> Result<()> {
        let affected = self.mutate("delete_branch", |tx| {
            Ok(tx.execute("DELETE FROM branches WHERE id = ?1", [id])?)
        })?;
        if affected == 0 {
            return Err(Error::BranchNotFound { id: id.to_string() });
        }
        info!(branch_id = id, "Deleted branch");
        Ok(())
    }
}

// Check-then-insert is race-free only because a store has one connection.
// The insert still uses ON CONFLICT DO NOTHING and re-selects, so a second
// writer on the same file cannot produce a duplicate or a spurious error.

pub(crate) fn resolve_repository_id(
    conn: &Connection,
    host: &str,
    org: &str,
    project: &str,
) -> Result<i64> {
    let lookup = |conn: &Connection| {
        conn.query_row(
            "SELECT id FROM repositories WHERE host = ?1 AND org = ?2 AND project = ?3",
            [host, org, project],
            |row| row.get::<_, i64>(0),
        )
        .optional()
    };

    if let Some(id) = lookup(conn)? {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO repositories (host, org, project) VALUES (?1, ?2, ?3)
         ON CONFLICT(host, org, project) DO NOTHING",
        [host, org, project],
    )?;
    let id = lookup(conn)?.ok_or_else(|| {
        Error::Other(format!("repository {host}/{org}/{project} vanished after insert"))
    })?;

    debug!(id, host, org, project, "Created repository");
    Ok(id)
}

pub(crate) fn resolve_branch_id(conn: &Connection, repository_id: i64, name: &str) -> Result<i64> {
    let lookup = |conn: &Connection| {
        conn.query_row(
            "SELECT id FROM branches WHERE repository_id = ?1 AND name = ?2",
            rusqlite::params![repository_id, name],
            |row| row.get::<_, i64>(0),
        )
        .optional()
    };

    if let Some(id) = lookup(conn)? {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO branches (repository_id, name) VALUES (?1, ?2)
         ON CONFLICT(repository_id, name) DO NOTHING",
        rusqlite::params![repository_id, name],
    )?;
    let id = lookup(conn)?.ok_or_else(|| {
        Error::Other(format!("branch {name} of repository {repository_id} vanished after insert"))
    })?;

    debug!(id, repository_id, name, "Created branch");
    Ok(id)
}

pub(crate) fn resolve_scope_branch_id(conn: &Connection, scope: &Scope) -> Result<i64> {
    let repository_id = resolve_repository_id(conn, &scope.host, &scope.org, &scope.project)?;
    resolve_branch_id(conn, repository_id, &scope.branch)
}

fn map_repository_row(row: &rusqlite::Row) -> rusqlite::Result<Repository> {
    Ok(Repository {
        id: row.get(0)?,
        host: row.get(1)?,
        org: row.get(2)?,
        project: row.get(3)?,
    })
}

fn map_branch_row(row: &rusqlite::Row) -> rusqlite::Result<Branch> {
    Ok(Branch {
        id: row.get(0)?,
        repository_id: row.get(1)?,
        name: row.get(2)?,
    })
}
