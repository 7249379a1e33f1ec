//! Branch-scoped prompt and command history.
//!
//! History is independent of sessions: entries persist across sessions on
//! the same branch. Appends optionally cap the branch to its newest N
//! entries in the same transaction, so no scheduled job is needed.

use crate::error::Result;
use crate::model::{HistoryEntry, HistoryKind, Scope};
use crate::storage::identity::resolve_scope_branch_id;
use crate::storage::sqlite::{age_cutoff, now_secs, sql_limit};
use crate::storage::Store;
use tracing::{debug, info};

impl Store {
    /// Record a prompt, keeping at most `max_entries` for the branch (`0` = uncapped).
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn append_prompt(&mut self, scope: &Scope, text: &str, max_entries: usize) -> Result<()> {
        self.append_history(HistoryKind::Prompt, scope, text, max_entries)
    }

    /// Record a command, keeping at most `max_entries` for the branch (`0` = uncapped).
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn append_command(&mut self, scope: &Scope, text: &str, max_entries: usize) -> Result<()> {
        self.append_history(HistoryKind::Command, scope, text, max_entries)
    }

    /// The newest `limit` prompts for a branch, oldest first (`0` = all).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails. An unknown branch yields an empty list.
    pub fn load_prompt_history(&self, scope: &Scope, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.load_history(HistoryKind::Prompt, scope, limit)
    }

    /// The newest `limit` commands for a branch, oldest first (`0` = all).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails. An unknown branch yields an empty list.
    pub fn load_command_history(&self, scope: &Scope, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.load_history(HistoryKind::Command, scope, limit)
    }

    /// Delete every prompt for a branch. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails. An unknown branch is a no-op.
    pub fn clear_prompt_history(&mut self, scope: &Scope) -> Result<usize> {
        self.clear_history(HistoryKind::Prompt, scope)
    }

    /// Delete every command for a branch. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails. An unknown branch is a no-op.
    pub fn clear_command_history(&mut self, scope: &Scope) -> Result<usize> {
        self.clear_history(HistoryKind::Command, scope)
    }

    /// Delete prompts and commands older than `max_age_days` on every branch.
    /// Skipped when `max_age_days` is 0. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is removed then.
    pub fn cleanup_old_history(&mut self, max_age_days: u32) -> Result<usize> {
        if max_age_days == 0 {
            return Ok(0);
        }

        let cutoff = age_cutoff(max_age_days);
        let removed = self.mutate("cleanup_old_history", |tx| {
            let mut removed = 0;
            for kind in [HistoryKind::Prompt, HistoryKind::Command] {
                removed += tx.execute(
                    &format!("DELETE FROM {} WHERE timestamp < ?1", kind.table()),
                    [cutoff],
                )?;
            }
            Ok(removed)
        })?;

        if removed > 0 {
            info!(removed, max_age_days, "Removed old history entries");
        }
        Ok(removed)
    }

    /// Append to either history stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn append_history(
        &mut self,
        kind: HistoryKind,
        scope: &Scope,
        text: &str,
        max_entries: usize,
    ) -> Result<()> {
        let table = kind.table();
        let column = kind.column();

        let trimmed = self.mutate(&format!("append_{}", kind.as_str()), |tx| {
            let branch_id = resolve_scope_branch_id(tx, scope)?;

            tx.execute(
                &format!("INSERT INTO {table} (branch_id, {column}, timestamp) VALUES (?1, ?2, ?3)"),
                rusqlite::params![branch_id, text, now_secs()],
            )?;

            if max_entries == 0 {
                return Ok(0);
            }

            let trimmed = tx.execute(
                &format!(
                    "DELETE FROM {table} WHERE branch_id = ?1 AND id NOT IN (
                         SELECT id FROM {table} WHERE branch_id = ?1
                         ORDER BY timestamp DESC, id DESC
                         LIMIT ?2
                     )"
                ),
                rusqlite::params![branch_id, sql_limit(max_entries)],
            )?;
            Ok(trimmed)
        })?;

        debug!(kind = kind.as_str(), scope = %scope, trimmed, "Appended history entry");
        Ok(())
    }

    /// Load either history stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn load_history(
        &self,
        kind: HistoryKind,
        scope: &Scope,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        let Some(branch) = self.find_scope(scope)? else {
            return Ok(Vec::new());
        };

        let table = kind.table();
        let column = kind.column();
        self.read(&format!("load_{}_history", kind.as_str()), &scope.to_string(), |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, branch_id, {column}, timestamp FROM (
                     SELECT id, branch_id, {column}, timestamp FROM {table}
                     WHERE branch_id = ?1
                     ORDER BY timestamp DESC, id DESC
                     LIMIT ?2
                 )
                 ORDER BY timestamp ASC, id ASC"
            ))?;

            let entries = stmt
                .query_map(rusqlite::params![branch.id, sql_limit(limit)], |row| {
                    Ok(HistoryEntry {
                        id: row.get(0)?,
                        branch_id: row.get(1)?,
                        text: row.get(2)?,
                        timestamp: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    /// Clear either history stream for a branch.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear_history(&mut self, kind: HistoryKind, scope: &Scope) -> Result<usize> {
        let Some(branch) = self.find_scope(scope)? else {
            return Ok(0);
        };

        let removed = self.mutate(&format!("clear_{}_history", kind.as_str()), |tx| {
            Ok(tx.execute(
                &format!("DELETE FROM {} WHERE branch_id = ?1", kind.table()),
                [branch.id],
            )?)
        })?;

        debug!(kind = kind.as_str(), scope = %scope, removed, "Cleared history");
        Ok(removed)
    }
}
