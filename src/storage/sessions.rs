//! Session persistence.
//!
//! A save replaces the session row and its entire transcript in one
//! transaction: existing message rows are deleted and the provided list is
//! re-inserted with `sequence` set to its position. This costs O(messages)
//! per save but never needs diffing, and keeps `sequence` dense (0..n-1).

use crate::error::{Error, Result};
use crate::model::{LoadedSession, Message, Role, Scope, Session, SessionSummary};
use crate::storage::identity::resolve_scope_branch_id;
use crate::storage::sqlite::{age_cutoff, now_secs, sql_limit};
use crate::storage::Store;
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What a retention pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Sessions older than the age cutoff.
    pub expired: usize,
    /// Sessions beyond the global count limit.
    pub over_limit: usize,
}

impl CleanupReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.expired + self.over_limit
    }
}

const SUMMARY_SELECT: &str = "
    SELECT s.id, r.host, r.org, r.project, b.name,
           s.created_at, s.last_updated, s.first_prompt, s.provider, s.model, s.working_dir,
           COUNT(m.id) AS message_count
    FROM sessions s
    JOIN branches b ON b.id = s.branch_id
    JOIN repositories r ON r.id = b.repository_id
    LEFT JOIN messages m ON m.session_id = s.id";

impl Store {
    /// Persist a session and its complete transcript atomically.
    ///
    /// Sets `session.last_updated` to now. The stored row is overwritten
    /// (last writer wins) and the stored transcript becomes exactly
    /// `session.messages`, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any statement fails; nothing is
    /// written in that case.
    pub fn save_session(&mut self, session: &mut Session, scope: &Scope) -> Result<()> {
        let now = now_secs();

        // Serialize up front so an encoding failure never opens a transaction.
        let encoded = session
            .messages
            .iter()
            .map(|m| serde_json::to_string(m).map(|json| (m, json)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let snapshot: &Session = session;
        self.mutate("save_session", |tx| {
            let branch_id = resolve_scope_branch_id(tx, scope)?;

            tx.execute(
                "INSERT INTO sessions (id, branch_id, created_at, last_updated, first_prompt, provider, model, working_dir, save_seq)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                         (SELECT COALESCE(MAX(save_seq), 0) + 1 FROM sessions))
                 ON CONFLICT(id) DO UPDATE SET
                   branch_id = excluded.branch_id,
                   created_at = excluded.created_at,
                   last_updated = excluded.last_updated,
                   first_prompt = excluded.first_prompt,
                   provider = excluded.provider,
                   model = excluded.model,
                   working_dir = excluded.working_dir,
                   save_seq = excluded.save_seq",
                rusqlite::params![
                    snapshot.id,
                    branch_id,
                    snapshot.created_at,
                    now,
                    snapshot.first_prompt,
                    snapshot.provider,
                    snapshot.model,
                    snapshot.working_dir,
                ],
            )?;

            tx.execute("DELETE FROM messages WHERE session_id = ?1", [&snapshot.id])?;

            let mut insert = tx.prepare(
                "INSERT INTO messages (session_id, sequence, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (sequence, (message, content)) in encoded.iter().enumerate() {
                insert.execute(rusqlite::params![
                    snapshot.id,
                    i64::try_from(sequence).unwrap_or(i64::MAX),
                    message.role.as_str(),
                    content,
                    message.created_at,
                ])?;
            }

            Ok(())
        })?;

        session.last_updated = now;
        debug!(
            session_id = %session.id,
            scope = %scope,
            messages = session.messages.len(),
            "Saved session"
        );
        Ok(())
    }

    /// Load a session, its scope, and its transcript (oldest first).
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionNotFound` if no session has this id, and
    /// `Error::CorruptData` if any stored message fails to decode.
    pub fn load_session(&self, id: &str) -> Result<LoadedSession> {
        let loaded = self.read("load_session", id, |conn| {
            let loaded = conn
                .query_row(
                    "SELECT s.id, s.created_at, s.last_updated, s.first_prompt, s.provider, s.model, s.working_dir,
                            r.host, r.org, r.project, b.name
                     FROM sessions s
                     JOIN branches b ON b.id = s.branch_id
                     JOIN repositories r ON r.id = b.repository_id
                     WHERE s.id = ?1",
                    [id],
                    |row| {
                        Ok(LoadedSession {
                            session: Session {
                                id: row.get(0)?,
                                created_at: row.get(1)?,
                                last_updated: row.get(2)?,
                                first_prompt: row.get(3)?,
                                provider: row.get(4)?,
                                model: row.get(5)?,
                                working_dir: row.get(6)?,
                                messages: Vec::new(),
                            },
                            scope: Scope {
                                host: row.get(7)?,
                                org: row.get(8)?,
                                project: row.get(9)?,
                                branch: row.get(10)?,
                            },
                        })
                    },
                )
                .optional()?;

            let mut loaded = loaded.ok_or_else(|| Error::SessionNotFound { id: id.to_string() })?;

            let mut stmt = conn.prepare(
                "SELECT sequence, role, content, created_at FROM messages
                 WHERE session_id = ?1 ORDER BY sequence ASC",
            )?;
            let rows = stmt
                .query_map([id], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            loaded.session.messages = rows
                .into_iter()
                .map(|(sequence, role, content, created_at)| {
                    decode_message(id, sequence, &role, &content, created_at)
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(loaded)
        })?;

        debug!(
            session_id = id,
            messages = loaded.session.messages.len(),
            "Loaded session"
        );
        Ok(loaded)
    }

    /// Sessions on one branch, most recently updated first.
    ///
    /// `limit == 0` means unbounded. Message bodies are not loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_sessions(&self, scope: &Scope, limit: usize) -> Result<Vec<SessionSummary>> {
        self.read("list_sessions", &scope.to_string(), |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SUMMARY_SELECT}
                 WHERE r.host = ?1 AND r.org = ?2 AND r.project = ?3 AND b.name = ?4
                 GROUP BY s.id
                 ORDER BY s.last_updated DESC, s.save_seq DESC
                 LIMIT ?5"
            ))?;
            let sessions = stmt
                .query_map(
                    rusqlite::params![
                        scope.host,
                        scope.org,
                        scope.project,
                        scope.branch,
                        sql_limit(limit)
                    ],
                    map_summary_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(sessions)
        })
    }

    /// Sessions across every repository and branch, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_all_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>> {
        self.read("list_all_sessions", "all scopes", |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SUMMARY_SELECT}
                 GROUP BY s.id
                 ORDER BY s.last_updated DESC, s.save_seq DESC
                 LIMIT ?1"
            ))?;
            let sessions = stmt
                .query_map([sql_limit(limit)], map_summary_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(sessions)
        })
    }

    /// Delete a session and its messages.
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionNotFound` if no row was removed.
    pub fn delete_session(&mut self, id: &str) -> Result<()> {
        let affected = self.mutate("delete_session", |tx| {
            Ok(tx.execute("DELETE FROM sessions WHERE id = ?1", [id])?)
        })?;
        if affected == 0 {
            return Err(Error::SessionNotFound { id: id.to_string() });
        }
        debug!(session_id = id, "Deleted session");
        Ok(())
    }

    /// Apply the session retention policy.
    ///
    /// Two independent passes in one transaction:
    /// 1. delete sessions not updated within `max_age_days` (skipped when 0);
    /// 2. keep only the `max_sessions` most recently updated sessions across
    ///    all branches (skipped when 0).
    ///
    /// # Errors
    ///
    /// Returns an error if a delete fails; nothing is removed in that case.
    pub fn cleanup_old_sessions(&mut self, max_age_days: u32, max_sessions: usize) -> Result<CleanupReport> {
        if max_age_days == 0 && max_sessions == 0 {
            return Ok(CleanupReport::default());
        }

        let report = self.mutate("cleanup_old_sessions", |tx| {
            let mut report = CleanupReport::default();

            if max_age_days > 0 {
                report.expired = tx.execute(
                    "DELETE FROM sessions WHERE last_updated < ?1",
                    [age_cutoff(max_age_days)],
                )?;
            }

            if max_sessions > 0 {
                report.over_limit = tx.execute(
                    "DELETE FROM sessions WHERE id NOT IN (
                         SELECT id FROM sessions
                         ORDER BY last_updated DESC, save_seq DESC
                         LIMIT ?1
                     )",
                    [sql_limit(max_sessions)],
                )?;
            }

            Ok(report)
        })?;

        if report.total() > 0 {
            info!(
                expired = report.expired,
                over_limit = report.over_limit,
                max_age_days,
                max_sessions,
                "Removed old sessions"
            );
        }
        Ok(report)
    }
}

fn decode_message(
    session_id: &str,
    sequence: i64,
    role: &str,
    content: &str,
    created_at: i64,
) -> Result<Message> {
    let corrupt = |reason: String| Error::CorruptData {
        session_id: session_id.to_string(),
        sequence,
        reason,
    };

    let mut message: Message =
        serde_json::from_str(content).map_err(|e| corrupt(format!("invalid content: {e}")))?;

    match Role::parse(role) {
        Some(stored) if stored == message.role => {}
        Some(stored) => {
            return Err(corrupt(format!(
                "role column `{}` disagrees with content role `{}`",
                stored.as_str(),
                message.role.as_str()
            )));
        }
        None => return Err(corrupt(format!("unknown role `{role}`"))),
    }

    message.created_at = created_at;
    Ok(message)
}

fn map_summary_row(row: &rusqlite::Row) -> rusqlite::Result<SessionSummary> {
    let message_count: i64 = row.get(11)?;
    Ok(SessionSummary {
        id: row.get(0)?,
        scope: Scope {
            host: row.get(1)?,
            org: row.get(2)?,
            project: row.get(3)?,
            branch: row.get(4)?,
        },
        created_at: row.get(5)?,
        last_updated: row.get(6)?,
        first_prompt: row.get(7)?,
        provider: row.get(8)?,
        model: row.get(9)?,
        working_dir: row.get(10)?,
        message_count: usize::try_from(message_count).unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Part;

    fn scope(branch: &str) -> Scope {
        Scope::new("github.com", "acme", "widget", branch)
    }

    fn session_with(id: &str, n: usize) -> Session {
        let mut session = Session::with_id(id, "anthropic", "claude", "/work/widget");
        for i in 0..n {
            if i % 2 == 0 {
                session.push(Message::user(format!("question {i}")));
            } else {
                session.push(Message::assistant(format!("answer {i}")));
            }
        }
        session
    }

    fn set_last_updated(store: &Store, id: &str, ts: i64) {
        store
            .conn()
            .unwrap()
            .execute(
                "UPDATE sessions SET last_updated = ?1 WHERE id = ?2",
                rusqlite::params![ts, id],
            )
            .unwrap();
    }

    fn session_ids(store: &Store) -> Vec<String> {
        let mut ids: Vec<String> = store
            .list_all_sessions(0)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let mut store = Store::open_memory().unwrap();
        let mut session = session_with("s1", 4);
        session.push(Message::new(
            Role::Assistant,
            vec![
                Part::Reasoning { text: "think".into() },
                Part::ToolCall {
                    id: "call_1".into(),
                    name: "read_file".into(),
                    input: serde_json::json!({"path": "src/main.rs"}),
                },
            ],
        ));
        session.push(Message::new(
            Role::Tool,
            vec![Part::ToolResult {
                call_id: "call_1".into(),
                output: "fn main() {}".into(),
                is_error: false,
            }],
        ));

        store.save_session(&mut session, &scope("main")).unwrap();
        let loaded = store.load_session("s1").unwrap();

        assert_eq!(loaded.scope, scope("main"));
        assert_eq!(loaded.session.messages, session.messages);
        assert_eq!(loaded.session.first_prompt, "question 0");
        assert_eq!(loaded.session.provider, "anthropic");
        assert_eq!(loaded.session.last_updated, session.last_updated);
    }

    #[test]
    fn test_sequence_is_dense() {
        let mut store = Store::open_memory().unwrap();
        let mut session = session_with("s1", 5);
        store.save_session(&mut session, &scope("main")).unwrap();

        let sequences: Vec<i64> = store
            .conn()
            .unwrap()
            .prepare("SELECT sequence FROM messages WHERE session_id = 's1' ORDER BY sequence")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_resave_truncates_transcript() {
        let mut store = Store::open_memory().unwrap();
        let mut session = session_with("s1", 5);
        store.save_session(&mut session, &scope("main")).unwrap();

        session.messages.truncate(2);
        store.save_session(&mut session, &scope("main")).unwrap();

        let loaded = store.load_session("s1").unwrap();
        assert_eq!(loaded.session.messages.len(), 2);
        assert_eq!(store.stats().unwrap().messages, 2);
    }

    #[test]
    fn test_resave_overwrites_metadata_and_moves_branch() {
        let mut store = Store::open_memory().unwrap();
        let mut session = session_with("s1", 1);
        store.save_session(&mut session, &scope("main")).unwrap();

        session.model = "claude-next".into();
        store.save_session(&mut session, &scope("feature")).unwrap();

        let loaded = store.load_session("s1").unwrap();
        assert_eq!(loaded.session.model, "claude-next");
        assert_eq!(loaded.scope.branch, "feature");
        assert_eq!(store.stats().unwrap().sessions, 1);
    }

    #[test]
    fn test_load_missing_session() {
        let store = Store::open_memory().unwrap();
        let err = store.load_session("nope").unwrap_err();
        assert!(matches!(err, Error::SessionNotFound { id } if id == "nope"));
    }

    #[test]
    fn test_load_corrupt_message_fails_whole_load() {
        let mut store = Store::open_memory().unwrap();
        let mut session = session_with("s1", 3);
        store.save_session(&mut session, &scope("main")).unwrap();

        store
            .conn()
            .unwrap()
            .execute(
                "UPDATE messages SET content = '{not json' WHERE session_id = 's1' AND sequence = 1",
                [],
            )
            .unwrap();

        match store.load_session("s1") {
            Err(Error::CorruptData { session_id, sequence, .. }) => {
                assert_eq!(session_id, "s1");
                assert_eq!(sequence, 1);
            }
            other => panic!("expected corrupt data, got {other:?}"),
        }
    }

    #[test]
    fn test_load_rejects_role_mismatch() {
        let mut store = Store::open_memory().unwrap();
        let mut session = session_with("s1", 1);
        store.save_session(&mut session, &scope("main")).unwrap();
        store
            .conn()
            .unwrap()
            .execute("UPDATE messages SET role = 'assistant'", [])
            .unwrap();

        assert!(matches!(
            store.load_session("s1"),
            Err(Error::CorruptData { .. })
        ));
    }

    #[test]
    fn test_read_failures_name_operation_and_key() {
        let mut store = Store::open_memory().unwrap();
        let mut session = session_with("s1", 2);
        store.save_session(&mut session, &scope("main")).unwrap();
        store
            .conn()
            .unwrap()
            .execute_batch("DROP TABLE messages")
            .unwrap();

        match store.load_session("s1") {
            Err(Error::Query { op, key, .. }) => {
                assert_eq!(op, "load_session");
                assert_eq!(key, "s1");
            }
            other => panic!("expected query error, got {other:?}"),
        }
        assert!(matches!(
            store.list_sessions(&scope("main"), 0),
            Err(Error::Query { ref op, ref key, .. })
                if op == "list_sessions" && key == "github.com/acme/widget@main"
        ));
        assert!(matches!(
            store.search_messages("x", 0),
            Err(Error::Query { ref op, ref key, .. }) if op == "search_messages" && key == "x"
        ));
        // Absence is still reported as such, not as a query failure
        assert!(matches!(
            store.load_session("missing"),
            Err(Error::SessionNotFound { .. })
        ));
    }

    #[test]
    fn test_failed_save_leaves_prior_state() {
        let mut store = Store::open_memory().unwrap();
        let mut session = session_with("s1", 3);
        store.save_session(&mut session, &scope("main")).unwrap();

        // Make the message insert fail halfway through the transaction.
        store
            .conn()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_fourth BEFORE INSERT ON messages
                 WHEN NEW.sequence = 3
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let mut longer = session_with("s1", 5);
        let err = store.save_session(&mut longer, &scope("main")).unwrap_err();
        assert!(matches!(err, Error::Transaction { ref op, .. } if op == "save_session"));

        let loaded = store.load_session("s1").unwrap();
        assert_eq!(loaded.session.messages, session.messages);
    }

    #[test]
    fn test_list_sessions_by_branch_with_counts() {
        let mut store = Store::open_memory().unwrap();
        for (id, n, branch, ts) in [
            ("a", 2, "main", 100),
            ("b", 0, "main", 300),
            ("c", 4, "main", 200),
            ("d", 1, "dev", 400),
        ] {
            let mut session = session_with(id, n);
            store.save_session(&mut session, &scope(branch)).unwrap();
            set_last_updated(&store, id, ts);
        }

        let main = store.list_sessions(&scope("main"), 0).unwrap();
        let ids: Vec<&str> = main.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        let counts: Vec<usize> = main.iter().map(|s| s.message_count).collect();
        assert_eq!(counts, vec![0, 4, 2]);

        let limited = store.list_sessions(&scope("main"), 2).unwrap();
        assert_eq!(limited.len(), 2);

        let all = store.list_all_sessions(0).unwrap();
        assert_eq!(all.first().unwrap().id, "d");
        assert_eq!(all.first().unwrap().scope.branch, "dev");
        assert_eq!(all.len(), 4);

        assert!(store.list_sessions(&scope("nowhere"), 0).unwrap().is_empty());
    }

    #[test]
    fn test_delete_session() {
        let mut store = Store::open_memory().unwrap();
        let mut session = session_with("s1", 3);
        store.save_session(&mut session, &scope("main")).unwrap();

        store.delete_session("s1").unwrap();
        assert_eq!(store.stats().unwrap().messages, 0);
        assert!(matches!(
            store.delete_session("s1"),
            Err(Error::SessionNotFound { .. })
        ));
    }

    #[test]
    fn test_cleanup_by_age() {
        let mut store = Store::open_memory().unwrap();
        let now = now_secs();
        for (id, days_ago) in [("old", 10), ("older", 30), ("fresh", 1), ("new", 0)] {
            let mut session = session_with(id, 2);
            store.save_session(&mut session, &scope("main")).unwrap();
            set_last_updated(&store, id, now - days_ago * 86_400);
        }

        let report = store.cleanup_old_sessions(7, 0).unwrap();
        assert_eq!(report, CleanupReport { expired: 2, over_limit: 0 });
        assert_eq!(session_ids(&store), vec!["fresh", "new"]);
        assert_eq!(store.stats().unwrap().messages, 4);
    }

    #[test]
    fn test_cleanup_by_count_is_global() {
        let mut store = Store::open_memory().unwrap();
        let now = now_secs();
        for (i, (id, branch)) in [("a", "main"), ("b", "dev"), ("c", "main"), ("d", "dev"), ("e", "x")]
            .into_iter()
            .enumerate()
        {
            let mut session = session_with(id, 1);
            store.save_session(&mut session, &scope(branch)).unwrap();
            set_last_updated(&store, id, now - 100 + i64::try_from(i).unwrap());
        }

        let report = store.cleanup_old_sessions(0, 2).unwrap();
        assert_eq!(report.over_limit, 3);
        assert_eq!(session_ids(&store), vec!["d", "e"]);
    }

    #[test]
    fn test_resave_in_same_second_counts_as_most_recent() {
        let mut store = Store::open_memory().unwrap();
        let mut sessions: Vec<Session> = ["a", "b", "c"].iter().map(|id| session_with(id, 1)).collect();
        for session in &mut sessions {
            store.save_session(session, &scope("main")).unwrap();
        }
        store.save_session(&mut sessions[0], &scope("main")).unwrap();

        let ts = now_secs();
        for id in ["a", "b", "c"] {
            set_last_updated(&store, id, ts);
        }

        let order: Vec<String> = store
            .list_all_sessions(0)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(order, vec!["a", "c", "b"]);

        let report = store.cleanup_old_sessions(0, 1).unwrap();
        assert_eq!(report.over_limit, 2);
        assert_eq!(session_ids(&store), vec!["a"]);
    }

    #[test]
    fn test_cleanup_disabled_policies_remove_nothing() {
        let mut store = Store::open_memory().unwrap();
        let mut session = session_with("s1", 1);
        store.save_session(&mut session, &scope("main")).unwrap();
        set_last_updated(&store, "s1", 0);

        assert_eq!(store.cleanup_old_sessions(0, 0).unwrap().total(), 0);
        assert_eq!(session_ids(&store), vec!["s1"]);
    }

    #[test]
    fn test_cleanup_keeps_sessions_within_window() {
        let mut store = Store::open_memory().unwrap();
        for id in ["a", "b"] {
            let mut session = session_with(id, 1);
            store.save_session(&mut session, &scope("main")).unwrap();
        }

        let report = store.cleanup_old_sessions(30, 10).unwrap();
        assert_eq!(report.total(), 0);
        assert_eq!(session_ids(&store).len(), 2);
    }
}
