//! Regex search over stored message content.
//!
//! This is a linear scan: the pattern is tested against each message's raw
//! JSON content, newest first. Because the raw encoding is searched, patterns
//! can also match structural field names such as `"tool_call"`.

use crate::error::{Error, Result};
use crate::storage::Store;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Characters kept on each side of the first match.
pub const SNIPPET_RADIUS: usize = 100;

/// One matching message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub session_id: String,
    /// Position of the message within its session
    pub sequence: i64,
    pub role: String,
    /// Up to `SNIPPET_RADIUS` characters either side of the first match
    pub snippet: String,
    /// Unix seconds
    pub created_at: i64,
}

impl Store {
    /// Find messages whose content matches `pattern`, newest first.
    ///
    /// Stops once `limit` hits are collected (`0` = unbounded). Rows are
    /// streamed from the cursor, so an early stop does not read the rest.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if `pattern` does not compile.
    pub fn search_messages(&self, pattern: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let re = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let (hits, scanned) = self.read("search_messages", pattern, |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, sequence, role, content, created_at FROM messages
                 ORDER BY created_at DESC, id DESC",
            )?;
            let mut rows = stmt.query([])?;

            let mut hits = Vec::new();
            let mut scanned = 0usize;
            while let Some(row) = rows.next()? {
                scanned += 1;
                let content: String = row.get(3)?;
                let Some(found) = re.find(&content) else {
                    continue;
                };

                hits.push(SearchHit {
                    session_id: row.get(0)?,
                    sequence: row.get(1)?,
                    role: row.get(2)?,
                    snippet: extract_snippet(&content, found.start(), found.end(), SNIPPET_RADIUS),
                    created_at: row.get(4)?,
                });

                if limit > 0 && hits.len() >= limit {
                    break;
                }
            }
            Ok((hits, scanned))
        })?;

        debug!(pattern, scanned, hits = hits.len(), "Searched messages");
        Ok(hits)
    }
}

/// Slice `radius` characters before `start` through `radius` characters
/// after `end`, clipped to the content. Offsets are byte offsets on char
/// boundaries (as returned by `regex`).
#[must_use]
pub fn extract_snippet(content: &str, start: usize, end: usize, radius: usize) -> String {
    let begin = content[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map_or(start, |(i, _)| i);
    let finish = content[end..]
        .char_indices()
        .nth(radius)
        .map_or(content.len(), |(i, _)| end + i);
    content[begin..finish].to_string()
}
