//! Source-control identity for sessions and history.
//!
//! Every session and history entry hangs off a branch, and every branch
//! belongs to a repository identified by (host, org, project).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fully qualified branch: the key callers pass to scoped operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Hosting service (e.g. `github.com`)
    pub host: String,

    /// Organization or user; nested groups are joined with `/`
    pub org: String,

    /// Project (repository) name
    pub project: String,

    /// Branch name
    pub branch: String,
}

impl Scope {
    pub fn new(
        host: impl Into<String>,
        org: impl Into<String>,
        project: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            org: org.into(),
            project: project.into(),
            branch: branch.into(),
        }
    }

    /// Derive a scope from a git remote URL.
    ///
    /// Accepts the forms git itself accepts for remotes:
    /// - `https://github.com/acme/widget.git`
    /// - `ssh://git@github.com:22/acme/widget`
    /// - `git@github.com:acme/widget.git`
    ///
    /// Every path segment but the last becomes `org`, so
    /// `gitlab.com/group/sub/project` yields org `group/sub`.
    /// Returns `None` when the URL has no host or fewer than two path segments.
    #[must_use]
    pub fn parse_remote(url: &str, branch: &str) -> Option<Self> {
        let url = url.trim().trim_end_matches('/');
        let url = url.strip_suffix(".git").unwrap_or(url);

        let (host, path) = if let Some((_, rest)) = url.split_once("://") {
            let (authority, path) = rest.split_once('/')?;
            let host = authority.rsplit('@').next()?;
            let host = host.split(':').next()?;
            (host, path)
        } else {
            // scp-like syntax: [user@]host:path
            let (authority, path) = url.split_once(':')?;
            if authority.contains('/') {
                return None;
            }
            let host = authority.rsplit('@').next()?;
            (host, path)
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let (project, org) = segments.split_last()?;
        if host.is_empty() || org.is_empty() {
            return None;
        }

        Some(Self::new(host, org.join("/"), *project, branch))
    }

    /// The repository part of the scope, `host/org/project`.
    #[must_use]
    pub fn repository_path(&self) -> String {
        format!("{}/{}/{}", self.host, self.org, self.project)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.repository_path(), self.branch)
    }
}

/// A stored repository row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub host: String,
    pub org: String,
    pub project: String,
}

/// A stored branch row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: i64,
    pub repository_id: i64,
    pub name: String,
}
