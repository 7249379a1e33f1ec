//! Prompt and command history models.

use serde::{Deserialize, Serialize};

/// Which history stream an operation targets.
///
/// Both streams share a shape and differ only in table and text column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Prompt,
    Command,
}

impl HistoryKind {
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Prompt => "prompt_history",
            Self::Command => "command_history",
        }
    }

    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Command => "command",
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Command => "command",
        }
    }
}

/// A remembered prompt or command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub branch_id: i64,
    pub text: String,
    /// Unix seconds
    pub timestamp: i64,
}
