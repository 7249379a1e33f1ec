//! Session and message models.
//!
//! A session is one persisted conversation. Its transcript is an ordered list
//! of messages; each message is stored as the JSON encoding of the whole
//! `Message` (role plus tagged parts) so the conversational layer gets back
//! exactly the variants it saved.

use super::Scope;
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl Role {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
        }
    }

    /// Parse a stored role string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }
}

/// One structured piece of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text {
        text: String,
    },
    Reasoning {
        text: String,
    },
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        call_id: String,
        output: String,
        #[serde(default)]
        is_error: bool,
    },
    Image {
        media_type: String,
        /// Base64 payload
        data: String,
    },
}

/// One turn in a session's transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
    /// Creation timestamp (Unix seconds)
    #[serde(default)]
    pub created_at: i64,
}

impl Message {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            role,
            parts,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// A single-part text message.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, vec![Part::Text { text: text.into() }])
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    /// Concatenated text of all `Text` parts, newline separated.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A conversation with its complete transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Caller-supplied durable handle
    pub id: String,

    /// Creation timestamp (Unix seconds)
    pub created_at: i64,

    /// Rewritten on every save (Unix seconds)
    pub last_updated: i64,

    /// First user prompt, used as a title in listings
    pub first_prompt: String,

    pub provider: String,
    pub model: String,
    pub working_dir: String,

    /// Ordered transcript; position is the stored sequence number
    pub messages: Vec<Message>,
}

impl Session {
    /// Create an empty session with a generated UUID id.
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        working_dir: impl Into<String>,
    ) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), provider, model, working_dir)
    }

    pub fn with_id(
        id: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        working_dir: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: id.into(),
            created_at: now,
            last_updated: now,
            first_prompt: String::new(),
            provider: provider.into(),
            model: model.into(),
            working_dir: working_dir.into(),
            messages: Vec::new(),
        }
    }

    /// Append a message, capturing the first user prompt as the title.
    pub fn push(&mut self, message: Message) {
        if self.first_prompt.is_empty() && message.role == Role::User {
            self.first_prompt = message.plain_text();
        }
        self.messages.push(message);
    }
}

/// A session as returned by `load_session`, with the scope it was saved under.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedSession {
    pub scope: Scope,
    pub session: Session,
}

/// A session row in list views: metadata and a message count, no bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    #[serde(flatten)]
    pub scope: Scope,
    pub created_at: i64,
    pub last_updated: i64,
    pub first_prompt: String,
    pub provider: String,
    pub model: String,
    pub working_dir: String,
    pub message_count: usize,
}
