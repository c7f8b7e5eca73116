//! Conversation Messages
//!
//! The conversation data model, the request body sent to the backend, and the
//! update notifications the Conductor publishes to a UI surface.
//!
//! # Design Philosophy
//!
//! The Conductor owns all mutable state. A UI surface never edits a
//! `Message`; it re-reads snapshots whenever a `SessionUpdate` tells it
//! something changed.

use serde::{Deserialize, Serialize};

use crate::embeds::Embed;
use crate::trace::TraceEntry;

/// Message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    #[must_use]
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a message
///
/// The backend only accepts these two roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The human
    User,
    /// The agent
    Assistant,
}

/// Geographic position forwarded to location-aware tools
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
}

impl Location {
    /// Create a location
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A message in the conversation
///
/// `trace` and `embeds` stay empty while the turn is live; they are filled
/// with a frozen copy of the live collections when the turn ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// Execution trace recorded for this turn
    #[serde(default)]
    pub trace: Vec<TraceEntry>,
    /// Media embeds collected for this turn
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content.into())
    }

    /// Create an empty assistant message, ready to receive tokens
    #[must_use]
    pub fn assistant() -> Self {
        Self::new(MessageRole::Assistant, String::new())
    }

    fn new(role: MessageRole, content: String) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content,
            trace: Vec::new(),
            embeds: Vec::new(),
        }
    }

    /// Whether this is an assistant message
    #[must_use]
    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}

/// A message as the backend sees it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Author role
    pub role: MessageRole,
    /// Text content
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Request body for one turn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Full conversation so far, oldest first
    pub messages: Vec<WireMessage>,
    /// Optional user location (`null` when unknown)
    pub location: Option<Location>,
}

/// How a turn ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnOutcome {
    /// The backend sent `done`
    Completed,
    /// The transport closed before `done`; partial output was kept
    Closed,
    /// The user cancelled; partial output was kept
    Cancelled,
    /// The transport failed; the message shows the error text
    Failed {
        /// What went wrong (for logs, not for the user)
        reason: String,
    },
}

/// Notifications from the Conductor to a UI surface
///
/// These are hints to repaint. The state behind them is always read from
/// the Conductor itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SessionUpdate {
    /// A new turn opened its assistant message
    TurnStarted {
        /// The open assistant message
        message_id: MessageId,
    },
    /// Text was appended to the open assistant message
    Token {
        /// The open assistant message
        message_id: MessageId,
        /// Appended text
        text: String,
    },
    /// A trace entry was created or completed
    TraceChanged {
        /// Entry after the change
        entry: TraceEntry,
    },
    /// An embed was collected
    EmbedAdded {
        /// The new embed
        embed: Embed,
    },
    /// The turn reached a terminal state
    TurnEnded {
        /// How it ended
        outcome: TurnOutcome,
    },
}
