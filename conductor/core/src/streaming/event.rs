//! Agent Events
//!
//! Typed view of one frame payload. The backend sends JSON objects with a
//! `type` discriminator; this module maps them onto a closed enum.
//!
//! Parsing is lossy on purpose at the edges:
//! - not JSON, no `type`, or a known `type` with missing fields: `None`
//! - an unknown `type`: `Some(AgentEvent::Unknown)`, which callers ignore

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::embeds::{Embed, SpotifyKind};

/// One event from the agent stream
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A graph node started
    NodeStart {
        /// Node name
        node: String,
    },
    /// A graph node finished
    NodeComplete {
        /// Node name
        node: String,
    },
    /// A tool was invoked
    ToolCall {
        /// Tool name
        tool: String,
        /// Tool arguments
        #[serde(default)]
        args: Map<String, Value>,
    },
    /// A tool returned
    ToolResult {
        /// Tool name
        tool: String,
        /// Result text (non-string results are kept as compact JSON)
        #[serde(default, deserialize_with = "text_or_json")]
        result: Option<String>,
    },
    /// A piece of the assistant's answer
    Token {
        /// Text to append
        content: String,
    },
    /// A YouTube video to embed
    YoutubeEmbed {
        /// YouTube video ID
        video_id: String,
        /// Video title
        title: String,
        /// Channel name
        #[serde(default)]
        channel: Option<String>,
    },
    /// Spotify content to embed
    SpotifyEmbed {
        /// Track, album, ...
        content_type: SpotifyKind,
        /// Spotify ID
        id: String,
        /// Display name
        name: String,
        /// Artist
        #[serde(default)]
        artist: Option<String>,
    },
    /// The turn is over
    Done,
    /// A `type` this client does not know
    #[serde(other)]
    Unknown,
}

impl AgentEvent {
    /// Parse one frame payload
    ///
    /// Returns `None` for anything that is not a recognizable event object.
    #[must_use]
    pub fn parse(payload: &str) -> Option<Self> {
        let payload = payload.trim();
        if payload.is_empty() {
            return None;
        }
        match serde_json::from_str(payload) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed frame");
                None
            }
        }
    }

    /// The embed carried by this event, if any
    #[must_use]
    pub fn to_embed(&self) -> Option<Embed> {
        match self {
            Self::YoutubeEmbed {
                video_id,
                title,
                channel,
            } => Some(Embed::Youtube {
                video_id: video_id.clone(),
                title: title.clone(),
                channel: channel.clone(),
            }),
            Self::SpotifyEmbed {
                content_type,
                id,
                name,
                artist,
            } => Some(Embed::Spotify {
                content_type: *content_type,
                id: id.clone(),
                name: name.clone(),
                artist: artist.clone(),
            }),
            _ => None,
        }
    }

    /// Short name for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NodeStart { .. } => "node_start",
            Self::NodeComplete { .. } => "node_complete",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Token { .. } => "token",
            Self::YoutubeEmbed { .. } => "youtube_embed",
            Self::SpotifyEmbed { .. } => "spotify_embed",
            Self::Done => "done",
            Self::Unknown => "unknown",
        }
    }
}

fn text_or_json<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}
