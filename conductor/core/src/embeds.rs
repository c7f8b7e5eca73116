//! Media Embeds
//!
//! References to externally rendered media (videos, Spotify content) that
//! tools attach to a turn. Embeds are purely additive: no dedup, arrival
//! order only.

use serde::{Deserialize, Serialize};

/// Kind of Spotify content
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpotifyKind {
    /// A single track
    Track,
    /// An artist page
    Artist,
    /// An album
    Album,
    /// A playlist
    Playlist,
    /// Anything newer than this client
    #[serde(other)]
    Other,
}

impl SpotifyKind {
    /// Path segment used by Spotify embed URLs
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Artist => "artist",
            Self::Album => "album",
            Self::Playlist => "playlist",
            Self::Other => "other",
        }
    }
}

/// A media embed attached to a turn
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Embed {
    /// A YouTube video
    Youtube {
        /// YouTube video ID
        video_id: String,
        /// Video title
        title: String,
        /// Channel name, if known
        channel: Option<String>,
    },
    /// Spotify content
    Spotify {
        /// Track, album, ...
        content_type: SpotifyKind,
        /// Spotify ID
        id: String,
        /// Display name
        name: String,
        /// Artist, if known
        artist: Option<String>,
    },
}

impl Embed {
    /// URL of the provider's embeddable player
    #[must_use]
    pub fn embed_url(&self) -> String {
        match self {
            Self::Youtube { video_id, .. } => format!("https://www.youtube.com/embed/{video_id}"),
            Self::Spotify {
                content_type, id, ..
            } => format!("https://open.spotify.com/embed/{}/{id}", content_type.as_str()),
        }
    }

    /// One-line label for list views
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Youtube {
                title,
                channel: Some(channel),
                ..
            } => format!("{title} ({channel})"),
            Self::Youtube { title, .. } => title.clone(),
            Self::Spotify {
                name,
                artist: Some(artist),
                ..
            } => format!("{name} - {artist}"),
            Self::Spotify { name, .. } => name.clone(),
        }
    }
}

/// Accumulates embeds for the turn currently streaming
#[derive(Clone, Debug, Default)]
pub struct EmbedCollector {
    embeds: Vec<Embed>,
}

impl EmbedCollector {
    /// Create an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an embed
    pub fn on_embed(&mut self, embed: Embed) {
        self.embeds.push(embed);
    }

    /// Embeds in arrival order
    #[must_use]
    pub fn embeds(&self) -> &[Embed] {
        &self.embeds
    }

    /// Whether nothing was collected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.embeds.is_empty()
    }

    /// Forget all embeds
    pub fn clear(&mut self) {
        self.embeds.clear();
    }
}
