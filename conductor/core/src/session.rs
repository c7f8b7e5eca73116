//! Session State
//!
//! Owns the conversation, the live trace and embeds of the turn in flight,
//! and the streaming flag. The Conductor drives every transition; UI
//! surfaces only read.
//!
//! # Turn Lifecycle
//!
//! ```text
//!   Idle ──begin_turn──► Streaming ──apply_event(Done)──► Idle   (Completed)
//!                            │ ──finish(Closed)─────────► Idle   (Closed)
//!                            │ ──finish(Cancelled)──────► Idle   (Cancelled)
//!                            └ ──finish(Failed)─────────► Idle   (Failed)
//! ```
//!
//! Every transition names the turn it belongs to. Only the active turn can
//! change state, so exactly one terminal transition happens per turn and a
//! stale stream can never touch the next turn's message.

use serde::{Deserialize, Serialize};

use crate::embeds::{Embed, EmbedCollector};
use crate::messages::{
    ChatRequest, Location, Message, MessageId, SessionUpdate, TurnOutcome, WireMessage,
};
use crate::streaming::AgentEvent;
use crate::trace::{TraceEntry, TraceKind, TraceReconciler};

/// Turn identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub u64);

impl TurnId {
    /// Allocate the next turn ID
    #[must_use]
    pub fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "turn_{}", self.0)
    }
}

/// Result of applying one event
#[derive(Clone, Debug, PartialEq)]
pub enum Dispatch {
    /// Applied; carries the update to publish, if any
    Applied(Option<SessionUpdate>),
    /// `Done` was applied and the turn is finished
    Finished,
    /// The turn is no longer active; stop dispatching
    Stale,
}

/// Owned copy of the observable state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Conversation, oldest first
    pub messages: Vec<Message>,
    /// Trace of the current (or most recent) turn
    pub live_trace: Vec<TraceEntry>,
    /// Embeds of the current (or most recent) turn
    pub live_embeds: Vec<Embed>,
    /// Whether a turn is streaming
    pub streaming: bool,
    /// Last known user location
    pub user_location: Option<Location>,
    /// How the most recent turn ended (`None` while streaming or before any turn)
    pub last_outcome: Option<TurnOutcome>,
}

/// The conversation and its live turn
#[derive(Debug, Default)]
pub struct SessionState {
    messages: Vec<Message>,
    trace: TraceReconciler,
    embeds: EmbedCollector,
    streaming: bool,
    user_location: Option<Location>,
    active_turn: Option<TurnId>,
    last_outcome: Option<TurnOutcome>,
}

impl SessionState {
    /// Create an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversation history
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Live trace
    #[must_use]
    pub fn live_trace(&self) -> &[TraceEntry] {
        self.trace.entries()
    }

    /// Live embeds
    #[must_use]
    pub fn live_embeds(&self) -> &[Embed] {
        self.embeds.embeds()
    }

    /// Whether a turn is streaming
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Last known user location
    #[must_use]
    pub fn user_location(&self) -> Option<Location> {
        self.user_location
    }

    /// How the most recent turn ended
    #[must_use]
    pub fn last_outcome(&self) -> Option<&TurnOutcome> {
        self.last_outcome.as_ref()
    }

    /// Turn currently streaming
    #[must_use]
    pub fn active_turn(&self) -> Option<TurnId> {
        self.active_turn
    }

    /// Copy the observable state
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.messages.clone(),
            live_trace: self.trace.entries().to_vec(),
            live_embeds: self.embeds.embeds().to_vec(),
            streaming: self.streaming,
            user_location: self.user_location,
            last_outcome: self.last_outcome.clone(),
        }
    }

    /// Remember a location for later turns
    pub fn set_location(&mut self, location: Option<Location>) {
        self.user_location = location;
    }

    /// Start a turn
    ///
    /// Returns the open assistant message and the request to send, or `None`
    /// if a turn is already active.
    pub fn begin_turn(
        &mut self,
        turn: TurnId,
        text: impl Into<String>,
        location: Option<Location>,
    ) -> Option<(MessageId, ChatRequest)> {
        if self.active_turn.is_some() {
            return None;
        }

        // A cancelled or failed turn left its trace in the live collections
        if let Some(index) = self.messages.iter().rposition(Message::is_assistant) {
            self.freeze_live_onto(index);
        }

        self.messages.push(Message::user(text));
        let messages = self.messages.iter().map(WireMessage::from).collect();

        self.trace.clear();
        self.embeds.clear();

        let open = Message::assistant();
        let open_id = open.id.clone();
        self.messages.push(open);

        self.streaming = true;
        self.active_turn = Some(turn);
        self.last_outcome = None;
        if location.is_some() {
            self.user_location = location;
        }

        let request = ChatRequest {
            messages,
            location: self.user_location,
        };
        Some((open_id, request))
    }

    /// Apply one event to the active turn
    pub fn apply_event(&mut self, turn: TurnId, event: AgentEvent) -> Dispatch {
        if self.active_turn != Some(turn) {
            return Dispatch::Stale;
        }

        let update = match event {
            AgentEvent::NodeStart { node } => Some(SessionUpdate::TraceChanged {
                entry: self.trace.on_start(TraceKind::Node, node, None).clone(),
            }),
            AgentEvent::NodeComplete { node } => self
                .trace
                .on_complete(TraceKind::Node, &node, None)
                .map(|entry| SessionUpdate::TraceChanged {
                    entry: entry.clone(),
                }),
            AgentEvent::ToolCall { tool, args } => Some(SessionUpdate::TraceChanged {
                entry: self.trace.on_start(TraceKind::Tool, tool, Some(args)).clone(),
            }),
            AgentEvent::ToolResult { tool, result } => self
                .trace
                .on_complete(TraceKind::Tool, &tool, result)
                .map(|entry| SessionUpdate::TraceChanged {
                    entry: entry.clone(),
                }),
            AgentEvent::Token { content } => self.open_message_mut().map(|message| {
                message.content.push_str(&content);
                SessionUpdate::Token {
                    message_id: message.id.clone(),
                    text: content,
                }
            }),
            event @ (AgentEvent::YoutubeEmbed { .. } | AgentEvent::SpotifyEmbed { .. }) => {
                event.to_embed().map(|embed| {
                    self.embeds.on_embed(embed.clone());
                    SessionUpdate::EmbedAdded { embed }
                })
            }
            AgentEvent::Done => {
                self.finish(turn, &TurnOutcome::Completed, "");
                return Dispatch::Finished;
            }
            AgentEvent::Unknown => None,
        };

        Dispatch::Applied(update)
    }

    /// End the active turn
    ///
    /// Returns `false` if `turn` is not the active turn (someone else already
    /// ended it).
    pub fn finish(&mut self, turn: TurnId, outcome: &TurnOutcome, error_message: &str) -> bool {
        if self.active_turn != Some(turn) {
            return false;
        }

        match outcome {
            TurnOutcome::Completed | TurnOutcome::Closed => {
                if let Some(index) = self.open_message_index() {
                    self.freeze_live_onto(index);
                }
            }
            TurnOutcome::Cancelled => {}
            TurnOutcome::Failed { .. } => {
                if let Some(message) = self.open_message_mut() {
                    message.content = error_message.to_string();
                }
            }
        }

        self.streaming = false;
        self.active_turn = None;
        self.last_outcome = Some(outcome.clone());
        true
    }

    /// Drop the whole conversation
    ///
    /// Returns `false` (and changes nothing) while a turn is streaming.
    pub fn clear(&mut self) -> bool {
        if self.active_turn.is_some() {
            return false;
        }
        self.messages.clear();
        self.trace.clear();
        self.embeds.clear();
        self.last_outcome = None;
        true
    }

    fn open_message_index(&self) -> Option<usize> {
        self.active_turn?;
        let index = self.messages.len().checked_sub(1)?;
        self.messages[index].is_assistant().then_some(index)
    }

    fn open_message_mut(&mut self) -> Option<&mut Message> {
        let index = self.open_message_index()?;
        self.messages.get_mut(index)
    }

    /// Copy the live collections onto a message that has none of its own
    fn freeze_live_onto(&mut self, index: usize) {
        let message = &mut self.messages[index];
        if message.trace.is_empty() && !self.trace.is_empty() {
            message.trace = self.trace.entries().to_vec();
        }
        if message.embeds.is_empty() && !self.embeds.is_empty() {
            message.embeds = self.embeds.embeds().to_vec();
        }
    }
}
