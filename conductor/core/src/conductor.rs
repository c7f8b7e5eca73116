//! Conductor - The Session Engine
//!
//! The Conductor owns one conversation and drives it against an
//! [`AgentBackend`]. It is UI-agnostic: a surface calls [`Conductor::submit`]
//! and [`Conductor::cancel`], reads state through the observers, and may
//! subscribe to [`SessionUpdate`] hints to know when to repaint.
//!
//! # Concurrency
//!
//! Each turn runs on its own tokio task. All state lives in one mutex that
//! is taken around each discrete transition and never held across an
//! `.await`. The task's only suspension points are opening the stream and
//! awaiting the next chunk; both race against the turn's cancellation token.
//!
//! Terminal transitions are claimed under the mutex by turn ID, so exactly
//! one of done, close, failure, or cancel takes effect per turn.

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::AgentBackend;
use crate::config::ConductorConfig;
use crate::embeds::Embed;
use crate::error::ConductorError;
use crate::messages::{ChatRequest, Location, Message, MessageId, SessionUpdate, TurnOutcome};
use crate::session::{Dispatch, SessionSnapshot, SessionState, TurnId};
use crate::streaming::{AgentEvent, FrameDecoder};
use crate::trace::TraceEntry;

/// State shared between the Conductor and its turn task
#[derive(Debug, Default)]
struct Shared {
    session: SessionState,
    cancel: Option<CancellationToken>,
}

/// The Conductor - headless session engine
pub struct Conductor<B: AgentBackend> {
    config: Arc<ConductorConfig>,
    backend: Arc<B>,
    shared: Arc<Mutex<Shared>>,
    updates: Option<mpsc::Sender<SessionUpdate>>,
}

impl<B: AgentBackend> Clone for Conductor<B> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            backend: Arc::clone(&self.backend),
            shared: Arc::clone(&self.shared),
            updates: self.updates.clone(),
        }
    }
}

impl<B: AgentBackend + 'static> Conductor<B> {
    /// Create a Conductor with an empty conversation
    pub fn new(backend: B, config: ConductorConfig) -> Self {
        Self {
            config: Arc::new(config),
            backend: Arc::new(backend),
            shared: Arc::new(Mutex::new(Shared::default())),
            updates: None,
        }
    }

    /// Publish update hints on `tx`
    ///
    /// Updates are sent with `try_send`; a full channel drops the hint, never
    /// the state change behind it.
    #[must_use]
    pub fn with_updates(mut self, tx: mpsc::Sender<SessionUpdate>) -> Self {
        self.updates = Some(tx);
        self
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &ConductorConfig {
        &self.config
    }

    /// The backend
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Start a turn
    ///
    /// Returns `None` without touching state if a turn is already streaming.
    /// `location` overrides the remembered location; `None` reuses it.
    pub fn submit(&self, text: impl Into<String>, location: Option<Location>) -> Option<TurnHandle> {
        let turn = TurnId::next();
        let token = CancellationToken::new();

        let (message_id, request) = {
            let mut shared = self.shared.lock();
            let Some(begun) = shared.session.begin_turn(turn, text, location) else {
                tracing::debug!("Ignoring submit while a turn is streaming");
                return None;
            };
            shared.cancel = Some(token.clone());
            begun
        };

        tracing::info!(
            turn = %turn,
            message_id = %message_id,
            history = request.messages.len(),
            has_location = request.location.is_some(),
            "Starting turn"
        );
        self.publish(SessionUpdate::TurnStarted {
            message_id: message_id.clone(),
        });

        let worker = TurnWorker {
            turn,
            backend: Arc::clone(&self.backend),
            shared: Arc::clone(&self.shared),
            updates: self.updates.clone(),
            error_message: self.config.error_message.clone(),
            token,
        };
        let join = tokio::spawn(worker.run(request));

        Some(TurnHandle {
            turn,
            message_id,
            join,
        })
    }

    /// Abort the streaming turn
    ///
    /// Partial content and the live trace are kept. Returns `false` if no
    /// turn was streaming.
    pub fn cancel(&self) -> bool {
        let turn = {
            let mut shared = self.shared.lock();
            let Some(turn) = shared.session.active_turn() else {
                return false;
            };
            shared
                .session
                .finish(turn, &TurnOutcome::Cancelled, &self.config.error_message);
            if let Some(token) = shared.cancel.take() {
                token.cancel();
            }
            turn
        };

        tracing::info!(turn = %turn, "Turn cancelled");
        self.publish(SessionUpdate::TurnEnded {
            outcome: TurnOutcome::Cancelled,
        });
        true
    }

    /// Remember a location for later turns (`None` forgets it)
    pub fn set_location(&self, location: Option<Location>) {
        self.shared.lock().session.set_location(location);
    }

    /// Drop the conversation
    ///
    /// Refused (returns `false`) while a turn is streaming.
    pub fn clear(&self) -> bool {
        let cleared = self.shared.lock().session.clear();
        if cleared {
            tracing::info!("Conversation cleared");
        }
        cleared
    }

    /// Probe the backend
    pub async fn health_check(&self) -> bool {
        self.backend.health_check().await
    }

    /// Conversation history
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.shared.lock().session.messages().to_vec()
    }

    /// Trace of the current (or most recent) turn
    #[must_use]
    pub fn live_trace(&self) -> Vec<TraceEntry> {
        self.shared.lock().session.live_trace().to_vec()
    }

    /// Embeds of the current (or most recent) turn
    #[must_use]
    pub fn live_embeds(&self) -> Vec<Embed> {
        self.shared.lock().session.live_embeds().to_vec()
    }

    /// Whether a turn is streaming
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.shared.lock().session.is_streaming()
    }

    /// Last known user location
    #[must_use]
    pub fn user_location(&self) -> Option<Location> {
        self.shared.lock().session.user_location()
    }

    /// How the most recent turn ended
    #[must_use]
    pub fn last_outcome(&self) -> Option<TurnOutcome> {
        self.shared.lock().session.last_outcome().cloned()
    }

    /// All observable state, read under one lock
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.lock().session.snapshot()
    }

    fn publish(&self, update: SessionUpdate) {
        publish(self.updates.as_ref(), update);
    }
}

/// Handle to a running turn
#[derive(Debug)]
pub struct TurnHandle {
    turn: TurnId,
    message_id: MessageId,
    join: JoinHandle<TurnOutcome>,
}

impl TurnHandle {
    /// Turn ID
    #[must_use]
    pub fn turn(&self) -> TurnId {
        self.turn
    }

    /// The assistant message this turn writes into
    #[must_use]
    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// Wait for the turn task to exit
    pub async fn finished(self) -> TurnOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(turn = %self.turn, error = %e, "Turn task aborted");
                TurnOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Everything one turn task needs
struct TurnWorker<B: AgentBackend> {
    turn: TurnId,
    backend: Arc<B>,
    shared: Arc<Mutex<Shared>>,
    updates: Option<mpsc::Sender<SessionUpdate>>,
    error_message: String,
    token: CancellationToken,
}

impl<B: AgentBackend> TurnWorker<B> {
    async fn run(self, request: ChatRequest) -> TurnOutcome {
        let opened = tokio::select! {
            biased;
            () = self.token.cancelled() => return TurnOutcome::Cancelled,
            result = self.backend.open_stream(&request) => result,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => return self.fail(&e),
        };

        let mut decoder = FrameDecoder::new();
        loop {
            let chunk = tokio::select! {
                biased;
                () = self.token.cancelled() => return TurnOutcome::Cancelled,
                chunk = stream.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    for frame in decoder.feed(&bytes) {
                        let Some(event) = AgentEvent::parse(&frame.payload) else {
                            continue;
                        };
                        if let Some(outcome) = self.dispatch(event) {
                            return outcome;
                        }
                    }
                }
                Some(Err(e)) => return self.fail(&e),
                None => {
                    decoder.finish();
                    return self.close();
                }
            }
        }
    }

    /// Apply one event; `Some` once the turn is over
    fn dispatch(&self, event: AgentEvent) -> Option<TurnOutcome> {
        tracing::debug!(turn = %self.turn, kind = event.kind(), "Dispatching event");

        let dispatch = {
            let mut shared = self.shared.lock();
            let dispatch = shared.session.apply_event(self.turn, event);
            if dispatch == Dispatch::Finished {
                shared.cancel = None;
            }
            dispatch
        };

        match dispatch {
            Dispatch::Applied(Some(update)) => {
                publish(self.updates.as_ref(), update);
                None
            }
            Dispatch::Applied(None) => None,
            Dispatch::Finished => {
                tracing::info!(turn = %self.turn, "Turn completed");
                publish(
                    self.updates.as_ref(),
                    SessionUpdate::TurnEnded {
                        outcome: TurnOutcome::Completed,
                    },
                );
                Some(TurnOutcome::Completed)
            }
            // Only cancel ends a turn behind the worker's back
            Dispatch::Stale => Some(TurnOutcome::Cancelled),
        }
    }

    fn close(&self) -> TurnOutcome {
        tracing::warn!(turn = %self.turn, "Stream ended without done; keeping partial output");
        self.end(TurnOutcome::Closed)
    }

    fn fail(&self, error: &ConductorError) -> TurnOutcome {
        tracing::warn!(turn = %self.turn, error = %error, "Turn failed");
        self.end(TurnOutcome::Failed {
            reason: error.reason(),
        })
    }

    fn end(&self, outcome: TurnOutcome) -> TurnOutcome {
        let claimed = {
            let mut shared = self.shared.lock();
            let claimed = shared
                .session
                .finish(self.turn, &outcome, &self.error_message);
            if claimed {
                shared.cancel = None;
            }
            claimed
        };

        if !claimed {
            return TurnOutcome::Cancelled;
        }
        publish(
            self.updates.as_ref(),
            SessionUpdate::TurnEnded {
                outcome: outcome.clone(),
            },
        );
        outcome
    }
}

fn publish(updates: Option<&mpsc::Sender<SessionUpdate>>, update: SessionUpdate) {
    let Some(tx) = updates else {
        return;
    };
    if let Err(e) = tx.try_send(update) {
        match e {
            mpsc::error::TrySendError::Full(_) => {
                tracing::debug!("Update channel full; dropping update");
            }
            mpsc::error::TrySendError::Closed(_) => {
                tracing::debug!("Update channel closed");
            }
        }
    }
}
