//! Terminal Painter
//!
//! Repaints from the Conductor's state. Update notifications only say *when*
//! to look; what gets printed always comes from a fresh snapshot, so a
//! dropped notification can delay output but never lose or garble it.
//!
//! Trace and embed notices go to `side` while the turn streams. When the turn
//! ends, the assistant message is rendered through the markup lexer to `out`
//! so the answer itself can be piped cleanly.

use std::collections::HashMap;
use std::io::{self, Write};
use std::time::Duration;

use zelf_conductor::{
    lex, to_plain_text, AgentBackend, Conductor, SessionSnapshot, TraceEntry, TraceId, TraceKind,
    TraceStatus, TurnOutcome,
};

/// How often an in-flight turn is re-read when no notification arrives
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// Renders a session for a plain terminal
pub struct Painter<O: Write, S: Write> {
    out: O,
    side: S,
    show_trace: bool,
    /// A turn was submitted and its answer is not printed yet
    in_turn: bool,
    /// Trace entries already listed, with the status they were listed at
    shown_trace: HashMap<TraceId, TraceStatus>,
    /// Embeds already listed
    shown_embeds: usize,
}

impl<O: Write, S: Write> Painter<O, S> {
    /// Create a painter
    pub fn new(out: O, side: S, show_trace: bool) -> Self {
        Self {
            out,
            side,
            show_trace,
            in_turn: false,
            shown_trace: HashMap::new(),
            shown_embeds: 0,
        }
    }

    /// A turn was accepted; watch it until it ends
    pub fn begin(&mut self) {
        self.in_turn = true;
        self.shown_trace.clear();
        self.shown_embeds = 0;
    }

    /// Whether a submitted turn is still waiting to be printed
    pub fn in_turn(&self) -> bool {
        self.in_turn
    }

    /// Re-read the Conductor and paint whatever changed
    pub fn repaint<B: AgentBackend + 'static>(&mut self, conductor: &Conductor<B>) -> io::Result<bool> {
        self.refresh(&conductor.snapshot())
    }

    /// Paint whatever changed since the last refresh
    ///
    /// Returns `true` exactly once per turn, when the turn has ended and its
    /// answer has been printed.
    pub fn refresh(&mut self, snapshot: &SessionSnapshot) -> io::Result<bool> {
        if !self.in_turn {
            return Ok(false);
        }

        self.paint_trace(&snapshot.live_trace)?;
        for embed in snapshot.live_embeds.iter().skip(self.shown_embeds) {
            writeln!(self.side, "  [embed] {} <{}>", embed.label(), embed.embed_url())?;
        }
        self.shown_embeds = self.shown_embeds.max(snapshot.live_embeds.len());

        if snapshot.streaming {
            return self.side.flush().map(|()| false);
        }

        // Failed turns already carry the error text as their content
        let answer = snapshot
            .messages
            .iter()
            .rev()
            .find(|m| m.is_assistant())
            .map(|m| render(&m.content))
            .unwrap_or_default();
        if !answer.is_empty() {
            writeln!(self.out, "{answer}")?;
        }
        match snapshot.last_outcome {
            Some(TurnOutcome::Closed) => {
                writeln!(self.side, "  (connection closed before the answer finished)")?;
            }
            Some(TurnOutcome::Cancelled) => writeln!(self.side, "  (cancelled)")?,
            _ => {}
        }

        self.in_turn = false;
        self.out.flush()?;
        self.side.flush()?;
        Ok(true)
    }

    fn paint_trace(&mut self, entries: &[TraceEntry]) -> io::Result<()> {
        if !self.show_trace {
            return Ok(());
        }
        for entry in entries {
            if self.shown_trace.get(&entry.id) != Some(&entry.status) {
                writeln!(self.side, "  {}", describe(entry))?;
                self.shown_trace.insert(entry.id, entry.status);
            }
        }
        Ok(())
    }
}

fn render(content: &str) -> String {
    to_plain_text(&lex(content)).trim_end_matches('\n').to_string()
}

fn describe(entry: &TraceEntry) -> String {
    let mut text = format!("{} {} {}", entry.status.icon(), entry.kind.label(), entry.name);
    if entry.kind == TraceKind::Tool {
        if let Some(result) = &entry.result {
            text.push_str(" -> ");
            text.push_str(result);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;
    use zelf_conductor::{AgentEvent, ConductorConfig, Message, ScriptedBackend, SessionUpdate};

    fn painter() -> Painter<Vec<u8>, Vec<u8>> {
        Painter::new(Vec::new(), Vec::new(), true)
    }

    fn out(p: &Painter<Vec<u8>, Vec<u8>>) -> String {
        String::from_utf8_lossy(&p.out).into_owned()
    }

    fn side(p: &Painter<Vec<u8>, Vec<u8>>) -> String {
        String::from_utf8_lossy(&p.side).into_owned()
    }

    fn answered(content: &str, outcome: TurnOutcome) -> SessionSnapshot {
        let mut answer = Message::assistant();
        answer.content = content.to_string();
        SessionSnapshot {
            messages: vec![Message::user("q"), answer],
            live_trace: Vec::new(),
            live_embeds: Vec::new(),
            streaming: false,
            user_location: None,
            last_outcome: Some(outcome),
        }
    }

    /// The CLI loop without stdin: notifications and the tick both repaint
    async fn watch<B: AgentBackend + 'static>(
        conductor: &Conductor<B>,
        p: &mut Painter<Vec<u8>, Vec<u8>>,
        updates: &mut mpsc::Receiver<SessionUpdate>,
    ) {
        let mut tick = tokio::time::interval(REFRESH_INTERVAL);
        let watched = async {
            loop {
                tokio::select! {
                    Some(_) = updates.recv() => {}
                    _ = tick.tick() => {}
                }
                if p.repaint(conductor).unwrap() {
                    break;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), watched)
            .await
            .expect("turn never ended");
    }

    #[test]
    fn test_answer_is_rendered_when_turn_ends() {
        let mut p = painter();
        p.begin();

        let mut streaming = answered("It's **72", TurnOutcome::Completed);
        streaming.streaming = true;
        streaming.last_outcome = None;
        assert!(!p.refresh(&streaming).unwrap());
        assert!(out(&p).is_empty());

        let done = answered("It's **72F** today\nsee [map](http://m)\n", TurnOutcome::Completed);
        assert!(p.refresh(&done).unwrap());
        assert_eq!(out(&p), "It's 72F today\nsee map (http://m)\n");

        // Nothing more once the turn is printed
        assert!(!p.refresh(&done).unwrap());
        assert_eq!(out(&p), "It's 72F today\nsee map (http://m)\n");
    }

    #[test]
    fn test_failure_prints_only_error_message() {
        let mut p = painter();
        p.begin();
        let failed = answered(
            "Something broke.",
            TurnOutcome::Failed {
                reason: "backend returned 500".to_string(),
            },
        );
        assert!(p.refresh(&failed).unwrap());
        assert_eq!(out(&p), "Something broke.\n");
    }

    #[test]
    fn test_cancel_keeps_partial_answer() {
        let mut p = painter();
        p.begin();
        assert!(p.refresh(&answered("half an ans", TurnOutcome::Cancelled)).unwrap());
        assert_eq!(out(&p), "half an ans\n");
        assert_eq!(side(&p), "  (cancelled)\n");
    }

    #[test]
    fn test_trace_is_listed_once_per_status() {
        let mut p = painter();
        p.begin();
        let mut entry = TraceEntry::running(TraceKind::Tool, "get_weather");
        let mut snapshot = answered("", TurnOutcome::Completed);
        snapshot.streaming = true;
        snapshot.live_trace = vec![entry.clone()];
        p.refresh(&snapshot).unwrap();
        p.refresh(&snapshot).unwrap();

        entry.status = TraceStatus::Complete;
        entry.result = Some("72F".to_string());
        snapshot.live_trace = vec![entry];
        p.refresh(&snapshot).unwrap();

        assert!(out(&p).is_empty());
        assert_eq!(
            side(&p),
            "  >>> tool get_weather\n  [+] tool get_weather -> 72F\n"
        );
    }

    #[test]
    fn test_trace_can_be_hidden() {
        let mut p = Painter::new(Vec::new(), Vec::new(), false);
        p.begin();
        let mut snapshot = answered("", TurnOutcome::Completed);
        snapshot.streaming = true;
        snapshot.live_trace = vec![TraceEntry::running(TraceKind::Node, "agent")];
        p.refresh(&snapshot).unwrap();
        assert!(side(&p).is_empty());
    }

    #[tokio::test]
    async fn test_long_answer_survives_notification_overflow() {
        let mut events: Vec<AgentEvent> = (0..400)
            .map(|i| AgentEvent::Token {
                content: if i == 0 { "w0".to_string() } else { format!(" w{i}") },
            })
            .collect();
        events.push(AgentEvent::Done);

        let (tx, mut updates) = mpsc::channel(256);
        let conductor = Conductor::new(ScriptedBackend::from_events(&events), ConductorConfig::default())
            .with_updates(tx);
        let mut p = painter();

        let handle = conductor.submit("long please", None).unwrap();
        p.begin();
        assert_eq!(handle.finished().await, TurnOutcome::Completed);

        // More tokens than the channel holds: TurnEnded was dropped
        let mut queued = Vec::new();
        while let Ok(update) = updates.try_recv() {
            queued.push(update);
        }
        assert_eq!(queued.len(), 256);
        assert!(!queued
            .iter()
            .any(|u| matches!(u, SessionUpdate::TurnEnded { .. })));

        watch(&conductor, &mut p, &mut updates).await;

        let content = conductor.messages()[1].content.clone();
        assert!(content.ends_with(" w399"));
        assert_eq!(out(&p), format!("{content}\n"));
    }

    #[tokio::test]
    async fn test_failed_turn_is_painted_from_state() {
        let config = ConductorConfig::default().with_error_message("Agent unavailable.");
        let (tx, mut updates) = mpsc::channel(256);
        let conductor = Conductor::new(ScriptedBackend::failing(500, "boom"), config).with_updates(tx);
        let mut p = painter();

        conductor.submit("hi", None).unwrap();
        p.begin();
        watch(&conductor, &mut p, &mut updates).await;

        assert_eq!(out(&p), "Agent unavailable.\n");
    }

    #[tokio::test]
    async fn test_tick_alone_ends_turn() {
        // No notification channel: only the tick repaints
        let (_, mut updates) = mpsc::channel(1);
        let events = [
            AgentEvent::Token {
                content: "**sunny**".to_string(),
            },
            AgentEvent::Done,
        ];
        let conductor = Conductor::new(ScriptedBackend::from_events(&events), ConductorConfig::default());
        let mut p = painter();

        conductor.submit("weather?", None).unwrap();
        p.begin();
        watch(&conductor, &mut p, &mut updates).await;

        assert_eq!(out(&p), "sunny\n");
        assert!(!p.in_turn());
    }
}
