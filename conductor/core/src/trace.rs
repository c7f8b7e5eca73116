//! Execution Trace
//!
//! Ordered record of the graph nodes and tools the agent ran while composing
//! a turn, and the reconciler that pairs start and completion events.
//!
//! # Matching
//!
//! The backend pairs start/stop events by name only. A completion closes the
//! *first* running entry with the same kind and name, in insertion order. A
//! completion with no running match is dropped: the reconciler never invents
//! entries and never fails a stream over an orphan.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Trace entry identifier, unique for the lifetime of the process
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TraceId(pub u64);

impl TraceId {
    /// Allocate the next ID
    #[must_use]
    pub fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "trace_{}", self.0)
    }
}

/// What kind of step an entry records
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraceKind {
    /// A graph node (e.g. "chatbot")
    Node,
    /// An external tool call (e.g. "get_weather")
    Tool,
}

impl TraceKind {
    /// Human-readable label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Tool => "tool",
        }
    }
}

/// Lifecycle of a trace entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceStatus {
    /// Started, no completion seen yet
    Running,
    /// Completion seen
    Complete,
}

impl TraceStatus {
    /// Get a status icon (for UI display)
    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Running => ">>>",
            Self::Complete => "[+]",
        }
    }
}

/// One node or tool execution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Unique ID, assigned at creation
    pub id: TraceId,
    /// Node or tool
    pub kind: TraceKind,
    /// Node or tool name as sent by the backend
    pub name: String,
    /// Current status
    pub status: TraceStatus,
    /// Tool arguments (tools only)
    pub args: Option<Map<String, Value>>,
    /// Tool result text (tools only, once complete)
    pub result: Option<String>,
}

impl TraceEntry {
    /// Create a running entry
    pub fn running(kind: TraceKind, name: impl Into<String>) -> Self {
        Self {
            id: TraceId::next(),
            kind,
            name: name.into(),
            status: TraceStatus::Running,
            args: None,
            result: None,
        }
    }

    /// Attach tool arguments
    #[must_use]
    pub fn with_args(mut self, args: Map<String, Value>) -> Self {
        self.args = Some(args);
        self
    }

    /// Whether this entry is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == TraceStatus::Running
    }
}

/// Maintains the live trace for the turn currently streaming
#[derive(Clone, Debug, Default)]
pub struct TraceReconciler {
    entries: Vec<TraceEntry>,
}

impl TraceReconciler {
    /// Create an empty reconciler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a start event
    ///
    /// Same-named running entries are allowed; each gets its own slot.
    pub fn on_start(
        &mut self,
        kind: TraceKind,
        name: impl Into<String>,
        args: Option<Map<String, Value>>,
    ) -> &TraceEntry {
        let entry = TraceEntry::running(kind, name);
        self.entries.push(match args {
            Some(args) => entry.with_args(args),
            None => entry,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Record a completion event
    ///
    /// Returns the completed entry, or `None` if the completion was an orphan.
    pub fn on_complete(
        &mut self,
        kind: TraceKind,
        name: &str,
        result: Option<String>,
    ) -> Option<&TraceEntry> {
        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.kind == kind && e.name == name && e.is_running())
        else {
            tracing::warn!(kind = kind.label(), name, "Dropping orphan completion");
            return None;
        };

        entry.status = TraceStatus::Complete;
        if result.is_some() {
            entry.result = result;
        }
        Some(&*entry)
    }

    /// Entries in insertion order
    #[must_use]
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Number of entries still running
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_running()).count()
    }

    /// Whether the trace is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
