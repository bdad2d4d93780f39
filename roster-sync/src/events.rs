//! Event stream emitted while a run progresses.
//!
//! The engine never prints. Callers pass an [`EventSink`]: a `Vec<Event>`
//! in tests, an `mpsc::Sender<Event>` for a UI thread, or their own
//! implementation (the CLI prints each event as it arrives).

use std::fmt;
use std::sync::mpsc;

use serde::Serialize;

use crate::plan::Action;

/// Stage of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Matching assignments and reading rosters.
    Match,
    Levels,
    Estado,
    Assign,
    Remove,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Match => "match",
            Phase::Levels => "niveles",
            Phase::Estado => "estado",
            Phase::Assign => "asignar",
            Phase::Remove => "eliminar",
        };
        f.write_str(label)
    }
}

/// Verdict for one executed (or simulated) action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub action: Action,
    pub dry_run: bool,
    /// `None` on success, the error message otherwise.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Progress {
        phase: Phase,
        current: usize,
        total: usize,
        message: String,
    },
    Log {
        text: String,
    },
    Action(ActionReport),
}

pub trait EventSink {
    fn emit(&mut self, event: Event);

    fn log(&mut self, text: impl Into<String>)
    where
        Self: Sized,
    {
        self.emit(Event::Log { text: text.into() });
    }
}

/// Shorthand used inside the engine, where sinks are `&mut dyn EventSink`.
pub(crate) fn log(sink: &mut dyn EventSink, text: impl Into<String>) {
    sink.emit(Event::Log { text: text.into() });
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

impl EventSink for mpsc::Sender<Event> {
    fn emit(&mut self, event: Event) {
        // A dropped receiver only means nobody is watching.
        let _ = self.send(event);
    }
}

/// Text of every `Log` event, in order.
pub fn log_lines(events: &[Event]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Log { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}
