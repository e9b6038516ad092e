//! Change tracking for propagation passes.
//!
//! Every rewrite the pipeline performs is recorded as an [`Event`] in an [`EventLog`]. The log is
//! append-only and can be shared between worker threads, so the scheduler hands the same log to
//! every function it processes. Callers that do not care about the record can simply drop it.
//!
//! # Architecture
//!
//! - [`EventKind`] - What happened (constant folded, branch simplified, ...)
//! - [`Event`] - One recorded occurrence, tagged with function and block
//! - [`EventLog`] - Thread-safe collection with query and summary helpers
//! - [`EventBuilder`] - Fluent construction, committed on drop
//!
//! # Example
//!
//! ```rust
//! use ccprop::compiler::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::ConstantFolded)
//!     .at("main", 2)
//!     .message("%4 -> 5");
//! log.record(EventKind::Info).message("pass finished");
//!
//! assert_eq!(log.len(), 2);
//! assert_eq!(log.summary(), "1 constant folded");
//! ```

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

/// Categories of recorded events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A compare or arithmetic instruction was replaced by its constant.
    ConstantFolded,
    /// A phi merge was replaced by its constant.
    PhiSimplified,
    /// A conditional branch was rewritten into an unconditional jump.
    BranchSimplified,
    /// A folded instruction was detached from its block.
    InstructionRemoved,

    /// A pass started on a function.
    PassStarted,
    /// A pass finished on a function.
    PassCompleted,

    /// Informational message, such as the value history of an instruction.
    Info,
    /// Something unexpected that did not stop the pass.
    Warning,
    /// A pass failed.
    Error,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::ConstantFolded => "constant folded",
            Self::PhiSimplified => "phi simplified",
            Self::BranchSimplified => "branch simplified",
            Self::InstructionRemoved => "instruction removed",
            Self::PassStarted => "pass started",
            Self::PassCompleted => "pass completed",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Returns `true` if this event represents a change to the function.
    #[must_use]
    pub fn is_transformation(&self) -> bool {
        matches!(
            self,
            Self::ConstantFolded
                | Self::PhiSimplified
                | Self::BranchSimplified
                | Self::InstructionRemoved
        )
    }

    /// Returns `true` for info, warning and error events.
    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Info | Self::Warning | Self::Error)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single logged event.
#[derive(Debug, Clone)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// Name of the function the event belongs to, if any.
    pub function: Option<String>,
    /// Block index within the function.
    pub block: Option<usize>,
    /// Human-readable description.
    pub message: String,
    /// Name of the pass that recorded the event.
    pub pass: Option<String>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(function) = &self.function {
            write!(f, " {function}")?;
            if let Some(block) = self.block {
                write!(f, ":B{block}")?;
            }
        }
        write!(f, " {}", self.message)
    }
}

/// Builder for events, created by [`EventLog::record`].
///
/// The event is pushed into the log when the builder is dropped.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    function: Option<String>,
    block: Option<usize>,
    message: Option<String>,
    pass: Option<String>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            function: None,
            block: None,
            message: None,
            pass: None,
        }
    }

    /// Sets the function and block where the event occurred.
    pub fn at(mut self, function: impl Into<String>, block: usize) -> Self {
        self.function = Some(function.into());
        self.block = Some(block);
        self
    }

    /// Sets only the function, for function-level events.
    pub fn function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Sets only the block.
    pub fn block(mut self, block: usize) -> Self {
        self.block = Some(block);
        self
    }

    /// Sets the message. Without one, the kind's description is used.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Associates the event with a pass.
    pub fn pass(mut self, pass_name: impl Into<String>) -> Self {
        self.pass = Some(pass_name.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        self.log.events.push(Event {
            kind: self.kind,
            function: self.function.take(),
            block: self.block.take(),
            message,
            pass: self.pass.take(),
        });
    }
}

/// Append-only collection of events.
///
/// Statistics are derived from the recorded events rather than tracked separately. Events can
/// be appended concurrently through shared references (`&self`).
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        let log = Self::new();
        log.merge(self);
        log
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }

    /// Returns `true` if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts building a new event of the given kind.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Appends a copy of every event of `other`.
    pub fn merge(&self, other: &EventLog) {
        for (_, event) in &other.events {
            self.events.push(event.clone());
        }
    }

    /// Returns `true` if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.iter().any(|e| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.filter_kind(kind).count()
    }

    /// Returns an iterator over all events, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Returns an iterator over events of a specific kind.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.kind == kind)
    }

    /// Returns an iterator over the events recorded for `function`.
    pub fn filter_function<'a>(&'a self, function: &'a str) -> impl Iterator<Item = &'a Event> {
        self.iter()
            .filter(move |e| e.function.as_deref() == Some(function))
    }

    /// Returns an iterator over transformation events only.
    pub fn transformations(&self) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(|e| e.kind.is_transformation())
    }

    /// Returns an iterator over diagnostic events only.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(|e| e.kind.is_diagnostic())
    }

    /// Returns an iterator over warning events.
    pub fn warnings(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Warning)
    }

    /// Returns an iterator over error events.
    pub fn errors(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Error)
    }

    /// Counts events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for event in self {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the number of transformation events.
    #[must_use]
    pub fn transformation_count(&self) -> usize {
        self.transformations().count()
    }

    /// Returns the number of distinct functions that saw at least one transformation.
    #[must_use]
    pub fn functions_transformed(&self) -> usize {
        self.transformations()
            .filter_map(|e| e.function.as_deref())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Generates a human-readable summary of the transformations.
    ///
    /// Returns `"no events"` for an empty log and `"N events"` when nothing was transformed.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let mut parts: Vec<String> = self
            .count_by_kind()
            .iter()
            .filter(|(k, _)| k.is_transformation())
            .map(|(kind, count)| format!("{} {}", count, kind.description()))
            .collect();

        if parts.is_empty() {
            return format!("{} events", self.len());
        }

        parts.sort();
        parts.join(", ")
    }
}

/// Iterator over the events of an [`EventLog`].
pub struct EventLogIter<'a> {
    inner: boxcar::Iter<'a, Event>,
}

impl<'a> Iterator for EventLogIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, e)| e)
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = EventLogIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        EventLogIter {
            inner: self.events.iter(),
        }
    }
}

impl FromIterator<Event> for EventLog {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        let log = Self::new();
        for event in iter {
            log.events.push(event);
        }
        log
    }
}
