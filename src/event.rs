//! Validation events and the sink they are reported through.
//!
//! An event is one detected problem: a schema parse error, a composition
//! conflict, a well-formedness failure, or a schema violation. Events are
//! ephemeral; the engine constructs them and the sink consumes them
//! immediately.

/// Severity of a validation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Advisory finding; suppressed by default.
    Warning,
    /// Violation of well-formedness or schema constraints.
    Error,
}

/// One reported problem with source position context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationEvent {
    pub severity: Severity,
    /// Where the problem was found: a file path or a file-scheme URI.
    pub source: String,
    /// 1-based line number, 0 when the engine gave no position.
    pub line: u32,
    /// 1-based column number, 0 when the engine gave no position.
    pub column: u32,
    pub message: String,
}

impl ValidationEvent {
    pub fn error(
        source: impl Into<String>,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Error,
            source: source.into(),
            line,
            column,
            message: message.into(),
        }
    }

    pub fn warning(
        source: impl Into<String>,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            source: source.into(),
            line,
            column,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Channel the validation engine reports through.
///
/// The diagnostic reporter is the production implementation; tests use
/// [`CollectingSink`] to make assertions about the raw event stream.
pub trait EventSink {
    fn report(&mut self, event: ValidationEvent);
}

/// Sink that retains every event in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub events: Vec<ValidationEvent>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationEvent> {
        self.events.iter().filter(|e| e.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }
}

impl EventSink for CollectingSink {
    fn report(&mut self, event: ValidationEvent) {
        self.events.push(event);
    }
}
