//! Diagnostic reporting to stderr.
//!
//! One line per validation event:
//!
//! `Error: <file path>: Line <line>, Column <column>: <message>`
//!
//! Errors render red and warnings yellow when coloring is active. Every
//! colored write carries its own ANSI reset, so color state cannot leak
//! into later output whatever happens between writes.

use std::io::Write;

use crate::cli::ColorMode;
use crate::event::{EventSink, Severity, ValidationEvent};

/// Formats validation events and writes them to stderr, tallying counts
/// for the exit-code decision.
pub struct DiagnosticReporter {
    show_warnings: bool,
    show_colors: bool,
    errors: usize,
    warnings: usize,
}

impl DiagnosticReporter {
    pub fn new(color: ColorMode, show_warnings: bool) -> Self {
        let show_colors = match color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => atty::is(atty::Stream::Stderr),
        };

        Self {
            show_warnings,
            show_colors,
            errors: 0,
            warnings: 0,
        }
    }

    /// Error-severity events written so far.
    pub fn error_count(&self) -> usize {
        self.errors
    }

    /// Warning events written so far (always 0 when warnings are off).
    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_event(&self, event: &ValidationEvent) -> String {
        let severity_word = match event.severity {
            Severity::Warning => "Warning",
            _ => "Error",
        };

        let line = format!(
            "{}: {}: Line {}, Column {}: {}",
            severity_word,
            local_display_path(&event.source),
            event.line,
            event.column,
            event.message
        );

        match event.severity {
            Severity::Warning => self.colorize(&line, "33"),
            _ => self.colorize(&line, "31"),
        }
    }

    /// Decide whether the event is written, updating the tallies. Returns
    /// the formatted line when it should be printed.
    fn handle(&mut self, event: ValidationEvent) -> Option<String> {
        match event.severity {
            Severity::Warning if !self.show_warnings => return None,
            Severity::Warning => self.warnings += 1,
            Severity::Error => self.errors += 1,
        }

        Some(self.format_event(&event))
    }
}

impl EventSink for DiagnosticReporter {
    fn report(&mut self, event: ValidationEvent) {
        if let Some(line) = self.handle(event) {
            // A write failure (closed stderr) must not unwind into the
            // batch loop.
            let _ = writeln!(std::io::stderr(), "{}", line);
        }
    }
}

/// Convert an event source, possibly a file-scheme URI, into a local path
/// for display.
fn local_display_path(source: &str) -> String {
    let stripped = source
        .strip_prefix("file://")
        .map(|rest| rest.strip_prefix("localhost").unwrap_or(rest))
        .unwrap_or(source);
    percent_decode(stripped)
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}
