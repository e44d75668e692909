//! Sequential batch driver.
//!
//! One run is a straight line: expand schema patterns, check each schema,
//! compile the set, expand document patterns, validate each document. Every
//! failure is confined to its own unit of work (one schema, one document)
//! and converted into events; nothing stops the batch.

use std::path::PathBuf;

use crate::cli::RunOptions;
use crate::error::Result;
use crate::event::EventSink;
use crate::file_discovery;
use crate::schema_loader::{DocumentOutcome, SchemaEngine};

/// Per-run totals, for the exit-code decision and for callers embedding the
/// library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTotals {
    /// Schema files the patterns expanded to
    pub schemas_requested: usize,
    /// Schemas that parsed and were offered to the set
    pub schemas_usable: usize,
    /// Documents the patterns expanded to (duplicates counted twice)
    pub documents_validated: usize,
    pub documents_valid: usize,
    pub documents_invalid: usize,
    /// Documents the engine could not finish (unreadable, internal error)
    pub documents_failed: usize,
}

impl RunTotals {
    pub fn all_documents_valid(&self) -> bool {
        self.documents_valid == self.documents_validated
    }
}

/// Drives one validation run over a [`SchemaEngine`].
pub struct BatchValidator<E> {
    engine: E,
}

impl<E: SchemaEngine> BatchValidator<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Run the whole batch. Only startup-class problems (an invalid glob
    /// pattern) return an error; validation problems are reported through
    /// the sink and reflected in the totals.
    pub async fn run(&self, options: &RunOptions, sink: &mut dyn EventSink) -> Result<RunTotals> {
        let mut totals = RunTotals::default();

        let schema_paths = file_discovery::expand_patterns(&options.schema_patterns).await?;
        totals.schemas_requested = schema_paths.len();

        let mut usable: Vec<PathBuf> = Vec::new();
        for path in &schema_paths {
            if self.engine.parse_schema(path, sink) {
                usable.push(path.clone());
            }
        }
        totals.schemas_usable = usable.len();

        let set = self.engine.compile_set(&usable, sink);

        for pattern in &options.document_patterns {
            for path in file_discovery::expand_pattern(pattern).await? {
                totals.documents_validated += 1;
                match self.engine.validate_document(&path, set.as_ref(), sink) {
                    DocumentOutcome::Valid => totals.documents_valid += 1,
                    DocumentOutcome::Invalid { .. } => totals.documents_invalid += 1,
                    DocumentOutcome::Failed { .. } => totals.documents_failed += 1,
                }
            }
        }

        Ok(totals)
    }
}
