//! Schema set loading, composition, and document validation.
//!
//! The validation engine is abstracted behind [`SchemaEngine`] so the CLI
//! layer carries no validation logic of its own; [`LibXml2Engine`] is the
//! production implementation.
//!
//! libxml2 has no incremental schema-set API, so composition synthesizes an
//! in-memory driver schema that imports (target-namespaced members) or
//! includes (no-namespace members) every schema by absolute location, then
//! parses the driver as one grammar. Cross-schema conflicts such as
//! duplicate global declarations surface as parse diagnostics of that
//! driver, attributed by libxml2 to the offending member file.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[cfg(test)]
use mockall::automock;

use crate::event::{EventSink, ValidationEvent};
use crate::libxml2::{LibXml2Wrapper, ValidationVerdict, XmlSchemaPtr};

/// Source label for events about the composed set itself rather than any
/// one member schema.
const COMPOSED_SET_SOURCE: &str = "<schema-set>";

/// Cached regex for targetNamespace extraction from schema documents
static TARGET_NAMESPACE_REGEX: OnceLock<Regex> = OnceLock::new();

fn target_namespace_regex() -> &'static Regex {
    TARGET_NAMESPACE_REGEX.get_or_init(|| {
        Regex::new(r#"targetNamespace\s*=\s*["']([^"']*)["']"#)
            .expect("failed to compile targetNamespace regex")
    })
}

/// A compiled, composed schema set. Read-only once built; safe to share
/// across threads.
#[derive(Debug, Clone)]
pub struct CompiledSchemaSet {
    schema: XmlSchemaPtr,
    members: Vec<PathBuf>,
}

impl CompiledSchemaSet {
    pub fn schema(&self) -> &XmlSchemaPtr {
        &self.schema
    }

    /// The schema files that made it into the compiled set, in load order.
    pub fn members(&self) -> &[PathBuf] {
        &self.members
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Outcome of validating one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Well-formed and schema-valid
    Valid,
    /// Well-formed XML that violates the schema set, or not well-formed
    Invalid { error_count: i32 },
    /// The engine could not complete validation for this document
    Failed { message: String },
}

impl DocumentOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, DocumentOutcome::Valid)
    }
}

/// Capability interface over the external validation engine.
///
/// Any standards-compliant XML Schema library can sit behind this; every
/// operation reports its diagnostics through the sink and never panics or
/// unwinds into the caller.
#[cfg_attr(test, automock)]
pub trait SchemaEngine {
    /// Parse one schema file in isolation, reporting any diagnostics.
    /// Returns whether the schema is usable for composition.
    fn parse_schema(&self, path: &Path, sink: &mut dyn EventSink) -> bool;

    /// Compose the given schemas into one compiled set. Members that break
    /// the composition are reported and dropped; the rest stay usable. An
    /// empty member list yields an empty set that still checks
    /// well-formedness.
    fn compile_set(
        &self,
        paths: &[PathBuf],
        sink: &mut dyn EventSink,
    ) -> Option<CompiledSchemaSet>;

    /// Validate one document against the compiled set, reporting every
    /// event found across the whole document.
    fn validate_document<'a>(
        &self,
        path: &Path,
        set: Option<&'a CompiledSchemaSet>,
        sink: &mut dyn EventSink,
    ) -> DocumentOutcome;
}

/// libxml2-backed implementation of [`SchemaEngine`].
pub struct LibXml2Engine {
    wrapper: LibXml2Wrapper,
}

impl LibXml2Engine {
    pub fn new() -> Self {
        Self {
            wrapper: LibXml2Wrapper::new(),
        }
    }

    /// Sniff the targetNamespace attribute out of a schema document.
    /// Returns None for no-namespace schemas and unreadable files; the
    /// latter fail properly when libxml2 loads them.
    fn sniff_target_namespace(path: &Path) -> Option<String> {
        let content = std::fs::read(path).ok()?;
        let content = String::from_utf8_lossy(&content);
        target_namespace_regex()
            .captures(&content)
            .map(|caps| caps[1].to_string())
            .filter(|ns| !ns.is_empty())
    }

    /// Synthesize the driver schema document that pulls every member into
    /// one grammar.
    fn driver_document(members: &[PathBuf]) -> String {
        let mut doc = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\">\n",
        );

        for member in members {
            let location = xml_escape(&absolute_location(member));
            match Self::sniff_target_namespace(member) {
                Some(namespace) => {
                    doc.push_str(&format!(
                        "  <xs:import namespace=\"{}\" schemaLocation=\"{}\"/>\n",
                        xml_escape(&namespace),
                        location
                    ));
                }
                None => {
                    doc.push_str(&format!(
                        "  <xs:include schemaLocation=\"{}\"/>\n",
                        location
                    ));
                }
            }
        }

        doc.push_str("</xs:schema>\n");
        doc
    }

    /// Parse the driver for one candidate member list. Ok carries the
    /// compiled schema; Err carries the diagnostics explaining the failure.
    fn compose(
        &self,
        members: &[PathBuf],
    ) -> std::result::Result<XmlSchemaPtr, Vec<ValidationEvent>> {
        let driver = Self::driver_document(members);

        match self
            .wrapper
            .parse_schema_from_memory(driver.as_bytes(), COMPOSED_SET_SOURCE)
        {
            Ok(outcome) => match outcome.schema {
                Some(schema) => Ok(schema),
                None => {
                    let mut events = outcome.events;
                    if !events.iter().any(|e| e.is_error()) {
                        events.push(ValidationEvent::error(
                            COMPOSED_SET_SOURCE,
                            0,
                            0,
                            "schema set failed to compile",
                        ));
                    }
                    Err(events)
                }
            },
            Err(err) => Err(vec![ValidationEvent::error(
                COMPOSED_SET_SOURCE,
                0,
                0,
                err.to_string(),
            )]),
        }
    }
}

impl Default for LibXml2Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaEngine for LibXml2Engine {
    fn parse_schema(&self, path: &Path, sink: &mut dyn EventSink) -> bool {
        match self.wrapper.parse_schema_file(path) {
            Ok(outcome) => {
                let usable = outcome.schema.is_some();
                let mut events = outcome.events;
                if !usable && !events.iter().any(|e| e.is_error()) {
                    events.push(ValidationEvent::error(
                        path.display().to_string(),
                        0,
                        0,
                        "failed to parse schema",
                    ));
                }
                for event in events {
                    sink.report(event);
                }
                usable
            }
            Err(err) => {
                sink.report(ValidationEvent::error(
                    path.display().to_string(),
                    0,
                    0,
                    err.to_string(),
                ));
                false
            }
        }
    }

    fn compile_set(
        &self,
        paths: &[PathBuf],
        sink: &mut dyn EventSink,
    ) -> Option<CompiledSchemaSet> {
        // Grow the set one member at a time. A member whose addition breaks
        // the composition (conflicting global declarations, for instance)
        // is reported and dropped; the set keeps whatever was usable, so
        // documents may be validated against a partially populated set.
        let mut members: Vec<PathBuf> = Vec::new();
        let mut compiled: Option<XmlSchemaPtr> = None;

        for path in paths {
            let mut candidate = members.clone();
            candidate.push(path.clone());

            match self.compose(&candidate) {
                Ok(schema) => {
                    members = candidate;
                    compiled = Some(schema);
                }
                Err(events) => {
                    for event in events {
                        sink.report(event);
                    }
                }
            }
        }

        match compiled {
            Some(schema) => Some(CompiledSchemaSet { schema, members }),
            None => match self.compose(&[]) {
                // No usable member (or none given): the empty set still
                // drives well-formedness checking of documents.
                Ok(schema) => Some(CompiledSchemaSet {
                    schema,
                    members: Vec::new(),
                }),
                Err(events) => {
                    for event in events {
                        sink.report(event);
                    }
                    None
                }
            },
        }
    }

    fn validate_document(
        &self,
        path: &Path,
        set: Option<&CompiledSchemaSet>,
        sink: &mut dyn EventSink,
    ) -> DocumentOutcome {
        let Some(set) = set else {
            let message = "no usable schema set".to_string();
            sink.report(ValidationEvent::error(
                path.display().to_string(),
                0,
                0,
                message.clone(),
            ));
            return DocumentOutcome::Failed { message };
        };

        // With nothing in the set there is nothing to validate against;
        // the document is still parsed so malformed XML is reported.
        let result = if set.is_empty() {
            self.wrapper.check_well_formed(path)
        } else {
            self.wrapper.validate_file(set.schema(), path)
        };

        match result {
            Ok(outcome) => {
                let reported_an_error = outcome.events.iter().any(|e| e.is_error());
                for event in outcome.events {
                    sink.report(event);
                }

                match outcome.verdict {
                    ValidationVerdict::Valid => DocumentOutcome::Valid,
                    ValidationVerdict::Invalid { error_count } => {
                        if !reported_an_error {
                            sink.report(ValidationEvent::error(
                                path.display().to_string(),
                                0,
                                0,
                                "fails to validate",
                            ));
                        }
                        DocumentOutcome::Invalid { error_count }
                    }
                    ValidationVerdict::InternalError { code } => {
                        let message =
                            format!("validation generated an internal error (code {})", code);
                        if !reported_an_error {
                            sink.report(ValidationEvent::error(
                                path.display().to_string(),
                                0,
                                0,
                                message.clone(),
                            ));
                        }
                        DocumentOutcome::Failed { message }
                    }
                }
            }
            Err(err) => {
                let message = err.to_string();
                sink.report(ValidationEvent::error(
                    path.display().to_string(),
                    0,
                    0,
                    message.clone(),
                ));
                DocumentOutcome::Failed { message }
            }
        }
    }
}

/// Absolute, separator-normalized location for use in a schemaLocation
/// attribute. Relative members are resolved so the in-memory driver, which
/// has no base URI, can still find them.
fn absolute_location(path: &Path) -> String {
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    absolute.to_string_lossy().replace('\\', "/")
}

/// Minimal XML attribute-value escaping.
fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
