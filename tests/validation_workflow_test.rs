//! End-to-end workflow tests at the library level: real schemas and
//! documents on disk, the libxml2 engine, and a collecting sink instead of
//! stderr.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use xmlvalidator::{
    BatchValidator, CollectingSink, ColorMode, LibXml2Engine, RunOptions, Severity,
};

const ITEM_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="root">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="item" type="xs:string"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

const CONFLICTING_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="root" type="xs:int"/>
</xs:schema>"#;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn options(dir: &TempDir, schemas: &[&str], documents: &[&str]) -> RunOptions {
    let expand = |names: &[&str]| {
        names
            .iter()
            .map(|n| format!("{}/{}", dir.path().display(), n))
            .collect()
    };
    RunOptions {
        schema_patterns: expand(schemas),
        document_patterns: expand(documents),
        warn: false,
        color: ColorMode::Never,
    }
}

#[tokio::test]
async fn test_valid_documents_produce_zero_events() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "schema.xsd", ITEM_SCHEMA);
    write_file(&dir, "one.xml", "<root><item>a</item></root>");
    write_file(&dir, "two.xml", "<root><item>b</item></root>");

    let validator = BatchValidator::new(LibXml2Engine::new());
    let mut sink = CollectingSink::new();
    let totals = validator
        .run(&options(&dir, &["schema.xsd"], &["*.xml"]), &mut sink)
        .await
        .unwrap();

    assert_eq!(totals.documents_validated, 2);
    assert_eq!(totals.documents_valid, 2);
    assert!(totals.all_documents_valid());
    assert_eq!(sink.error_count(), 0);
}

#[tokio::test]
async fn test_missing_required_child_is_one_error_at_the_root_element() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "schema.xsd", ITEM_SCHEMA);
    write_file(&dir, "missing.xml", "<root></root>");

    let validator = BatchValidator::new(LibXml2Engine::new());
    let mut sink = CollectingSink::new();
    let totals = validator
        .run(&options(&dir, &["schema.xsd"], &["missing.xml"]), &mut sink)
        .await
        .unwrap();

    assert_eq!(totals.documents_invalid, 1);
    assert_eq!(sink.error_count(), 1);

    let error = sink.errors().next().unwrap();
    assert_eq!(error.severity, Severity::Error);
    assert_eq!(error.line, 1);
    assert!(error.source.contains("missing.xml"));
    assert!(error.message.contains("item"));
}

#[tokio::test]
async fn test_malformed_document_reports_well_formedness_only() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "schema.xsd", ITEM_SCHEMA);
    write_file(&dir, "broken.xml", "<root><item>x</item>");

    let validator = BatchValidator::new(LibXml2Engine::new());
    let mut sink = CollectingSink::new();
    let totals = validator
        .run(&options(&dir, &["schema.xsd"], &["broken.xml"]), &mut sink)
        .await
        .unwrap();

    assert_eq!(totals.documents_valid, 0);
    assert!(sink.error_count() >= 1);
    assert!(sink.errors().all(|e| e.source.contains("broken.xml")));
    assert!(sink.errors().all(|e| e.line >= 1));
}

#[tokio::test]
async fn test_conflicting_schemas_report_and_validation_continues() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "a-first.xsd", ITEM_SCHEMA);
    // Declares the same global element with an incompatible type.
    write_file(&dir, "b-second.xsd", CONFLICTING_SCHEMA);
    write_file(&dir, "doc.xml", "<root><item>x</item></root>");

    let validator = BatchValidator::new(LibXml2Engine::new());
    let mut sink = CollectingSink::new();
    let totals = validator
        .run(&options(&dir, &["*.xsd"], &["doc.xml"]), &mut sink)
        .await
        .unwrap();

    // Both schemas parse alone; composing them conflicts. The conflict is
    // reported and the document is still validated against the survivor.
    assert_eq!(totals.schemas_requested, 2);
    assert_eq!(totals.schemas_usable, 2);
    assert!(sink.error_count() >= 1);
    assert_eq!(totals.documents_validated, 1);
    assert_eq!(totals.documents_valid, 1);
}

#[tokio::test]
async fn test_error_events_are_identical_with_and_without_warnings() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "schema.xsd", ITEM_SCHEMA);
    write_file(&dir, "missing.xml", "<root></root>");

    let validator = BatchValidator::new(LibXml2Engine::new());

    let mut first = CollectingSink::new();
    let mut opts = options(&dir, &["schema.xsd"], &["missing.xml"]);
    validator.run(&opts, &mut first).await.unwrap();

    opts.warn = true;
    let mut second = CollectingSink::new();
    validator.run(&opts, &mut second).await.unwrap();

    // Warning gating is the reporter's business; the engine's error events
    // do not depend on it.
    let first_errors: Vec<_> = first.errors().collect();
    let second_errors: Vec<_> = second.errors().collect();
    assert_eq!(first_errors, second_errors);
}

#[tokio::test]
async fn test_run_with_no_schemas_checks_well_formedness_only() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "good.xml", "<anything><nested/></anything>");
    write_file(&dir, "bad.xml", "<anything>");

    let validator = BatchValidator::new(LibXml2Engine::new());
    let mut sink = CollectingSink::new();
    let totals = validator
        .run(&options(&dir, &[], &["good.xml", "bad.xml"]), &mut sink)
        .await
        .unwrap();

    assert_eq!(totals.documents_validated, 2);
    assert_eq!(totals.documents_invalid, 1);
    assert!(sink.errors().all(|e| e.source.contains("bad.xml")));
}
