use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

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

const RECORD_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="record" type="xs:string"/>
</xs:schema>"#;

fn run_validator(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "--quiet", "--"])
        .args(args)
        .output()
        .expect("failed to execute xmlvalidator")
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path.display().to_string()
}

fn diagnostic_lines<'a>(stderr: &'a str, severity: &str) -> Vec<&'a str> {
    stderr
        .lines()
        .filter(|line| line.starts_with(severity))
        .collect()
}

fn pattern(dir: &TempDir, suffix: &str) -> String {
    format!("{}/{}", dir.path().display(), suffix)
}

#[test]
fn test_help_prints_usage_and_exits_zero() {
    let output = run_validator(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Validate XML files against XML schemas"));
    assert!(stdout.contains("--schema"));
    assert!(stdout.contains("--warn"));
    assert!(stdout.contains("xmlFiles may contain globs"));
}

#[test]
fn test_unknown_option_is_a_usage_error() {
    let output = run_validator(&["--bogus", "doc.xml"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("--bogus"));
}

#[test]
fn test_valid_document_produces_no_diagnostics() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "schema.xsd", ITEM_SCHEMA);
    let doc = write_file(&dir, "ok.xml", "<root><item>hello</item></root>");

    let output = run_validator(&["-s", &schema, &doc]);

    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(diagnostic_lines(&stderr, "Error:").is_empty());
    assert!(diagnostic_lines(&stderr, "Warning:").is_empty());
}

#[test]
fn test_schema_violation_is_reported_with_position() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "schema.xsd", ITEM_SCHEMA);
    let doc = write_file(&dir, "missing-item.xml", "<root></root>");

    let output = run_validator(&["-s", &schema, &doc]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    let errors = diagnostic_lines(&stderr, "Error:");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("missing-item.xml"));
    assert!(errors[0].contains("Line "));
    assert!(errors[0].contains("Column "));
}

#[test]
fn test_malformed_document_is_reported() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "schema.xsd", ITEM_SCHEMA);
    let doc = write_file(&dir, "malformed.xml", "<root><item>unclosed</root>");

    let output = run_validator(&["-s", &schema, &doc]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    let errors = diagnostic_lines(&stderr, "Error:");
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|line| line.contains("malformed.xml")));
}

#[test]
fn test_failing_document_does_not_stop_the_batch() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "schema.xsd", ITEM_SCHEMA);
    let bad = write_file(&dir, "a-bad.xml", "<root></root>");
    let good = write_file(&dir, "b-good.xml", "<root><item>x</item></root>");

    let output = run_validator(&["-s", &schema, &bad, &good]);

    // The bad document is reported, the good one still validates, and the
    // exit code reflects that errors occurred.
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    let errors = diagnostic_lines(&stderr, "Error:");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("a-bad.xml"));
}

#[test]
fn test_duplicate_matches_are_reported_twice() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "schema.xsd", ITEM_SCHEMA);
    let doc = write_file(&dir, "dup.xml", "<root></root>");

    let output = run_validator(&["-s", &schema, &doc, &doc]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert_eq!(diagnostic_lines(&stderr, "Error:").len(), 2);
}

#[test]
fn test_zero_match_pattern_contributes_nothing() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "schema.xsd", ITEM_SCHEMA);
    let doc = write_file(&dir, "ok.xml", "<root><item>x</item></root>");
    let no_match = pattern(&dir, "nothing/*.xml");

    let output = run_validator(&["-s", &schema, &no_match, &doc]);

    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_brace_glob_selects_documents() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "schema.xsd", ITEM_SCHEMA);
    write_file(&dir, "xml/a.xml", "<root><item>x</item></root>");
    write_file(&dir, "files/b.xml", "<root></root>");
    write_file(&dir, "other/c.xml", "<root></root>");

    let output = run_validator(&["-s", &schema, &pattern(&dir, "{xml,files}/*.xml")]);

    // Only files/b.xml fails; other/c.xml is outside the brace group.
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    let errors = diagnostic_lines(&stderr, "Error:");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("b.xml"));
}

#[test]
fn test_multiple_schemas_compose_into_one_set() {
    let dir = TempDir::new().unwrap();
    let first = write_file(&dir, "item.xsd", ITEM_SCHEMA);
    let second = write_file(&dir, "record.xsd", RECORD_SCHEMA);
    let item_doc = write_file(&dir, "item-doc.xml", "<root><item>x</item></root>");
    let record_doc = write_file(&dir, "record-doc.xml", "<record>y</record>");

    let output = run_validator(&["-s", &first, "-s", &second, &item_doc, &record_doc]);

    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(diagnostic_lines(&stderr, "Error:").is_empty());
}

#[test]
fn test_malformed_schema_is_reported_and_run_continues() {
    let dir = TempDir::new().unwrap();
    let broken = write_file(&dir, "broken.xsd", "<xs:schema><unclosed");
    let good = write_file(&dir, "good.xsd", ITEM_SCHEMA);
    let doc = write_file(&dir, "ok.xml", "<root><item>x</item></root>");

    let output = run_validator(&["-s", &broken, "-s", &good, &doc]);

    // The broken schema produces an error event (so exit 1), but the
    // document still validates against the surviving schema.
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    let errors = diagnostic_lines(&stderr, "Error:");
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|line| line.contains("broken.xsd")));
    assert!(errors.iter().all(|line| !line.contains("ok.xml")));
}
