//! File-level conversion tests: inputs on disk, documents and attachment
//! folders written next to them.

use std::path::PathBuf;

use assert_fs::prelude::*;
use predicates::prelude::*;

use emldoc::assembly::header::HeaderTemplate;
use emldoc::config::{Backend, Config};
use emldoc::convert::{convert_batch, convert_file, existing_outputs, Converter};
use emldoc::error::ConvertError;
use emldoc::render::HtmlRenderer;

const PLAIN: &str = "From: a@example.com\r\n\
To: b@example.com\r\n\
Subject: Plain\r\n\
\r\n\
Hello there\r\n";

const WITH_ATTACHMENT: &str = "From: a@example.com\r\n\
Subject: Report\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"M\"\r\n\
\r\n\
--M\r\n\
Content-Type: text/html\r\n\
\r\n\
<div id=\"x\">See attached</div>\r\n\
--M\r\n\
Content-Type: text/plain; name=\"notes.txt\"\r\n\
Content-Disposition: attachment; filename=\"notes.txt\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
aGVsbG8=\r\n\
--M--\r\n";

fn converter() -> Converter {
    Converter::new(
        HeaderTemplate::bundled().unwrap(),
        Box::new(HtmlRenderer::new("body { margin: 0 }".into())),
    )
}

#[test]
fn test_convert_plain_message() {
    let dir = assert_fs::TempDir::new().unwrap();
    let input = dir.child("plain.eml");
    input.write_str(PLAIN).unwrap();

    let output = convert_file(input.path(), &converter()).unwrap();

    assert_eq!(output, dir.path().join("plain.html"));
    dir.child("plain.html")
        .assert(predicate::str::contains("<style>"))
        .assert(predicate::str::contains("<pre>Hello there"))
        .assert(predicate::str::contains("Plain"));
    dir.child("plain_attachments").assert(predicate::path::missing());
}

#[test]
fn test_convert_writes_attachments() {
    let dir = assert_fs::TempDir::new().unwrap();
    let input = dir.child("report.eml");
    input.write_str(WITH_ATTACHMENT).unwrap();

    convert_file(input.path(), &converter()).unwrap();

    dir.child("report.html")
        .assert(predicate::str::contains("notes.txt"))
        .assert(predicate::str::contains(r#"id="x""#).not());
    dir.child("report_attachments/notes.txt").assert("hello");
}

#[test]
fn test_convert_into_output_dir() {
    let dir = assert_fs::TempDir::new().unwrap();
    let input = dir.child("in/plain.eml");
    input.write_str(PLAIN).unwrap();
    let out_dir = dir.child("out");

    let conv = converter().with_output_dir(Some(out_dir.path().to_path_buf()));
    let output = convert_file(input.path(), &conv).unwrap();

    assert_eq!(output, out_dir.path().join("plain.html"));
    out_dir.child("plain.html").assert(predicate::path::exists());
}

#[test]
fn test_missing_file_error() {
    let dir = assert_fs::TempDir::new().unwrap();
    let err = convert_file(&dir.path().join("nope.eml"), &converter()).unwrap_err();
    assert!(matches!(err, ConvertError::FileNotFound(_)));
}

#[test]
fn test_debug_dumps_written() {
    let dir = assert_fs::TempDir::new().unwrap();
    let input = dir.child("plain.eml");
    input.write_str(PLAIN).unwrap();
    let dumps = dir.child("debug");

    let conv = converter().with_debug_dir(Some(dumps.path().to_path_buf()));
    convert_file(input.path(), &conv).unwrap();

    dumps
        .child("email.json")
        .assert(predicate::str::contains("\"subject\": \"Plain\""));
    dumps
        .child("document.html")
        .assert(predicate::str::contains("<pre>Hello there"));
}

#[test]
fn test_batch_continues_after_failure() {
    let dir = assert_fs::TempDir::new().unwrap();
    let good = dir.child("good.eml");
    good.write_str(PLAIN).unwrap();
    let multipart = dir.child("multipart.eml");
    multipart.write_str(
        "From: a@example.com\r\n\
Content-Type: multipart/mixed; boundary=\"M\"\r\n\
\r\n\
--M\r\n\
Content-Type: text/plain\r\n\
\r\n\
body\r\n\
--M--\r\n",
    )
    .unwrap();
    let other = dir.child("notes.txt");
    other.write_str("not a message").unwrap();

    // Rendering into a directory that is a plain file fails for every input.
    let blocker = dir.child("blocked");
    blocker.write_str("").unwrap();
    let failing = converter().with_output_dir(Some(blocker.path().to_path_buf()));
    let paths: Vec<PathBuf> = vec![
        good.path().to_path_buf(),
        dir.path().join("missing.eml"),
        other.path().to_path_buf(),
    ];
    let report = convert_batch(&paths, &failing, None);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, good.path());
    assert_eq!(report.missing, vec![dir.path().join("missing.eml")]);
    assert_eq!(report.skipped, vec![other.path().to_path_buf()]);
    assert!(!report.is_success());

    let paths = vec![good.path().to_path_buf(), multipart.path().to_path_buf()];
    let report = convert_batch(&paths, &converter(), None);
    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.converted.len(), 2);
}

#[test]
fn test_batch_progress_reaches_total() {
    let dir = assert_fs::TempDir::new().unwrap();
    let input = dir.child("plain.eml");
    input.write_str(PLAIN).unwrap();

    let calls = std::cell::RefCell::new(Vec::new());
    convert_batch(
        &[input.path().to_path_buf()],
        &converter(),
        Some(&|current: usize, total: usize| calls.borrow_mut().push((current, total))),
    );
    assert_eq!(calls.into_inner(), vec![(0, 1), (1, 1)]);
}

#[test]
fn test_existing_outputs_detected() {
    let dir = assert_fs::TempDir::new().unwrap();
    let input = dir.child("plain.eml");
    input.write_str(PLAIN).unwrap();
    let paths = vec![input.path().to_path_buf()];
    let conv = converter();

    assert!(existing_outputs(&paths, &conv).is_empty());
    convert_file(input.path(), &conv).unwrap();
    assert_eq!(existing_outputs(&paths, &conv), vec![dir.path().join("plain.html")]);
}

#[test]
fn test_converter_from_config() {
    let dir = assert_fs::TempDir::new().unwrap();
    let template = dir.child("header.html");
    template
        .write_str(
            "<p>{{from}}|{{subject}}|{{date}}|{{to}}|{{cc_display}}|{{cc}}|\
{{bcc_display}}|{{bcc}}|{{attachments_display}}|{{attachments}}</p>",
        )
        .unwrap();
    let input = dir.child("plain.eml");
    input.write_str(PLAIN).unwrap();

    let mut config = Config::default();
    config.render.backend = Backend::Html;
    config.render.header_template = Some(template.path().to_path_buf());
    let conv = Converter::from_config(&config).unwrap();
    convert_file(input.path(), &conv).unwrap();

    dir.child("plain.html").assert(predicate::str::contains(
        "<p>a@example.com|Plain|Unknown|b@example.com|none||none||none|</p>",
    ));
}

#[test]
fn test_template_missing_field_rejected() {
    let dir = assert_fs::TempDir::new().unwrap();
    let template = dir.child("header.html");
    template.write_str("<p>{{from}}</p>").unwrap();

    let mut config = Config::default();
    config.render.header_template = Some(template.path().to_path_buf());
    assert!(matches!(
        Converter::from_config(&config),
        Err(ConvertError::Template(_))
    ));
}
