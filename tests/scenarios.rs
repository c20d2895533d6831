//! End-to-end edit scenarios against files on disk.
//!
//! Each test writes a document into a temporary directory, runs one or more
//! requests through [`Editor::run`], and checks both the reported outcome and
//! the bytes left on disk.

#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use xmledit::codec::{TreeCodec, XmlCodec};
use xmledit::edit::{BlockCheck, EditOptions};
use xmledit::xpath::{parse, resolve};
use xmledit::{Document, EditError, EditRequest, Editor, ErrorKind, Operation, Outcome};

fn write_doc(dir: &TempDir, xml: &str) -> PathBuf {
    let path = dir.path().join("doc.xml");
    fs::write(&path, xml).unwrap();
    path
}

fn edit(path: &Path, xpath: &str, operation: Operation) -> Result<Outcome, EditError> {
    Editor::new().run(&EditRequest::new(path, xpath, operation))
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

fn load(path: &Path) -> Document {
    XmlCodec::default().load(&fs::read(path).unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_upsert_positional_element() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "<a><b/><b/></a>");

    let outcome = edit(&path, "//a/b[2]", Operation::Upsert("x".into())).unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.matched_count, 1);
    assert_eq!(read(&path), "<a>\n  <b/>\n  <b>x</b>\n</a>\n");
}

#[test]
fn test_upsert_attribute_already_set() {
    let dir = TempDir::new().unwrap();
    let source = "<a><b type=\"y\"/></a>";
    let path = write_doc(&dir, source);

    let outcome = edit(&path, "//a/b/@type", Operation::Upsert("y".into())).unwrap();
    assert!(!outcome.changed);
    assert_eq!(read(&path), source, "an unchanged document is not rewritten");
}

#[test]
fn test_upsert_creates_missing_child() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "<a/>");

    let outcome = edit(&path, "//a/c", Operation::Upsert("v".into())).unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.matched_count, 0);
    assert_eq!(read(&path), "<a>\n  <c>v</c>\n</a>\n");
}

#[test]
fn test_insert_raw_after_target() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "<a><b/></a>");

    let outcome = edit(&path, "//a/b", Operation::InsertRaw("<d/>".into())).unwrap();
    assert!(outcome.changed);
    assert_eq!(read(&path), "<a>\n  <b/>\n  <d/>\n</a>\n");

    let again = edit(&path, "//a/b", Operation::InsertRaw("<d/>".into())).unwrap();
    assert!(!again.changed);
}

#[test]
fn test_delete_then_not_found() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "<a><b/></a>");

    assert!(edit(&path, "//a/b", Operation::Delete).unwrap().changed);
    assert_eq!(read(&path), "<a/>\n");

    let err = edit(&path, "//a/b", Operation::Delete).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_delete_root_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "<a><b/></a>");

    let err = edit(&path, "//a", Operation::Delete).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert_eq!(read(&path), "<a><b/></a>");
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn test_upsert_is_idempotent() {
    let cases = [
        ("//a/b/@k", "v"),
        ("//a/b", "text"),
        ("//a/b[1]", "first"),
        ("c", ""),
    ];
    for (xpath, value) in cases {
        let dir = TempDir::new().unwrap();
        let path = write_doc(&dir, "<?xml version=\"1.0\"?>\n<a>\n  <b/>\n</a>\n");

        let first = edit(&path, xpath, Operation::Upsert(value.into())).unwrap();
        let after_first = read(&path);
        let second = edit(&path, xpath, Operation::Upsert(value.into())).unwrap();

        assert!(first.changed, "{xpath}: first run changes");
        assert!(!second.changed, "{xpath}: second run is a no-op");
        assert_eq!(read(&path), after_first, "{xpath}: bytes stable");
    }
}

#[test]
fn test_round_trip_stable_over_two_cycles() {
    let codec = XmlCodec::default();
    let source = "<?xml version='1.0' encoding='UTF-8'?>\n\
                  <!-- settings -->\n\
                  <config version='2'>\n\
                  \t<server host=\"example.org\"><port>80</port></server>\n\
                  \t<motd>Hello <b>there</b>, &amp; welcome</motd>\n\
                  <empty></empty>\n\
                  </config>";
    let once = codec.save(&codec.load(source.as_bytes()).unwrap()).unwrap();
    let twice = codec.save(&codec.load(&once).unwrap()).unwrap();
    let thrice = codec.save(&codec.load(&twice).unwrap()).unwrap();
    assert_eq!(once, twice);
    assert_eq!(twice, thrice);
}

#[test]
fn test_delete_then_resolve_is_empty() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "<a><b><c/></b><b/></a>");

    edit(&path, "//a/b[1]/c", Operation::Delete).unwrap();
    let doc = load(&path);
    assert!(resolve(&doc, &parse("//a/b[1]/c").unwrap()).is_empty());
}

#[test]
fn test_rename_preserves_children_and_text() {
    let mut doc = Document::parse_str("<a><b>head<c/><d/>tail</b></a>").unwrap();
    let b = resolve(&doc, &parse("//b").unwrap()).first().unwrap();
    let children_before: Vec<_> = doc.children(b).collect();
    let text_before = doc.element_text(b);

    let outcome = Editor::new()
        .apply_to_document(&mut doc, "//b", &Operation::Rename("x".into()))
        .unwrap();
    assert!(outcome.changed);

    let x = resolve(&doc, &parse("//x").unwrap()).first().unwrap();
    assert_eq!(x, b);
    assert_eq!(doc.children(x).collect::<Vec<_>>(), children_before);
    assert_eq!(doc.element_text(x), text_before);
}

#[test]
fn test_positions_unaffected_by_unrelated_edits() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "<a><b>1</b><b>2</b><b>3</b></a>");

    edit(&path, "//a/b[2]/@mark", Operation::Upsert("yes".into())).unwrap();
    edit(&path, "//a/note", Operation::Upsert("n".into())).unwrap();

    let doc = load(&path);
    let second = resolve(&doc, &parse("//a/b[2]").unwrap()).first().unwrap();
    assert_eq!(doc.element_text(second), "2");
    assert_eq!(doc.attribute(second, "mark"), Some("yes"));
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[test]
fn test_invalid_path_does_not_read_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.xml");
    let err = edit(&missing, "//a[", Operation::Delete).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPath);
}

#[test]
fn test_malformed_literal_detected_before_load() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.xml");
    let err = edit(&missing, "//a", Operation::InsertRaw("<d><e></d>".into())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedLiteral);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.xml");
    let err = edit(&missing, "//a", Operation::Delete).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoError);
    assert!(err.to_string().contains("missing.xml"));
}

#[test]
fn test_malformed_document_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "<a><b></a>");
    let err = edit(&path, "//a/b", Operation::Delete).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ParseError);
    assert_eq!(read(&path), "<a><b></a>");
}

#[test]
fn test_failed_edit_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let source = "<a>\n<b/>\n</a>";
    let path = write_doc(&dir, source);

    let err = edit(&path, "/a/x/y", Operation::Upsert("v".into())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AmbiguousTarget);
    assert_eq!(read(&path), source);
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[test]
fn test_check_mode_reports_without_writing() {
    let dir = TempDir::new().unwrap();
    let source = "<a><b/></a>";
    let path = write_doc(&dir, source);

    let editor = Editor::new().options(EditOptions::default().check_mode(true));
    let request = EditRequest::new(&path, "//a/b/@k", Operation::Upsert("v".into()));
    let outcome = editor.run(&request).unwrap();
    assert!(outcome.changed);
    assert_eq!(read(&path), source);
}

#[test]
fn test_structural_block_check_survives_reformatting() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "<a><b/></a>");
    let block = "<svc name=\"web\" port=\"80\"><on/></svc>";

    edit(&path, "//a/b", Operation::InsertRaw(block.into())).unwrap();

    let reordered = "<svc port='80' name='web'>\n  <on/>\n</svc>";
    let literal = edit(&path, "//a/b", Operation::InsertRaw(reordered.into())).unwrap();
    assert!(literal.changed, "literal check misses reordered attributes");

    let path = write_doc(&dir, "<a><b/></a>");
    edit(&path, "//a/b", Operation::InsertRaw(block.into())).unwrap();
    let editor =
        Editor::new().options(EditOptions::default().block_check(BlockCheck::Structural));
    let structural = editor
        .run(&EditRequest::new(
            &path,
            "//a/b",
            Operation::InsertRaw(reordered.into()),
        ))
        .unwrap();
    assert!(!structural.changed);
}

#[test]
fn test_declared_encoding_preserved() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("latin1.xml");
    fs::write(
        &path,
        b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<menu><item>cr\xE8me</item></menu>",
    )
    .unwrap();

    edit(&path, "//menu/item/@lang", Operation::Upsert("fr".into())).unwrap();
    let bytes = fs::read(&path).unwrap();
    assert!(bytes.windows(6).any(|w| w == b"cr\xE8me<"));
    assert!(std::str::from_utf8(&bytes).is_err(), "output stays Latin-1");
}

#[test]
fn test_unencodable_markup_fails_without_writing() {
    let dir = TempDir::new().unwrap();
    let source = "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a><b/></a>";
    let path = write_doc(&dir, source);

    let err = edit(&path, "//a/b", Operation::Rename("\u{4e2d}".into())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoError);
    assert_eq!(read(&path), source);

    let block = "<d><![CDATA[5 \u{4e2d}]]><!-- \u{4e2d} --></d>";
    let err = edit(&path, "//a/b", Operation::InsertRaw(block.into())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoError);
    assert_eq!(read(&path), source);
}

#[test]
fn test_unencodable_text_is_written_as_reference() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(
        &dir,
        "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a><b/></a>",
    );

    assert!(edit(&path, "//a/b[1]", Operation::Upsert("5 \u{4e2d}".into())).unwrap().changed);
    assert!(read(&path).contains("<b>5 &#20013;</b>"));
    assert!(!edit(&path, "//a/b[1]", Operation::Upsert("5 \u{4e2d}".into())).unwrap().changed);
}

#[test]
fn test_nested_block_needs_structural_check_after_save() {
    let dir = TempDir::new().unwrap();
    let block = "<d><e/></d>";

    let path = write_doc(&dir, "<a><b/></a>");
    edit(&path, "//a/b", Operation::InsertRaw(block.into())).unwrap();
    assert_eq!(read(&path), "<a>\n  <b/>\n  <d>\n    <e/>\n  </d>\n</a>\n");
    let literal = edit(&path, "//a/b", Operation::InsertRaw(block.into())).unwrap();
    assert!(literal.changed, "indented block no longer matches the literal");

    let path = write_doc(&dir, "<a><b/></a>");
    let editor =
        Editor::new().options(EditOptions::default().block_check(BlockCheck::Structural));
    let request = EditRequest::new(&path, "//a/b", Operation::InsertRaw(block.into()));
    assert!(editor.run(&request).unwrap().changed);
    assert!(!editor.run(&request).unwrap().changed);
}
