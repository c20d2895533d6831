#![no_main]
use libfuzzer_sys::fuzz_target;
use xmledit::codec::{TreeCodec, XmlCodec};
use xmledit::edit::Operation;
use xmledit::Editor;

const PATHS: &[&str] = &["//a/b", "//a/b[2]", "//a/b/@k", "a/c", "/a", "//b[text()=\"t\"]"];

fuzz_target!(|data: &[u8]| {
    // First byte picks the path and operation, the rest is the document.
    let Some((&selector, bytes)) = data.split_first() else {
        return;
    };
    let codec = XmlCodec::default();
    let Ok(mut doc) = codec.load(bytes) else {
        return;
    };
    let path = PATHS[usize::from(selector) % PATHS.len()];
    let operation = match selector >> 6 {
        0 => Operation::Upsert("x".into()),
        1 => Operation::Delete,
        2 => Operation::InsertRaw("<d/>".into()),
        _ => Operation::Rename("r".into()),
    };
    // A successful edit must produce a document that loads again.
    if Editor::new().apply_to_document(&mut doc, path, &operation).is_ok() {
        if let Ok(saved) = codec.save(&doc) {
            assert!(codec.load(&saved).is_ok());
        }
    }
});
