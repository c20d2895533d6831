#![no_main]
use libfuzzer_sys::fuzz_target;
use xmledit::tree::Document;
use xmledit::xpath::{parse, resolve};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing should never panic, and the canonical form must parse to the same expression.
        if let Ok(expr) = parse(input) {
            let canonical = expr.to_string();
            assert_eq!(parse(&canonical).ok(), Some(expr.clone()), "{canonical}");
            if let Ok(doc) = Document::parse_str("<a><b k=\"v\">t</b><b/><c><b>u</b></c></a>") {
                let _ = resolve(&doc, &expr);
            }
        }
    }
});
