#![no_main]
use libfuzzer_sys::fuzz_target;
use selectoxide::Document;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // HTML parser should never panic on any input
        if let Ok(mut doc) = Document::parse_html(s) {
            let _ = doc.select("*");
        }
    }
});
