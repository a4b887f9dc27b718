#![no_main]
use libfuzzer_sys::fuzz_target;
use selectoxide::Document;

const PAGE: &str = r#"<div id="a" class="x y"><p lang="en">t</p><ul><li>1</li><li class="x">2</li></ul><input type="text" disabled></div>"#;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Selector parsing and matching should never panic on any input
        if let Ok(mut doc) = Document::parse_html(PAGE) {
            let _ = doc.select(s);
            if let Ok(context) = doc.select("ul") {
                let _ = doc.find(&context, s);
            }
        }
    }
});
