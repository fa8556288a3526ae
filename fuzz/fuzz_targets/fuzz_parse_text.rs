#![no_main]

use libfuzzer_sys::fuzz_target;
use xgp::parse_text;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };

    // Parsing must never panic, and whatever parses must print back
    // to an equivalent program.
    if let Ok(node) = parse_text(source) {
        let reparsed = parse_text(&node.to_string()).expect("canonical form must parse");
        assert_eq!(reparsed.node_count(), node.node_count());
        assert_eq!(reparsed.height(), node.height());
    }
});
