#![no_main]

use libfuzzer_sys::fuzz_target;
use xgp::{Ensemble, parse_json};

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };

    // Neither parser may panic on arbitrary documents.
    let _ = Ensemble::from_json_str(source);
    if let Ok(doc) = serde_json::from_str::<serde_json::Value>(source)
        && let Ok(node) = parse_json(&doc)
    {
        let reparsed = parse_json(&node.to_json()).expect("emitted JSON must parse");
        assert_eq!(reparsed.node_count(), node.node_count());
    }
});
