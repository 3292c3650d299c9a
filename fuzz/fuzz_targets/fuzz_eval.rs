#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data)
        && let Ok(filter) = nexusqb::utils::json::parse_json_document(s)
    {
        // A few shapes to exercise literal, operator and path branches
        let docs = [
            bson::doc!{"a": 1, "b": 2, "name": "x"},
            bson::doc!{"a": 10, "b": -5, "name": "y", "nested": {"z": 3}, "tags": ["p", "q"]},
            bson::doc!{"active": true, "loc": [1.0, 2.0]}
        ];
        for d in &docs {
            let _ = nexusqb::store::matches(d, &filter);
        }
    }
});
