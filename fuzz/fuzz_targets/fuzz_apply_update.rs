#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data)
        && let Ok(update) = nexusqb::utils::json::parse_json_document(s)
    {
        let mut d = bson::doc!{"_id": 1, "n": 1, "list": [1, 2, 3], "sub": {"k": "v"}};
        let before = d.clone();
        if nexusqb::store::apply_update(&mut d, &update).is_err() {
            assert_eq!(d, before);
        }
    }
});
