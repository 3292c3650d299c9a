use crate::errors::QbError;

/// Convert a `serde_json::Value` that must be an object into a `bson::Document`.
pub fn json_value_to_document(val: &serde_json::Value) -> Result<bson::Document, QbError> {
    let obj = val.as_object().ok_or_else(|| QbError::config("expected JSON object"))?;
    bson::Document::try_from(obj.clone()).map_err(|e| QbError::config(e.to_string()))
}

/// Parse a JSON string into a `bson::Document`. The JSON must be a top-level object.
///
/// Handy for feeding filter or command documents captured from logs back into a builder.
pub fn parse_json_document(json: &str) -> Result<bson::Document, QbError> {
    let val: serde_json::Value = serde_json::from_str(json)?;
    json_value_to_document(&val)
}
