use serde_json::{Map, Value as JsonValue};

/// One table row, column name to JSON value.
pub type Row = Map<String, JsonValue>;

/// Default identity column for realtime row matching
pub const DEFAULT_IDENTITY_KEY: &str = "id";

/// Identity value of a row, if the key column is present and non-null.
pub fn row_identity<'a>(row: &'a Row, key: &str) -> Option<&'a JsonValue> {
    row.get(key).filter(|v| !v.is_null())
}

/// Convert a JSON value into a row; non-objects yield `None`.
pub fn into_row(value: JsonValue) -> Option<Row> {
    match value {
        JsonValue::Object(map) => Some(map),
        _ => None,
    }
}
