//! Response records returned by the Moodstocks API.
//!
//! # Design
//! Operations return the decoded JSON object as-is (`Record`); the client
//! never renames fields or coerces types. The structs below are optional
//! typed views over the documented response shapes, converted on demand
//! with `from_record`. New fields added by the service are ignored by the
//! views but always present in the raw record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// A decoded JSON response object.
pub type Record = Map<String, Value>;

/// Decode a raw record into one of the typed views.
pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

/// Response to `add_image`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddedImage {
    pub id: String,
    pub is_update: bool,
}

/// Response to `remove_image`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemovedImage {
    pub id: String,
    pub existed: bool,
}

/// Response to `make_image_offline` and `remove_image_offline`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OfflineChange {
    pub id: String,
    pub was_offline: bool,
}

/// Response to `image_info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageInfo {
    pub id: String,
    pub is_offline: bool,
}

/// Response to `list_images`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageList {
    pub count: u64,
    #[serde(default)]
    pub ids: Vec<String>,
}

/// Response to `search_image`. `id` is only present on a match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Response to `echo`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EchoResult {
    pub http_verb: String,
    #[serde(default)]
    pub results: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn search_miss_has_no_id() {
        let result: SearchResult = from_record(record(json!({"found": false}))).unwrap();
        assert!(!result.found);
        assert!(result.id.is_none());
    }

    #[test]
    fn views_ignore_unknown_fields() {
        let info: ImageInfo =
            from_record(record(json!({"id": "a", "is_offline": true, "extra": 1}))).unwrap();
        assert_eq!(
            info,
            ImageInfo {
                id: "a".to_string(),
                is_offline: true
            }
        );
    }

    #[test]
    fn mismatched_shape_is_decode_error() {
        let err = from_record::<ImageList>(record(json!({"count": "three"}))).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn echo_keeps_results_opaque() {
        let echo: EchoResult =
            from_record(record(json!({"http_verb": "GET", "results": {"foo": "bar"}}))).unwrap();
        assert_eq!(echo.http_verb, "GET");
        assert_eq!(echo.results["foo"], "bar");
    }
}
