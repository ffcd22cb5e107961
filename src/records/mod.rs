//! Trade records as they come out of the document store.
//!
//! A record is an ordered JSON object. The pipeline never mutates it; it only
//! looks fields up by name and tolerates their absence.

pub mod source;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use source::{JsonFileRecordSource, RecordSource, SourceError, StaticRecordSource};

pub const MASTER_BOL_FIELD: &str = "Master_BOL_Number";
pub const HOUSE_BOL_FIELD: &str = "House_BOL_Number";
pub const FEATURES_FIELD: &str = "features_arr";

/// Optional labeled lines of the report, in display order.
pub const LABELED_FIELDS: [(&str, &str); 6] = [
    ("Source_Name", "Source Name"),
    ("Trade_Update_Date", "Trade Update Date"),
    ("Run_Date", "Run Date"),
    ("OriginalSupplier", "Original Supplier"),
    ("OriginalCustomer", "Original Customer"),
    ("ProductName", "Product Name"),
];

/// One semi-structured trade record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Builds a record from a JSON value, returning `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Resolves a field by name. `null` counts as absent.
pub fn extract<'a>(record: &'a Record, field_name: &str) -> Option<&'a Value> {
    record.fields.get(field_name).filter(|value| !value.is_null())
}

/// Text form of a field value as it appears on a report.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Present field rendered as text.
pub fn extract_text(record: &Record, field_name: &str) -> Option<String> {
    extract(record, field_name).map(display_value)
}

/// One row of the feature table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRow {
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "v")]
    pub value: String,
}
