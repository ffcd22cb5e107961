//! Content of one report, laid out per the fixed template.
//!
//! Building the layout is pure; everything that can be wrong with a record is
//! detected here, before any file is touched.

use serde_json::Value;

use super::naming::identifiers;
use super::ReportError;
use crate::records::{display_value, extract, FeatureRow, Record, FEATURES_FIELD, LABELED_FIELDS};

pub const FEATURE_NAME_HEADER: &str = "Feature Name";
pub const FEATURE_VALUE_HEADER: &str = "Feature Value";

/// One `"{label}: {value}"` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLine {
    pub label: &'static str,
    pub value: String,
}

impl FieldLine {
    pub fn text(&self) -> String {
        format!("{}: {}", self.label, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContent {
    pub title: String,
    /// Only fields present on the record, in template order.
    pub lines: Vec<FieldLine>,
    /// `None` when the record has no non-empty feature array.
    pub features: Option<Vec<FeatureRow>>,
}

impl ReportContent {
    pub fn from_record(record: &Record) -> Result<Self, ReportError> {
        let (primary, secondary) = identifiers(record);

        let lines = LABELED_FIELDS
            .iter()
            .filter_map(|&(field, label)| {
                extract(record, field).map(|value| FieldLine {
                    label,
                    value: display_value(value),
                })
            })
            .collect();

        let features = match extract(record, FEATURES_FIELD) {
            Some(Value::Array(items)) if !items.is_empty() => Some(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| parse_feature(index, item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            _ => None,
        };

        Ok(Self {
            title: format!("{primary} - {secondary}"),
            lines,
            features,
        })
    }

    /// Table rows including the header, or 0 when there is no table.
    pub fn table_row_count(&self) -> usize {
        self.features.as_ref().map_or(0, |rows| rows.len() + 1)
    }
}

fn parse_feature(index: usize, item: &Value) -> Result<FeatureRow, ReportError> {
    let entry = item.as_object().ok_or_else(|| ReportError::MalformedFeature {
        index,
        reason: "entry is not an object".to_string(),
    })?;
    let text = |key: &str| -> Result<String, ReportError> {
        match entry.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(ReportError::MalformedFeature {
                index,
                reason: format!("'{key}' is not a string: {other}"),
            }),
            None => Err(ReportError::MalformedFeature {
                index,
                reason: format!("missing '{key}'"),
            }),
        }
    };
    Ok(FeatureRow {
        name: text("n")?,
        value: text("v")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content(value: Value) -> Result<ReportContent, ReportError> {
        ReportContent::from_record(&Record::from_value(value).unwrap())
    }

    #[test]
    fn test_example_record() {
        let c = content(json!({
            "Master_BOL_Number": "M1",
            "House_BOL_Number": "H1",
            "Source_Name": "Acme",
            "features_arr": [{ "n": "Weight", "v": "10kg" }]
        }))
        .unwrap();

        assert_eq!(c.title, "M1 - H1");
        assert_eq!(c.lines.len(), 1);
        assert_eq!(c.lines[0].text(), "Source Name: Acme");
        assert_eq!(
            c.features,
            Some(vec![FeatureRow {
                name: "Weight".to_string(),
                value: "10kg".to_string()
            }])
        );
        assert_eq!(c.table_row_count(), 2);
    }

    #[test]
    fn test_lines_follow_template_order() {
        let c = content(json!({
            "ProductName": "Steel",
            "Run_Date": "2024-05-01",
            "Source_Name": "Acme",
        }))
        .unwrap();
        let labels: Vec<&str> = c.lines.iter().map(|l| l.label).collect();
        assert_eq!(labels, vec!["Source Name", "Run Date", "Product Name"]);
        assert_eq!(c.title, "Unknown - Unknown");
    }

    #[test]
    fn test_absent_fields_have_no_lines() {
        let c = content(json!({ "Master_BOL_Number": "M1", "OriginalSupplier": null })).unwrap();
        assert!(c.lines.is_empty());
    }

    #[test]
    fn test_no_table_without_features() {
        for record in [
            json!({}),
            json!({ "features_arr": [] }),
            json!({ "features_arr": "not an array" }),
        ] {
            let c = content(record).unwrap();
            assert_eq!(c.features, None);
            assert_eq!(c.table_row_count(), 0);
        }
    }

    #[test]
    fn test_feature_rows_keep_order() {
        let c = content(json!({
            "features_arr": [
                { "n": "Weight", "v": "10kg" },
                { "n": "Origin", "v": "CN" },
                { "n": "HS Code", "v": "7208" }
            ]
        }))
        .unwrap();
        let names: Vec<&str> = c
            .features
            .as_ref()
            .unwrap()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["Weight", "Origin", "HS Code"]);
        assert_eq!(c.table_row_count(), 4);
    }

    #[test]
    fn test_malformed_feature() {
        let err = content(json!({
            "features_arr": [{ "n": "Weight", "v": "10kg" }, { "n": "Origin" }]
        }))
        .unwrap_err();
        assert!(matches!(err, ReportError::MalformedFeature { index: 1, .. }));

        let err = content(json!({ "features_arr": [42] })).unwrap_err();
        assert!(matches!(err, ReportError::MalformedFeature { index: 0, .. }));

        let err = content(json!({ "features_arr": [{ "n": 1, "v": "x" }] })).unwrap_err();
        assert!(matches!(err, ReportError::MalformedFeature { index: 0, .. }));
    }
}
