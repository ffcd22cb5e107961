//! Typst markup for the trade report template.
//!
//! All record text is emitted as Typst string literals, never as markup, so
//! values containing `#`, `*` or `[` render verbatim.
//!
//! The footer reads `counter(page).final()`. Typst keeps re-running layout
//! until the counters converge, so the total page count is resolved before
//! any page is written.

use std::fmt::Write;

use super::layout::{ReportContent, FEATURE_NAME_HEADER, FEATURE_VALUE_HEADER};

const DIVIDER_COLOR: &str = "#757575";

/// Stateless generator for report markup.
pub struct ReportTemplate;

impl ReportTemplate {
    pub fn to_typst(content: &ReportContent) -> String {
        let mut out = String::new();
        let divider = format!("line(length: 100%, stroke: 1pt + rgb(\"{DIVIDER_COLOR}\"))");

        let _ = writeln!(
            out,
            "#set document(title: {}, date: none)",
            quote(&content.title)
        );
        let _ = writeln!(
            out,
            r#"#set page(
  paper: "a4",
  margin: 2cm,
  footer: context {{
    {divider}
    align(center, text(size: 10pt)[Page #counter(page).get().first() of #counter(page).final().first()])
  }},
)"#
        );
        out.push_str("#set text(size: 12pt)\n\n");

        let _ = writeln!(
            out,
            "#text(size: 18pt, weight: \"bold\", underline({}))\n",
            quote(&content.title)
        );
        let _ = writeln!(out, "#pad(y: 10pt, {divider})\n");

        for line in &content.lines {
            let _ = writeln!(out, "#block(text(size: 12pt, {}))", quote(&line.text()));
        }

        let _ = writeln!(out, "\n#pad(y: 10pt, {divider})\n");

        if let Some(rows) = &content.features {
            out.push_str("#table(\n  columns: (1fr, 2fr),\n  stroke: none,\n");
            let _ = writeln!(
                out,
                "  text(weight: \"bold\", {}), text(weight: \"bold\", {}),",
                quote(FEATURE_NAME_HEADER),
                quote(FEATURE_VALUE_HEADER)
            );
            for row in rows {
                let _ = writeln!(out, "  {}, {},", quote(&row.name), quote(&row.value));
            }
            out.push_str(")\n");
        }

        out
    }
}

/// Escape special characters for Typst strings.
pub fn escape_typst_string(value: &str) -> String {
    value
        .replace('\\', r"\\")
        .replace('"', r#"\""#)
        .replace('\n', r"\n")
        .replace('\r', r"\r")
        .replace('\t', r"\t")
}

fn quote(value: &str) -> String {
    format!("\"{}\"", escape_typst_string(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{FeatureRow, Record};
    use serde_json::json;

    fn markup(value: serde_json::Value) -> String {
        let record = Record::from_value(value).unwrap();
        ReportTemplate::to_typst(&ReportContent::from_record(&record).unwrap())
    }

    #[test]
    fn test_escape_typst_string() {
        assert_eq!(
            escape_typst_string(r#"Hello "World""#),
            r#"Hello \"World\""#
        );
        assert_eq!(escape_typst_string("Line1\nLine2"), r"Line1\nLine2");
        assert_eq!(escape_typst_string(r"C:\temp"), r"C:\\temp");
    }

    #[test]
    fn test_example_markup() {
        let source = markup(json!({
            "Master_BOL_Number": "M1",
            "House_BOL_Number": "H1",
            "Source_Name": "Acme",
            "features_arr": [{ "n": "Weight", "v": "10kg" }]
        }));

        assert!(source.contains(r#"underline("M1 - H1")"#));
        assert!(source.contains(r#""Source Name: Acme""#));
        assert!(source.contains(r#""Feature Name""#));
        assert!(source.contains(r#""Weight", "10kg","#));
        assert!(source.contains("counter(page).final()"));
    }

    #[test]
    fn test_no_table_markup_without_features() {
        let source = markup(json!({ "Master_BOL_Number": "M1" }));
        assert!(!source.contains("#table("));
        assert!(!source.contains("Feature Name"));
    }

    #[test]
    fn test_absent_field_has_no_label() {
        let source = markup(json!({ "Source_Name": "Acme" }));
        assert!(source.contains("Source Name: Acme"));
        for label in [
            "Trade Update Date",
            "Run Date",
            "Original Supplier",
            "Original Customer",
            "Product Name",
        ] {
            assert!(!source.contains(label), "unexpected label {label}");
        }
    }

    #[test]
    fn test_markup_is_deterministic() {
        let content = ReportContent {
            title: "M1 - H1".to_string(),
            lines: Vec::new(),
            features: Some(vec![FeatureRow {
                name: "a".to_string(),
                value: "b".to_string(),
            }]),
        };
        assert_eq!(
            ReportTemplate::to_typst(&content),
            ReportTemplate::to_typst(&content)
        );
    }

    #[test]
    fn test_values_are_not_markup() {
        let source = markup(json!({ "ProductName": "#panic(\"x\") *bold*" }));
        assert!(source.contains(r#""Product Name: #panic(\"x\") *bold*""#));
    }
}
