//! Runs the real Typst CLI. Needs `typst` on PATH (or `TYPST_BIN`).

mod common;

use std::sync::Arc;

use common::*;
use trade_report_server::report::{PdfCompiler, TypstCompiler};

fn typst() -> TypstCompiler {
    TypstCompiler::new(std::env::var("TYPST_BIN").unwrap_or_else(|_| "typst".to_string()))
}

#[tokio::test]
#[ignore = "requires the typst CLI"]
async fn test_typst_renders_real_pdfs() {
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline_with_compiler(
        vec![sample_record("M1", "H1"), sample_record("M2", "H2")],
        pipeline_config(root.path()),
        Arc::new(typst()),
    );

    let payload = pipeline.run().await.unwrap();

    assert_eq!(archive_entries(&payload.bytes), vec!["M1_H1.pdf", "M2_H2.pdf"]);
    assert_eq!(leftover_workspaces(root.path()), 0);
}

#[test]
#[ignore = "requires the typst CLI"]
fn test_typst_accepts_hostile_text() {
    let record = record(serde_json::json!({
        "Master_BOL_Number": "#panic(\"x\")",
        "House_BOL_Number": "*[]$\\",
        "Source_Name": "quote \" and newline \n end",
        "features_arr": [{ "n": "#set page(width: 1pt)", "v": "]" }]
    }));
    let content = trade_report_server::report::ReportContent::from_record(&record).unwrap();
    let source = trade_report_server::report::ReportTemplate::to_typst(&content);

    let pdf = typst().compile(&source).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}
