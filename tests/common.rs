#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use trade_report_server::config::PipelineConfig;
use trade_report_server::pipeline::ReportPipeline;
use trade_report_server::records::{Record, RecordSource, SourceError, StaticRecordSource};
use trade_report_server::report::{PdfCompiler, ReportError, ReportRenderer};
use trade_report_server::workspace::WORKSPACE_DIR;

pub const FAKE_PDF_HEADER: &str = "%PDF-fake\n";

/// Stands in for Typst: the "PDF" is a header followed by the markup.
pub struct FakePdfCompiler {
    pub calls: AtomicUsize,
}

impl FakePdfCompiler {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl PdfCompiler for FakePdfCompiler {
    fn compile(&self, source: &str) -> Result<Vec<u8>, ReportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{FAKE_PDF_HEADER}{source}").into_bytes())
    }
}

/// Fails for any markup containing `marker`.
pub struct FailingCompiler {
    pub marker: String,
}

impl PdfCompiler for FailingCompiler {
    fn compile(&self, source: &str) -> Result<Vec<u8>, ReportError> {
        if source.contains(&self.marker) {
            return Err(ReportError::TypstExit {
                code: 1,
                stderr: format!("refusing to compile {}", self.marker),
            });
        }
        Ok(format!("{FAKE_PDF_HEADER}{source}").into_bytes())
    }
}

/// Record source that is always down.
pub struct UnreachableSource;

#[async_trait]
impl RecordSource for UnreachableSource {
    async fn fetch_all(&self) -> Result<Vec<Record>, SourceError> {
        Err(SourceError::Query(sqlx::Error::PoolTimedOut))
    }
}

pub fn record(value: Value) -> Record {
    Record::from_value(value).expect("test record must be an object")
}

pub fn sample_record(master: &str, house: &str) -> Record {
    record(json!({
        "Master_BOL_Number": master,
        "House_BOL_Number": house,
        "Source_Name": "Acme",
        "Run_Date": "2024-05-01",
        "features_arr": [
            { "n": "Weight", "v": "10kg" },
            { "n": "Origin", "v": "CN" }
        ]
    }))
}

pub fn pipeline_config(root: &Path) -> PipelineConfig {
    PipelineConfig {
        output_root: root.to_path_buf(),
        render_concurrency: 4,
        ..PipelineConfig::default()
    }
}

pub fn fake_pipeline(records: Vec<Record>, config: PipelineConfig) -> ReportPipeline {
    pipeline_with_compiler(records, config, Arc::new(FakePdfCompiler::new()))
}

pub fn pipeline_with_compiler(
    records: Vec<Record>,
    config: PipelineConfig,
    compiler: Arc<dyn PdfCompiler>,
) -> ReportPipeline {
    ReportPipeline::new(
        Arc::new(StaticRecordSource::new(records)),
        ReportRenderer::new(compiler),
        config,
    )
}

/// Run directories left behind under the output root.
pub fn leftover_workspaces(root: &Path) -> usize {
    match std::fs::read_dir(root.join(WORKSPACE_DIR)) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

pub fn archive_entries(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

pub fn archive_entry_text(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
    let mut content = String::new();
    archive
        .by_name(name)
        .expect("entry present")
        .read_to_string(&mut content)
        .expect("utf-8 entry");
    content
}
