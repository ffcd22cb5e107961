use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::engine::{PdfCompiler, TypstCompiler};
use super::layout::ReportContent;
use super::template::ReportTemplate;
use super::ReportError;
use crate::records::Record;

/// Renders one record into one PDF file.
#[derive(Clone)]
pub struct ReportRenderer {
    compiler: Arc<dyn PdfCompiler>,
}

impl ReportRenderer {
    pub fn new(compiler: Arc<dyn PdfCompiler>) -> Self {
        Self { compiler }
    }

    pub fn typst(binary: impl Into<String>) -> Self {
        Self::new(Arc::new(TypstCompiler::new(binary)))
    }

    /// Lays the record out, compiles it and writes the PDF to `path`.
    ///
    /// Nothing is written when layout or compilation fails.
    pub fn render(&self, record: &Record, path: &Path) -> Result<(), ReportError> {
        let content = ReportContent::from_record(record)?;
        let source = ReportTemplate::to_typst(&content);
        let pdf = self.compiler.compile(&source)?;
        fs::write(path, pdf).map_err(ReportError::WritePdf)
    }
}
