//! Typst compilation.
//!
//! Writes the markup into a private temporary directory, invokes the `typst`
//! CLI there and reads the produced PDF back.

use std::fs;
use std::process::Command;
use tempfile::tempdir;

use super::ReportError;

const SOURCE_FILE: &str = "report.typ";
const OUTPUT_FILE: &str = "report.pdf";

/// Compiles report markup to PDF bytes.
pub trait PdfCompiler: Send + Sync {
    fn compile(&self, source: &str) -> Result<Vec<u8>, ReportError>;
}

/// Compiler backed by the Typst command-line tool.
#[derive(Debug, Clone)]
pub struct TypstCompiler {
    binary: String,
}

impl TypstCompiler {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for TypstCompiler {
    fn default() -> Self {
        Self::new("typst")
    }
}

impl PdfCompiler for TypstCompiler {
    fn compile(&self, source: &str) -> Result<Vec<u8>, ReportError> {
        let temp_dir = tempdir().map_err(ReportError::TempDir)?;
        let typ_path = temp_dir.path().join(SOURCE_FILE);
        let output_path = temp_dir.path().join(OUTPUT_FILE);

        fs::write(&typ_path, source).map_err(ReportError::WriteTypst)?;

        let output = Command::new(&self.binary)
            .arg("compile")
            .arg(&typ_path)
            .arg(&output_path)
            .current_dir(temp_dir.path())
            .output()
            .map_err(ReportError::TypstIo)?;

        if !output.status.success() {
            return Err(ReportError::TypstExit {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        fs::read(&output_path).map_err(ReportError::ReadPdf)
    }
}
