//! Report rendering - turns one trade record into one paginated PDF.
//!
//! - `naming` - deterministic file names and duplicate handling
//! - `layout` - the record's content, laid out per the fixed template
//! - `template` - Typst markup for a laid-out report
//! - `engine` - compiling markup to PDF bytes
//! - `renderer` - ties the above together for one record

pub mod engine;
pub mod layout;
pub mod naming;
pub mod renderer;
pub mod template;

pub use engine::{PdfCompiler, TypstCompiler};
pub use layout::{FieldLine, ReportContent};
pub use naming::{assign_names, resolve_name, DuplicateName};
pub use renderer::ReportRenderer;
pub use template::ReportTemplate;

use thiserror::Error;

/// Errors that can occur while rendering a single report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("malformed feature entry #{index}: {reason}")]
    MalformedFeature { index: usize, reason: String },
    #[error("failed to create temporary directory: {0}")]
    TempDir(#[source] std::io::Error),
    #[error("failed to write Typst source: {0}")]
    WriteTypst(#[source] std::io::Error),
    #[error("Typst CLI execution failed: {0}")]
    TypstIo(#[source] std::io::Error),
    #[error("Typst CLI exited with status {code}: {stderr}")]
    TypstExit { code: i32, stderr: String },
    #[error("failed to read generated PDF: {0}")]
    ReadPdf(#[source] std::io::Error),
    #[error("failed to write report file: {0}")]
    WritePdf(#[source] std::io::Error),
}
