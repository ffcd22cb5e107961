//! Packaging rendered reports into a single ZIP archive.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::report::naming::REPORT_EXTENSION;

pub const ARCHIVE_NAME: &str = "AllDocuments.zip";
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to list reports in {path}: {source}")]
    ListReports {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write archive {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to add {name} to archive: {source}")]
    Entry {
        name: String,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("failed to finish archive: {0}")]
    Finish(#[source] zip::result::ZipError),
    #[error("failed to read archive {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Report files directly under `dir`, sorted by file name.
pub fn report_files(dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let list_err = |source| ArchiveError::ListReports {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        let path = entry.path();
        let is_report = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext == REPORT_EXTENSION);
        if is_report && entry.file_type().map_err(list_err)?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Packs a workspace's reports into one archive file and returns its path.
pub trait ArchiveWriter: Send + Sync {
    fn pack(&self, workspace_dir: &Path) -> Result<PathBuf, ArchiveError>;
}

/// Deflated ZIP written next to the reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveWriter;

impl ArchiveWriter for ZipArchiveWriter {
    fn pack(&self, workspace_dir: &Path) -> Result<PathBuf, ArchiveError> {
        pack(workspace_dir)
    }
}

/// Writes every report in `workspace_dir` into `workspace_dir/AllDocuments.zip`.
///
/// The archive is finished and synced to disk before this returns.
pub fn pack(workspace_dir: &Path) -> Result<PathBuf, ArchiveError> {
    let files = report_files(workspace_dir)?;
    let archive_path = workspace_dir.join(ARCHIVE_NAME);
    let write_err = |source| ArchiveError::Write {
        path: archive_path.clone(),
        source,
    };

    let file = File::create(&archive_path).map_err(write_err)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        zip.start_file(name.as_str(), options)
            .map_err(|source| ArchiveError::Entry {
                name: name.clone(),
                source,
            })?;
        let mut report = File::open(path).map_err(write_err)?;
        io::copy(&mut report, &mut zip).map_err(write_err)?;
    }

    let file = zip.finish().map_err(ArchiveError::Finish)?;
    file.sync_all().map_err(write_err)?;

    log::info!(
        "Packed {} reports into {}",
        files.len(),
        archive_path.display()
    );
    Ok(archive_path)
}

/// Reads the finished archive fully into memory.
pub async fn deliver(archive_path: &Path) -> Result<Vec<u8>, ArchiveError> {
    tokio::fs::read(archive_path)
        .await
        .map_err(|source| ArchiveError::Read {
            path: archive_path.to_path_buf(),
            source,
        })
}
