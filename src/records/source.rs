use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::Record;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("record store query failed: {0}")]
    Query(#[source] sqlx::Error),
    #[error("failed to connect to record store: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("failed to read records file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("records file {path} is not valid JSON: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("record #{index} is not a JSON object")]
    NotAnObject { index: usize },
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),
    #[error("no record store database URL configured")]
    NotConfigured,
}

/// Supplies the full current snapshot of trade records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Record>, SourceError>;
}

/// Converts raw JSON rows into records, rejecting anything that is not an object.
pub fn records_from_values(values: Vec<Value>) -> Result<Vec<Record>, SourceError> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| Record::from_value(value).ok_or(SourceError::NotAnObject { index }))
        .collect()
}

/// Fixed, in-memory record set.
#[derive(Debug, Clone, Default)]
pub struct StaticRecordSource {
    records: Vec<Record>,
}

impl StaticRecordSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for StaticRecordSource {
    async fn fetch_all(&self) -> Result<Vec<Record>, SourceError> {
        Ok(self.records.clone())
    }
}

/// JSON array of objects on disk, re-read on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileRecordSource {
    path: PathBuf,
}

impl JsonFileRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSource for JsonFileRecordSource {
    async fn fetch_all(&self) -> Result<Vec<Record>, SourceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| SourceError::ReadFile {
                path: self.path.clone(),
                source,
            })?;
        let values: Vec<Value> =
            serde_json::from_slice(&bytes).map_err(|source| SourceError::ParseFile {
                path: self.path.clone(),
                source,
            })?;
        log::info!("Loaded {} records from {}", values.len(), self.path.display());
        records_from_values(values)
    }
}
