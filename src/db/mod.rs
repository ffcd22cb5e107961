//! Application state and the record store.
//!
//! - `records` - Postgres-backed record source

pub mod records;

use std::sync::Arc;

use crate::config::{AppConfig, PipelineConfig};
use crate::pipeline::ReportPipeline;
use crate::records::{JsonFileRecordSource, RecordSource, SourceError};
use crate::report::ReportRenderer;

pub use records::PgRecordSource;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ReportPipeline>,
}

impl AppState {
    /// Builds the record source named by the configuration and the pipeline on top of it.
    pub fn new_with_config(config: &AppConfig) -> Result<Self, SourceError> {
        let source: Arc<dyn RecordSource> = match &config.source.records_file {
            Some(path) => {
                let source = JsonFileRecordSource::new(path.clone());
                log::info!("Reading records from file {}", source.path().display());
                Arc::new(source)
            }
            None => {
                log::info!("Reading records from table {}", config.source.table);
                Arc::new(PgRecordSource::connect_lazy(&config.source)?)
            }
        };
        Ok(Self::new_with_source(source, config.pipeline.clone()))
    }

    pub fn new_with_source(source: Arc<dyn RecordSource>, config: PipelineConfig) -> Self {
        let renderer = ReportRenderer::typst(config.typst_binary.clone());
        Self::new_with_pipeline(ReportPipeline::new(source, renderer, config))
    }

    pub fn new_with_pipeline(pipeline: ReportPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}
