//! The render-and-package pipeline.
//!
//! One run: fetch records, assign file names, render every record into the
//! run's workspace, pack the workspace into a ZIP, read the ZIP back and tear
//! the workspace down. The workspace is removed on every exit path.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::archive::{self, ArchiveError, ArchiveWriter, ZipArchiveWriter};
use crate::config::{FailurePolicy, PipelineConfig};
use crate::metrics;
use crate::records::{Record, RecordSource, SourceError};
use crate::report::naming::report_file_name;
use crate::report::{assign_names, DuplicateName, ReportError, ReportRenderer};
use crate::workspace::{Workspace, WorkspaceError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to fetch records: {0}")]
    Source(#[from] SourceError),
    #[error("failed to render report '{name}': {source}")]
    Render {
        name: String,
        #[source]
        source: ReportError,
    },
    #[error(transparent)]
    DuplicateName(#[from] DuplicateName),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("render task failed: {0}")]
    Task(String),
    #[error("report generation timed out after {0:?}")]
    Timeout(Duration),
}

/// A record left out of the archive under [`FailurePolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedReport {
    pub name: String,
    pub reason: String,
}

/// The finished archive, already detached from its workspace.
#[derive(Debug, Clone)]
pub struct ArchivePayload {
    pub bytes: Vec<u8>,
    /// Names of the reports in the archive, in record order.
    pub report_names: Vec<String>,
    pub skipped: Vec<SkippedReport>,
}

pub struct ReportPipeline {
    source: Arc<dyn RecordSource>,
    renderer: ReportRenderer,
    archiver: Arc<dyn ArchiveWriter>,
    config: PipelineConfig,
}

impl ReportPipeline {
    pub fn new(
        source: Arc<dyn RecordSource>,
        renderer: ReportRenderer,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            renderer,
            archiver: Arc::new(ZipArchiveWriter),
            config,
        }
    }

    pub fn with_archiver(mut self, archiver: Arc<dyn ArchiveWriter>) -> Self {
        self.archiver = archiver;
        self
    }

    /// Runs the whole pipeline, honoring the configured timeout.
    pub async fn run(&self) -> Result<ArchivePayload, PipelineError> {
        metrics::REPORT_RUNS.inc();
        let result = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, self.execute())
                .await
                .unwrap_or_else(|_| Err(PipelineError::Timeout(limit))),
            None => self.execute().await,
        };

        match &result {
            Ok(payload) => {
                metrics::REPORTS_RENDERED.inc_by(payload.report_names.len() as u64);
                metrics::REPORTS_SKIPPED.inc_by(payload.skipped.len() as u64);
            }
            Err(e) => {
                metrics::REPORT_RUNS_FAILED.inc();
                error!("Report generation failed: {}", e);
            }
        }
        result
    }

    async fn execute(&self) -> Result<ArchivePayload, PipelineError> {
        info!("Retrieving records from the record source...");
        let records = self.source.fetch_all().await?;
        info!("Retrieved {} records", records.len());

        let names = assign_names(&records, self.config.collision_policy)?;

        // Every blocking task that writes into the workspace holds a clone, so
        // the directory is only removed once the last writer is done.
        let workspace = Arc::new(Workspace::acquire(&self.config.output_root)?);
        let result = self.build_archive(&workspace, records, names).await;
        let released = teardown(workspace).await;

        settle(result, released)
    }

    async fn build_archive(
        &self,
        workspace: &Arc<Workspace>,
        records: Vec<Record>,
        names: Vec<Option<String>>,
    ) -> Result<ArchivePayload, PipelineError> {
        let (report_names, skipped) = self.render_all(workspace, records, names).await?;

        let archiver = self.archiver.clone();
        let packed = workspace.clone();
        let archive_path = tokio::task::spawn_blocking(move || archiver.pack(packed.path()))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))??;

        let bytes = archive::deliver(&archive_path).await?;
        info!(
            "Archive {} ready ({} bytes, {} reports)",
            archive::ARCHIVE_NAME,
            bytes.len(),
            report_names.len()
        );

        Ok(ArchivePayload {
            bytes,
            report_names,
            skipped,
        })
    }

    /// Renders every named record concurrently and waits for all of them.
    async fn render_all(
        &self,
        workspace: &Arc<Workspace>,
        records: Vec<Record>,
        names: Vec<Option<String>>,
    ) -> Result<(Vec<String>, Vec<SkippedReport>), PipelineError> {
        let semaphore = Arc::new(Semaphore::new(self.config.render_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, (record, name)) in records.into_iter().zip(names).enumerate() {
            let Some(name) = name else { continue };
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::Task(e.to_string()))?;
            let renderer = self.renderer.clone();
            let workspace = workspace.clone();

            tasks.spawn_blocking(move || {
                let _permit = permit;
                let path = workspace.file_path(&report_file_name(&name));
                let result = renderer.render(&record, &path);
                if result.is_err() {
                    discard_partial(&path);
                }
                (index, name, result)
            });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    // Wait out renders already running before the workspace goes.
                    tasks.shutdown().await;
                    return Err(PipelineError::Task(e.to_string()));
                }
            }
        }
        outcomes.sort_by_key(|(index, _, _)| *index);

        let mut rendered = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        for (_, name, result) in outcomes {
            match result {
                Ok(()) => {
                    info!("Generated PDF for: {}", name);
                    rendered.push(name);
                }
                Err(source) => match self.config.failure_policy {
                    FailurePolicy::Abort => {
                        error!("Rendering {} failed, aborting batch: {}", name, source);
                        return Err(PipelineError::Render { name, source });
                    }
                    FailurePolicy::Skip => {
                        warn!("Skipping {}: {}", name, source);
                        skipped.push(SkippedReport {
                            name,
                            reason: source.to_string(),
                        });
                    }
                },
            }
        }

        Ok((rendered, skipped))
    }
}

/// Removes the workspace off the async threads.
///
/// A clone still held by a running render defers removal to that render's
/// thread, which drops the last handle.
async fn teardown(workspace: Arc<Workspace>) -> Result<(), PipelineError> {
    match Arc::try_unwrap(workspace) {
        Ok(workspace) => tokio::task::spawn_blocking(move || workspace.release())
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))?
            .map_err(PipelineError::from),
        Err(shared) => {
            warn!(
                "Workspace {} still in use, removal deferred to the last render",
                shared.id()
            );
            Ok(())
        }
    }
}

/// Combines the run outcome with the teardown outcome. The run error wins;
/// a teardown error behind it is logged rather than lost.
fn settle(
    result: Result<ArchivePayload, PipelineError>,
    released: Result<(), PipelineError>,
) -> Result<ArchivePayload, PipelineError> {
    match (result, released) {
        (Ok(payload), Ok(())) => Ok(payload),
        (Ok(_), Err(cleanup)) => Err(cleanup),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup)) => {
            error!("Workspace teardown failed after an earlier error: {}", cleanup);
            Err(e)
        }
    }
}

fn discard_partial(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Could not remove partial report {}: {}", path.display(), e);
        }
    }
}
