//! Application configuration.
//!
//! Loaded once at startup from the environment (and `.env` when present) and
//! handed to constructors. Nothing here is read again after startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),
    #[error("environment variable {var} has invalid value '{value}' (expected {expected})")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// What to do when a single record fails to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Fail the whole batch, naming the record that broke it.
    #[default]
    Abort,
    /// Leave the record out of the archive and report it in the manifest.
    Skip,
}

impl FromStr for FailurePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            _ => Err(()),
        }
    }
}

/// What to do when two records resolve to the same file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Append `-2`, `-3`, ... to later duplicates.
    #[default]
    Suffix,
    /// Last record wins; earlier duplicates are not rendered.
    Overwrite,
    /// Fail the batch.
    Error,
}

impl FromStr for CollisionPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suffix" => Ok(Self::Suffix),
            "overwrite" => Ok(Self::Overwrite),
            "error" => Ok(Self::Error),
            _ => Err(()),
        }
    }
}

/// Where records are read from.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSourceConfig {
    pub database_url: Option<String>,
    pub table: String,
    pub column: String,
    pub order_column: Option<String>,
    /// JSON array file used instead of Postgres when set.
    pub records_file: Option<PathBuf>,
}

impl Default for RecordSourceConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            table: "trade_records".to_string(),
            column: "document".to_string(),
            order_column: None,
            records_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Workspaces are created under `{output_root}/generated_pdfs/`.
    pub output_root: PathBuf,
    pub failure_policy: FailurePolicy,
    pub collision_policy: CollisionPolicy,
    pub render_concurrency: usize,
    pub timeout: Option<Duration>,
    pub typst_binary: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("./wwwroot"),
            failure_policy: FailurePolicy::default(),
            collision_policy: CollisionPolicy::default(),
            render_concurrency: default_concurrency(),
            timeout: None,
            typst_binary: "typst".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub source: RecordSourceConfig,
    pub pipeline: PipelineConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let source = RecordSourceConfig {
            database_url: get("REPORT_DATABASE_URL"),
            table: get("REPORT_TABLE").unwrap_or(defaults.source.table),
            column: get("REPORT_COLUMN").unwrap_or(defaults.source.column),
            order_column: get("REPORT_ORDER_COLUMN"),
            records_file: get("REPORT_RECORDS_FILE").map(PathBuf::from),
        };
        if source.database_url.is_none() && source.records_file.is_none() {
            return Err(ConfigError::Missing("REPORT_DATABASE_URL"));
        }

        let pipeline = PipelineConfig {
            output_root: get("REPORT_OUTPUT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.pipeline.output_root),
            failure_policy: parse_or(
                get("REPORT_FAILURE_POLICY"),
                "REPORT_FAILURE_POLICY",
                "abort|skip",
                defaults.pipeline.failure_policy,
            )?,
            collision_policy: parse_or(
                get("REPORT_COLLISION_POLICY"),
                "REPORT_COLLISION_POLICY",
                "suffix|overwrite|error",
                defaults.pipeline.collision_policy,
            )?,
            render_concurrency: parse_or(
                get("REPORT_RENDER_CONCURRENCY"),
                "REPORT_RENDER_CONCURRENCY",
                "a positive integer",
                defaults.pipeline.render_concurrency,
            )?
            .max(1),
            timeout: parse_or::<u64>(
                get("PIPELINE_TIMEOUT_SECS"),
                "PIPELINE_TIMEOUT_SECS",
                "a number of seconds",
                0,
            )
            .map(|secs| (secs > 0).then(|| Duration::from_secs(secs)))?,
            typst_binary: get("TYPST_BIN").unwrap_or(defaults.pipeline.typst_binary),
        };

        let server = ServerConfig {
            host: get("HOST").unwrap_or(defaults.server.host),
            port: parse_or(get("PORT"), "PORT", "a port number", defaults.server.port)?,
        };

        Ok(Self {
            source,
            pipeline,
            server,
        })
    }
}

fn parse_or<T: FromStr>(
    raw: Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            value,
            expected,
        }),
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
