//! Postgres-backed record source.
//!
//! Trade documents live in a JSONB column; each row is one record.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use sqlx::PgPool;

use crate::config::RecordSourceConfig;
use crate::records::source::records_from_values;
use crate::records::{Record, RecordSource, SourceError};

lazy_static! {
    static ref IDENTIFIER: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").unwrap();
}

fn checked_identifier(name: &str) -> Result<&str, SourceError> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(SourceError::InvalidIdentifier(name.to_string()))
    }
}

/// Builds the snapshot query, validating every interpolated identifier.
pub fn build_fetch_query(config: &RecordSourceConfig) -> Result<String, SourceError> {
    let table = checked_identifier(&config.table)?;
    let column = checked_identifier(&config.column)?;
    let mut query = format!("SELECT {column} FROM {table}");
    if let Some(order) = &config.order_column {
        query.push_str(&format!(" ORDER BY {}", checked_identifier(order)?));
    }
    Ok(query)
}

pub struct PgRecordSource {
    pool: PgPool,
    query: String,
}

impl PgRecordSource {
    pub fn new(pool: PgPool, config: &RecordSourceConfig) -> Result<Self, SourceError> {
        Ok(Self {
            pool,
            query: build_fetch_query(config)?,
        })
    }

    /// Connects lazily; the first `fetch_all` opens the connection.
    pub fn connect_lazy(config: &RecordSourceConfig) -> Result<Self, SourceError> {
        let database_url = config
            .database_url
            .as_deref()
            .ok_or(SourceError::NotConfigured)?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .idle_timeout(std::time::Duration::from_secs(900))
            .max_lifetime(std::time::Duration::from_secs(1800))
            .connect_lazy(database_url)
            .map_err(SourceError::Connect)?;
        Self::new(pool, config)
    }
}

#[async_trait]
impl RecordSource for PgRecordSource {
    async fn fetch_all(&self) -> Result<Vec<Record>, SourceError> {
        log::info!("Retrieving records: {}", self.query);
        let values: Vec<Value> = sqlx::query_scalar(&self.query)
            .fetch_all(&self.pool)
            .await
            .map_err(SourceError::Query)?;
        records_from_values(values)
    }
}
