//! Pipeline counters, served on `/metrics/reports` next to the HTTP metrics.

use actix_web::{HttpResponse, Responder};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref REPORT_RUNS: IntCounter =
        IntCounter::new("report_runs_total", "Report archive runs started").unwrap();
    pub static ref REPORT_RUNS_FAILED: IntCounter =
        IntCounter::new("report_runs_failed_total", "Report archive runs that failed").unwrap();
    pub static ref REPORTS_RENDERED: IntCounter =
        IntCounter::new("reports_rendered_total", "Reports rendered into archives").unwrap();
    pub static ref REPORTS_SKIPPED: IntCounter =
        IntCounter::new("reports_skipped_total", "Reports left out after a render failure")
            .unwrap();
}

/// Registers the pipeline counters. Call once at startup.
pub fn register() -> prometheus::Result<()> {
    register_into(&REGISTRY)
}

pub fn register_into(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(REPORT_RUNS.clone()))?;
    registry.register(Box::new(REPORT_RUNS_FAILED.clone()))?;
    registry.register(Box::new(REPORTS_RENDERED.clone()))?;
    registry.register(Box::new(REPORTS_SKIPPED.clone()))?;
    Ok(())
}

pub fn encode(registry: &Registry) -> prometheus::Result<Vec<u8>> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(buffer)
}

pub async fn report_metrics() -> impl Responder {
    match encode(&REGISTRY) {
        Ok(body) => HttpResponse::Ok()
            .content_type(TextEncoder::new().format_type())
            .body(body),
        Err(e) => {
            log::error!("Failed to encode report metrics: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_exposes_counters() {
        let registry = Registry::new();
        register_into(&registry).unwrap();
        REPORT_RUNS.inc();

        let text = String::from_utf8(encode(&registry).unwrap()).unwrap();
        assert!(text.contains("report_runs_total"));
        assert!(text.contains("reports_skipped_total"));
    }

    #[test]
    fn test_registering_twice_fails() {
        let registry = Registry::new();
        register_into(&registry).unwrap();
        assert!(register_into(&registry).is_err());
    }
}
