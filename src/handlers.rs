use actix_web::http::header::{
    self, ContentDisposition, DispositionParam, DispositionType, HeaderName,
};
use actix_web::{web, HttpResponse, Responder};
use log::{error, info};
use serde_json::json;

use crate::archive::{ARCHIVE_CONTENT_TYPE, ARCHIVE_NAME};
use crate::pipeline::{ArchivePayload, PipelineError};
use crate::{AppState, ErrorResponse};

pub const REPORT_COUNT_HEADER: &str = "x-report-count";
pub const SKIPPED_REPORTS_HEADER: &str = "x-skipped-reports";

#[utoipa::path(
    get,
    path = "/api/PDFGeneration/GeneratePDFZip",
    tag = "PDF Generation",
    responses(
        (status = 200, description = "ZIP archive with one PDF per record", content_type = "application/zip", body = Vec<u8>),
        (status = 409, description = "Two records resolve to the same report name", body = ErrorResponse),
        (status = 500, description = "A report or the archive could not be produced", body = ErrorResponse),
        (status = 502, description = "Record store unavailable", body = ErrorResponse),
        (status = 504, description = "Report generation timed out", body = ErrorResponse)
    )
)]
pub async fn generate_pdf_zip(state: web::Data<AppState>) -> impl Responder {
    info!("Executing generate_pdf_zip handler");
    match state.pipeline.run().await {
        Ok(payload) => archive_response(payload),
        Err(e) => {
            error!("Failed to generate PDF archive: {}", e);
            error_response(&e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "PDF Generation",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn archive_response(payload: ArchivePayload) -> HttpResponse {
    let mut response = HttpResponse::Ok();
    response
        .content_type(ARCHIVE_CONTENT_TYPE)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(ARCHIVE_NAME.to_string())],
        })
        .insert_header((
            HeaderName::from_static(REPORT_COUNT_HEADER),
            payload.report_names.len().to_string(),
        ));

    if !payload.skipped.is_empty() {
        let names: Vec<String> = payload
            .skipped
            .iter()
            .map(|s| header_safe(&s.name))
            .collect();
        response.insert_header((HeaderName::from_static(SKIPPED_REPORTS_HEADER), names.join(",")));
    }

    response.body(payload.bytes)
}

pub fn error_response(err: &PipelineError) -> HttpResponse {
    let message = err.to_string();
    match err {
        PipelineError::Source(_) => HttpResponse::BadGateway()
            .json(ErrorResponse::new("SourceUnavailable", &message)),
        PipelineError::Render { .. } => HttpResponse::InternalServerError()
            .json(ErrorResponse::new("RenderFailed", &message)),
        PipelineError::DuplicateName(_) => {
            HttpResponse::Conflict().json(ErrorResponse::new("DuplicateReportName", &message))
        }
        PipelineError::Timeout(_) => {
            HttpResponse::GatewayTimeout().json(ErrorResponse::new("Timeout", &message))
        }
        PipelineError::Workspace(_) | PipelineError::Archive(_) | PipelineError::Task(_) => {
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error(&message))
        }
    }
}

fn header_safe(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != ',' { c } else { '_' })
        .collect()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/PDFGeneration/GeneratePDFZip").route(web::get().to(generate_pdf_zip)),
    );
}

/// Headers a browser client needs to read from the archive response.
pub fn exposed_headers() -> Vec<HeaderName> {
    vec![
        header::CONTENT_DISPOSITION,
        HeaderName::from_static(REPORT_COUNT_HEADER),
        HeaderName::from_static(SKIPPED_REPORTS_HEADER),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SkippedReport;
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use std::time::Duration;

    #[actix_web::test]
    async fn test_archive_response_headers() {
        let payload = ArchivePayload {
            bytes: b"PK".to_vec(),
            report_names: vec!["M1_H1".to_string()],
            skipped: vec![SkippedReport {
                name: "M 2_H2".to_string(),
                reason: "bad".to_string(),
            }],
        };

        let response = archive_response(payload);
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/zip");
        assert!(headers
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("AllDocuments.zip"));
        assert_eq!(headers.get(REPORT_COUNT_HEADER).unwrap(), "1");
        assert_eq!(headers.get(SKIPPED_REPORTS_HEADER).unwrap(), "M_2_H2");

        let body = to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"PK");
    }

    #[test]
    fn test_error_statuses() {
        let timeout = error_response(&PipelineError::Timeout(Duration::from_secs(1)));
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let source = error_response(&PipelineError::Source(
            crate::records::SourceError::NotConfigured,
        ));
        assert_eq!(source.status(), StatusCode::BAD_GATEWAY);

        let task = error_response(&PipelineError::Task("panicked".to_string()));
        assert_eq!(task.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
