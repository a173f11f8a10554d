//! Report definition, export and download handlers.

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use validator::Validate;

use assetdesk_core::AppError;
use assetdesk_core::types::{ReportFileId, ReportId};
use assetdesk_entity::report::{ExportFormat, ReportDefinition};
use assetdesk_entity::report_file::ReportFile;
use assetdesk_service::ExportOutcome;
use assetdesk_service::report::ReportPreview;

use crate::dto::request::{CreateReportRequest, ExportRequest, UpdateReportRequest};
use crate::dto::response::{ApiResponse, ExportQueuedResponse, MessageResponse, PaginatedResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, PaginationParams};
use crate::state::AppState;

fn validate<T: Validate>(body: &T) -> Result<(), AppError> {
    body.validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))
}

/// GET /api/reports
pub async fn list_reports(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<ReportDefinition>>>, ApiError> {
    let page = params.into_page_request();
    let result = state.reports.list(&auth, &page).await?;
    Ok(Json(ApiResponse::ok(result.into())))
}

/// POST /api/reports
pub async fn create_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReportDefinition>>), ApiError> {
    validate(&body)?;
    let report = state.reports.create(&auth, body.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(report))))
}

/// GET /api/reports/{id}
pub async fn get_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ReportId>,
) -> Result<Json<ApiResponse<ReportPreview>>, ApiError> {
    let preview = state.reports.show(&auth, id).await?;
    Ok(Json(ApiResponse::ok(preview)))
}

/// PUT /api/reports/{id}
pub async fn update_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ReportId>,
    Json(body): Json<UpdateReportRequest>,
) -> Result<Json<ApiResponse<ReportDefinition>>, ApiError> {
    validate(&body)?;
    let report = state.reports.update(&auth, id, body.into()).await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// DELETE /api/reports/{id}
pub async fn delete_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ReportId>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.reports.delete(&auth, id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Report deleted".to_string(),
    })))
}

/// POST /api/reports/{id}/export
///
/// 200 with the file record when generated inline, 202 with the job id when
/// the report is large enough to be queued.
pub async fn export_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ReportId>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let format = export_format(&body)?;
    let response = match state.reports.export(&auth, id, format).await? {
        ExportOutcome::Completed(file) => {
            (StatusCode::OK, Json(ApiResponse::ok(file))).into_response()
        }
        ExportOutcome::Queued(job) => (
            StatusCode::ACCEPTED,
            Json(ApiResponse::ok(ExportQueuedResponse {
                job_id: job.id,
                status: "queued".to_string(),
                message: "The report is being generated in the background".to_string(),
            })),
        )
            .into_response(),
    };
    Ok(response)
}

/// GET /api/reports/{id}/files
pub async fn list_files(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ReportId>,
) -> Result<Json<ApiResponse<Vec<ReportFile>>>, ApiError> {
    let files = state.reports.files(&auth, id).await?;
    Ok(Json(ApiResponse::ok(files)))
}

/// GET /api/reports/files/{file_id}/download
pub async fn download_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(file_id): Path<ReportFileId>,
) -> Result<Response, ApiError> {
    let download = state.reports.download(&auth, file_id).await?;
    let file = download.file;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.mime_type.as_str())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&file.file_name),
        )
        .header(header::CONTENT_LENGTH, file.file_size.max(0))
        .body(Body::from_stream(download.stream))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))?;

    Ok(response)
}

/// An empty body exports in the definition's own format.
fn export_format(body: &[u8]) -> Result<Option<ExportFormat>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let request: ExportRequest = serde_json::from_slice(body)
        .map_err(|e| AppError::validation(format!("Invalid export request: {e}")))?;
    Ok(request.format)
}

fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();
    format!("attachment; filename=\"{safe}\"")
}
