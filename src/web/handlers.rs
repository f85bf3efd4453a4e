// API handlers for the relay

use super::{
    SharedRestorationClient, error::ApiError, extract_request_data::extract_uploaded_file,
    headers::AttachmentDisposition, models::*,
};
use crate::models::{RestoreStep, RestoredImage};
use axum::{
    Json,
    extract::{Query, Request, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use tracing::{error, info};
use uuid::Uuid;

// --- GET /api/health ---
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// --- POST /api/restore ---
// Forwards the uploaded photo to the restoration service and returns the result
pub async fn restore(
    State(upstream): State<SharedRestorationClient>,
    request: Request,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    let file = extract_uploaded_file(request).await?;

    info!(
        "Restore request: file={}, type={}, size={} bytes, request_id={}",
        file.file_name,
        file.content_type,
        file.len(),
        request_id
    );

    let restored = upstream.restore(&file).await.inspect_err(|e| {
        error!("Restoration failed for request_id={}: {}", request_id, e);
    })?;

    Ok(restored_image_response(restored))
}

// --- POST /api/restore-step?step=... ---
// Same as /api/restore, limited to one step of the pipeline
pub async fn restore_step(
    State(upstream): State<SharedRestorationClient>,
    query: Result<Query<RestoreStepQuery>, QueryRejection>,
    request: Request,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let step = match query.step.as_deref() {
        Some(raw) => raw.parse::<RestoreStep>().map_err(ApiError::BadRequest)?,
        None => RestoreStep::default(),
    };

    let request_id = Uuid::new_v4();
    let file = extract_uploaded_file(request).await?;

    info!(
        "Restore step request: step={}, file={}, size={} bytes, request_id={}",
        step,
        file.file_name,
        file.len(),
        request_id
    );

    let restored = upstream.restore_step(&file, step).await.inspect_err(|e| {
        error!(
            "Restoration step {} failed for request_id={}: {}",
            step, request_id, e
        );
    })?;

    Ok(restored_image_response(restored))
}

fn restored_image_response(image: RestoredImage) -> Response {
    (
        TypedHeader(::headers::ContentType::from(image.content_type)),
        TypedHeader(AttachmentDisposition(image.file_name)),
        image.data,
    )
        .into_response()
}
