use super::types::ErrorResponse;
use crate::{
    Error,
    service::{BulkPredictionResponse, InferenceService, PredictionResult, SinglePredictionRequest},
};
use axum::{
    body::Bytes,
    extract::{
        Multipart, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
    },
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

type ApiError = (StatusCode, Json<ErrorResponse>);

const FILE_FIELD: &str = "file";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InferenceService>,
    pub legacy_bulk_errors: bool,
}

pub async fn single_prediction(
    State(state): State<AppState>,
    query: Result<Query<SinglePredictionRequest>, QueryRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Query(request) = query.map_err(|rejection| {
        warn!("Rejected single prediction query: {}", rejection.body_text());
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::new(rejection.body_text())),
        )
    })?;

    let request_id = Uuid::new_v4();
    info!(
        "[{}] Received single prediction request for ID {}",
        request_id, request.id
    );

    match state.service.single_prediction(&request) {
        Ok(result) => {
            info!(
                "[{}] Predicted house price {} for ID {}",
                request_id, result.house_price, result.id
            );
            Ok(Json(result))
        }
        Err(e) => {
            error!("[{}] Failed to predict ID {}: {}", request_id, request.id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(format!("Error getting house price: {}", e))),
            ))
        }
    }
}

pub async fn bulk_prediction(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BulkPredictionResponse>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        warn!("Rejected bulk prediction body: {}", rejection.body_text());
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(rejection.body_text())),
        )
    })?;

    let request_id = Uuid::new_v4();
    let (filename, bytes) = read_upload(&mut multipart).await?;
    info!(
        "[{}] Received bulk prediction upload {:?} ({} bytes)",
        request_id,
        filename,
        bytes.len()
    );

    let service = Arc::clone(&state.service);
    let outcome =
        tokio::task::spawn_blocking(move || service.bulk_prediction(filename.as_deref(), &bytes))
            .await
            .unwrap_or_else(|e| Err(Error::internal(format!("prediction task failed: {}", e))));

    match outcome {
        Ok(response) => {
            info!(
                "[{}] Predicted {} house prices",
                request_id,
                response.predictions.len()
            );
            Ok(Json(response))
        }
        Err(e) => {
            error!("[{}] Failed to process upload: {}", request_id, e);
            Err(bulk_error(&e, state.legacy_bulk_errors))
        }
    }
}

/// Pulls the `file` field out of the multipart body.
async fn read_upload(multipart: &mut Multipart) -> Result<(Option<String>, Bytes), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok((filename, bytes));
    }

    Err((
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse::new(format!(
            "Missing multipart field '{}'",
            FILE_FIELD
        ))),
    ))
}

fn multipart_error(err: MultipartError) -> ApiError {
    warn!("Malformed multipart body: {}", err);
    (err.status(), Json(ErrorResponse::new(err.body_text())))
}

/// Input errors are 400 unless `legacy` is set, in which case they are
/// reported the way a catch-all handler wraps them: 500 with the original
/// status folded into the message.
pub fn bulk_error(err: &Error, legacy: bool) -> ApiError {
    if err.is_client_error() && !legacy {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(err.to_string())),
        );
    }

    let message = if err.is_client_error() {
        format!("{}: {}", StatusCode::BAD_REQUEST.as_u16(), err)
    } else {
        err.to_string()
    };
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(format!("Error processing file: {}", message))),
    )
}
