pub mod handlers;
mod types;

pub use handlers::AppState;
pub use types::*;

use crate::{
    Result,
    config::Config,
    model::Pipeline,
    service::{self, InferenceService},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;

pub const SINGLE_PREDICTION_PATH: &str = "/v1/check_house_price/single_prediction";
pub const BULK_PREDICTION_PATH: &str = "/v1/check_house_prices/bulk_prediction";

pub fn router(state: AppState, max_upload_bytes: Option<usize>) -> Router {
    let body_limit = match max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route(SINGLE_PREDICTION_PATH, get(handlers::single_prediction))
        .route(BULK_PREDICTION_PATH, post(handlers::bulk_prediction))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Loads the model and builds the application. Fails if the artifact is
/// missing, invalid, or fitted on features other than the request fields.
pub async fn build_app(config: &Config) -> Result<Router> {
    let pipeline = Pipeline::load(&config.model.path).await?;
    service::check_model_features(pipeline.feature_names())?;

    let app_state = AppState {
        service: Arc::new(InferenceService::new(Arc::new(pipeline))),
        legacy_bulk_errors: config.server.legacy_bulk_errors,
    };

    Ok(router(app_state, config.server.max_upload_bytes))
}

pub async fn run(config: Config) -> Result<()> {
    let app = build_app(&config).await?;

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
