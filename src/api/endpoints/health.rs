//! Liveness and health endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::config;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub crop_classes: usize,
    pub disease_classes: usize,
    pub uptime_secs: u64,
}

#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
}

/// `GET /`: plain liveness message.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("{} API is running", config::APP_NAME),
    })
}

/// `GET /api/health`: artifacts are loaded if this answers at all.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: config::APP_VERSION,
        crop_classes: ctx.core.crop().labels().len(),
        disease_classes: ctx.core.disease().labels().len(),
        uptime_secs: ctx.core.uptime_secs(),
    })
}
