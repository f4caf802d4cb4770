//! `POST /api/recommend-crop`: stacking-ensemble crop recommendation.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CropChoice, CropRequest, CropResponse};

pub async fn recommend(
    State(ctx): State<ApiContext>,
    payload: Result<Json<CropRequest>, JsonRejection>,
) -> Result<Json<CropResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let ranked = ctx.core.crop().recommend(&request.features(), request.top_k)?;

    Ok(Json(CropResponse {
        status: "success",
        top_3_crops: ranked.into_iter().map(CropChoice::from).collect(),
    }))
}
