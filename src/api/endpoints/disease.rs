//! Leaf-image disease detection and reference lookups.

use axum::extract::{Multipart, Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::{DiseaseDiagnosis, DiseaseRecord};

/// Multipart field names accepted for the upload.
const UPLOAD_FIELDS: [&str; 2] = ["file", "image"];

/// `POST /api/disease/detect`: classify one uploaded leaf photo.
///
/// Decoding, resizing and the CNN run on the blocking pool.
pub async fn detect(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<DiseaseDiagnosis>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name().is_some_and(|n| UPLOAD_FIELDS.contains(&n)) {
            upload = Some(field.bytes().await?);
            break;
        }
    }
    let bytes = upload.ok_or_else(|| {
        ApiError::BadRequest("Missing image upload (multipart field 'file' or 'image')".into())
    })?;

    tracing::debug!(size = bytes.len(), "disease image received");

    let core = ctx.core.clone();
    let diagnosis =
        tokio::task::spawn_blocking(move || core.disease().diagnose(&bytes, core.diseases()))
            .await??;

    Ok(Json(diagnosis))
}

/// `GET /api/disease/classes`: class labels in model output order.
pub async fn classes(State(ctx): State<ApiContext>) -> Json<Vec<String>> {
    Json(ctx.core.disease().labels().classes().to_vec())
}

/// `GET /api/disease/info/:label`
pub async fn info(
    State(ctx): State<ApiContext>,
    Path(label): Path<String>,
) -> Result<Json<DiseaseRecord>, ApiError> {
    ctx.core
        .diseases()
        .get(&label)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No disease record for '{label}'")))
}
