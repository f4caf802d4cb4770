//! HTTP router.
//!
//! Returns a composable `Router`. Primary routes live under `/api/`; the
//! short aliases (`/crop-recommend`, `/predict`) serve the direct API clients.
//!
//! Layers (outermost → innermost): Trace → CORS → body limit → handler.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::config::{CorsOrigins, ServerConfig};
use crate::core_state::CoreState;

/// Build the service router over shared, already-loaded state.
pub fn api_router(core: Arc<CoreState>, config: &ServerConfig) -> Router {
    let ctx = ApiContext::new(core);

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/recommend-crop", post(endpoints::crops::recommend))
        .route("/disease/detect", post(endpoints::disease::detect))
        .route("/disease/classes", get(endpoints::disease::classes))
        .route("/disease/info/:label", get(endpoints::disease::info));

    Router::new()
        .route("/", get(endpoints::health::root))
        .route("/crop-recommend", post(endpoints::crops::recommend))
        .route("/predict", post(endpoints::disease::detect))
        .nest("/api", api)
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::from(Any),
        CorsOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(origin, "ignoring unparseable CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(values)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
