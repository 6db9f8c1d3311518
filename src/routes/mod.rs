mod home;
mod photos;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::services::pipeline::PhotoPipeline;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        home::root,
        photos::upload_photo,
    ),
    components(
        schemas(
            crate::models::photo::StoredPhoto,
            crate::error::ApiResponse,
        )
    ),
    tags(
        (name = "General", description = "General API information"),
        (name = "Photos", description = "Article photo uploads")
    ),
    info(
        title = "Article Photo Kit API",
        version = "0.1.0",
        description = "Validated image uploads for catalog articles with resized derivatives",
    )
)]
struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PhotoPipeline>,
}

pub fn create_routes(state: AppState) -> Router {
    let swagger_router: Router = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    let body_limit = usize::try_from(state.pipeline.config().max_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let app_routes = Router::new()
        .route("/", get(home::root))
        .route(
            "/api/article/{id}/uploadPhoto",
            post(photos::upload_photo).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state);

    Router::new()
        .merge(swagger_router)
        .merge(app_routes)
        .layer(TraceLayer::new_for_http())
}
