use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

/// Body size the apply route accepts: a base64 data URI of an image up to
/// `max_image_bytes`, plus room for the JSON envelope.
pub fn apply_body_limit(max_image_bytes: usize) -> usize {
    max_image_bytes.div_ceil(3) * 4 + 64 * 1024
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();
    let apply_limit = DefaultBodyLimit::max(apply_body_limit(state.max_image_bytes));

    Router::new()
        .route("/api/backgrounds", post(handlers::generate_background))
        .route("/api/backgrounds/website", post(handlers::generate_from_website))
        .route("/api/backgrounds/freeform", post(handlers::generate_from_text))
        .route("/api/profiles/:id", get(handlers::get_profile))
        .route(
            "/api/profiles/:id/background",
            post(handlers::apply_background).layer(apply_limit),
        )
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Serves `app` until the process receives Ctrl-C.
pub async fn serve(app: Router, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌍 Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("👋 Shutting down");
        })
        .await
}

pub mod prelude {
    pub use cardbg_core::{Error, Result};
    pub use crate::{apply_body_limit, create_app, serve, AppState};
}
