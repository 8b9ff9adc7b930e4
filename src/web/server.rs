//! Router assembly and serving

use crate::grant::Grant;
use crate::session::SessionManager;
use axum::{
    http::{header, HeaderValue},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::routes;

/// Application state shared across handlers. Content handlers mounted
/// on top of this router consume the grants together with the
/// request-scoped session to decide per-resource access.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SessionManager>,
    pub grants: Arc<Vec<Grant>>,
}

impl AppState {
    pub fn new(manager: Arc<SessionManager>, grants: Vec<Grant>) -> Self {
        Self {
            manager,
            grants: Arc::new(grants),
        }
    }
}

/// Build the router with all routes and layers
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::whoami))
        .route(
            "/auth/{source_id}",
            post(routes::authenticate)
                .get(routes::source_config)
                .options(routes::preflight),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            routes::attach_session,
        ))
        .layer(cors)
        // Non-browser clients expect the header even on requests that
        // carry no Origin; the CORS layer only covers browser traffic.
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until shutdown
pub async fn serve(bind: &str, state: AppState) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, build_router(state)).await
}
