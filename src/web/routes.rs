//! HTTP handlers for the authentication surface

use crate::session::{AuthFlowError, AuthOutcome, Session};
use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::server::AppState;

/// Request-scoped session state, populated by [`attach_session`] on
/// every route. `None` means the request is anonymous.
#[derive(Clone, Default)]
pub struct CurrentSession(pub Option<Arc<Session>>);

/// Middleware: derive the session from the `Authorization` header.
///
/// A missing or invalid bearer token leaves the request anonymous; it
/// is never rejected here.
pub async fn attach_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let session = state.manager.session_from_header(header.as_deref());
    request
        .extensions_mut()
        .insert(CurrentSession(session.map(Arc::new)));
    next.run(request).await
}

/// `GET /` - session introspection for downstream handlers and tests.
/// Anonymous requests see `{}`; authenticated ones get their user id
/// and the lazily loaded user document. A load failure is reported
/// in-band, not as an error status.
pub async fn whoami(Extension(CurrentSession(session)): Extension<CurrentSession>) -> Json<Value> {
    let mut body = json!({});
    if let Some(session) = session {
        body["userId"] = json!(session.id().id);
        body["user"] = match session.load_user().await {
            Ok(user) => user,
            Err(err) => json!({"error": err.to_string()}),
        };
    }
    Json(body)
}

/// `POST /auth/{source_id}` - run the authentication flow
pub async fn authenticate(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
    body: Bytes,
) -> Response {
    // The payload shape is authenticator-specific; an empty body is an
    // empty payload, anything else must at least be JSON.
    let payload: Value = if body.is_empty() {
        json!({})
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "errors": [{"detail": "request body is not valid JSON", "status": 400}],
                    })),
                )
                    .into_response()
            }
        }
    };
    match state.manager.authenticate(&source_id, &payload).await {
        Ok(AuthOutcome::Authenticated(document)) => Json(document).into_response(),
        Ok(AuthOutcome::PartialSession { data, meta }) => {
            Json(json!({"data": data, "meta": meta})).into_response()
        }
        Err(err) => auth_error_response(err),
    }
}

/// `GET /auth/{source_id}` - the module's publicly exposed config
pub async fn source_config(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> Response {
    match state.manager.exposed_config(&source_id) {
        Ok(exposed) => Json(exposed).into_response(),
        Err(err) => auth_error_response(err),
    }
}

/// `OPTIONS /auth/{source_id}` - pre-flight for clients that probe
/// without an Origin header (browser pre-flights are answered by the
/// CORS layer before reaching this handler)
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, GET, OPTIONS"),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                "Authorization, Content-Type",
            ),
        ],
    )
}

/// Map flow errors onto the HTTP contract. Authentication failures are
/// never allowed to surface as internal errors.
fn auth_error_response(err: AuthFlowError) -> Response {
    match err {
        AuthFlowError::SourceNotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "errors": [{
                    "detail": format!("Did not locate authentication source \"{}\"", id),
                }],
            })),
        )
            .into_response(),
        AuthFlowError::Rejected => StatusCode::UNAUTHORIZED.into_response(),
        AuthFlowError::Validation(details) => {
            let errors: Vec<Value> = details
                .iter()
                .map(|entry| {
                    let mut error = json!({"detail": entry.detail, "status": 400});
                    if let Some(pointer) = &entry.pointer {
                        error["source"] = json!({"pointer": pointer});
                    }
                    error
                })
                .collect();
            (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
        }
    }
}
