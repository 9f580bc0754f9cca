use crate::app::AppState;
use crate::auth::AuthError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_cookies::Cookies;

/// Lets the request through only if it carries a logged in session.
pub async fn require_session(
    State(state): State<AppState>,
    cookies: Cookies,
    req: Request,
    next: Next,
) -> Response {
    if state.sessions.is_authenticated(&cookies) {
        next.run(req).await
    } else {
        tracing::debug!("unauthorized request to {}", req.uri());
        AuthError::Unauthorized.into_response()
    }
}
