use crate::app::AppState;
use crate::auth::{redirect_ok, require_api_key, require_post, AuthError};
use axum::{
    extract::State,
    http::{HeaderMap, Method},
    response::Response,
};
use tower_cookies::Cookies;

/// Ends the session of a logged in user.
pub async fn logout(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    cookies: Cookies,
) -> Result<Response, AuthError> {
    require_post(&method)?;
    require_api_key(&headers, state.api_key())?;

    let session = state.sessions.current(&cookies);
    if !session.authenticated {
        tracing::debug!("logout without session");
        return Err(AuthError::Unauthorized);
    }

    state.sessions.clear(&cookies);
    tracing::info!("user {:?} logged out", session.username.unwrap_or_default());
    Ok(redirect_ok("/", "Logout successful"))
}
