use crate::app::AppState;
use crate::auth::{
    hashing::verify_password, read_credentials, redirect_ok, require_api_key, require_post,
    store::Presence, AuthError,
};
use axum::{
    extract::{Request, State},
    response::Response,
};
use tower_cookies::Cookies;

/// Logs the user in and sets the session cookie.
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    req: Request,
) -> Result<Response, AuthError> {
    require_post(req.method())?;
    require_api_key(req.headers(), state.api_key())?;
    let log_in = read_credentials(req.into_body()).await?;

    match state.store.exists(&log_in.username).await {
        Ok(Presence::Unique) => {}
        Ok(Presence::Absent) => {
            tracing::debug!("login for unknown username");
            return Err(AuthError::UsernameNotFound);
        }
        Ok(Presence::Duplicated(count)) => {
            tracing::error!(
                "integrity fault: username {:?} held by {} accounts",
                log_in.username,
                count
            );
            return Err(AuthError::UsernameAmbiguous);
        }
        Err(e) => {
            tracing::error!("error checking user existence on login: {}", e);
            return Err(AuthError::Internal);
        }
    }

    let password_hash = state
        .store
        .password_hash(&log_in.username)
        .await
        .map_err(|e| {
            tracing::error!("error getting hashed password from db: {}", e);
            AuthError::Internal
        })?;
    if !verify_password(&log_in.password, &password_hash) {
        tracing::debug!("wrong password for {:?}", log_in.username);
        return Err(AuthError::InvalidCredentials);
    }

    state.sessions.issue(&cookies, &log_in.username);
    tracing::info!("user {:?} logged in", log_in.username);
    Ok(redirect_ok("/dashboard/", "Login successful"))
}
