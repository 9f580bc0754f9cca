use crate::app::AppState;
use crate::auth::{
    hashing::hash_password, read_credentials, redirect_ok, require_api_key, require_post,
    store::{Presence, StoreError},
    AuthError,
};
use axum::{
    extract::{Request, State},
    response::Response,
};

/// Creates an account from a posted username and password.
pub async fn register(
    State(state): State<AppState>,
    req: Request,
) -> Result<Response, AuthError> {
    require_post(req.method())?;
    require_api_key(req.headers(), state.api_key())?;
    let sign_up = read_credentials(req.into_body()).await?;

    match state.store.exists(&sign_up.username).await {
        Ok(Presence::Absent) => {}
        Ok(Presence::Unique) => return Err(AuthError::UsernameExists),
        Ok(Presence::Duplicated(count)) => {
            tracing::error!(
                "integrity fault: username {:?} held by {} accounts",
                sign_up.username,
                count
            );
            return Err(AuthError::UsernameExists);
        }
        Err(e) => {
            tracing::error!("error checking user existence on registration: {}", e);
            return Err(AuthError::Internal);
        }
    }

    let password_hash = hash_password(&sign_up.password).map_err(|e| {
        tracing::error!("{}", e);
        AuthError::Internal
    })?;

    match state.store.insert(&sign_up.username, &password_hash).await {
        Ok(()) => {
            tracing::info!("new user {:?} registered", sign_up.username);
            Ok(redirect_ok("/", "New user created"))
        }
        // Lost a race against a concurrent registration.
        Err(StoreError::Duplicate) => Err(AuthError::UsernameExists),
        Err(e) => {
            tracing::error!("error inserting user into database: {}", e);
            Err(AuthError::Internal)
        }
    }
}
