/// Password hashing and verification.
pub mod hashing;
mod login;
mod logout;
mod middleware;
mod register;
/// The signed session cookie.
pub mod session;
/// Storage of the accounts and their password hashes.
pub mod store;

pub use login::login;
pub use logout::logout;
pub use middleware::require_session;
pub use register::register;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

/// Failures of the auth routes. Each maps to a status and a fixed message
/// that never exposes internals.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The route only accepts POST.
    #[error("Method is not allowed")]
    MethodNotAllowed,
    /// Bad API key or missing session.
    #[error("Unauthorized")]
    Unauthorized,
    /// The body is not the expected JSON document.
    #[error("Invalid request body")]
    InvalidBody,
    /// Login for a username with no account.
    #[error("Username does not exist")]
    UsernameNotFound,
    /// Login for a username held by several accounts.
    #[error("Username exists more than once")]
    UsernameAmbiguous,
    /// The password does not match.
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// Registration for a username already taken.
    #[error("Username is already in use")]
    UsernameExists,
    /// Storage or hashing failed; details are only logged.
    #[error("Internal server error")]
    Internal,
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AuthError::Unauthorized | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::InvalidBody => StatusCode::BAD_REQUEST,
            AuthError::UsernameNotFound
            | AuthError::UsernameAmbiguous
            | AuthError::UsernameExists => StatusCode::CONFLICT,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Username and password posted to `/login` and `/register`.
#[derive(Deserialize)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

/// Rejects anything but POST.
fn require_post(method: &Method) -> Result<(), AuthError> {
    if *method == Method::POST {
        Ok(())
    } else {
        Err(AuthError::MethodNotAllowed)
    }
}

/// Checks the `Authorization` header against the configured key. Without a
/// configured key every request passes.
fn require_api_key(headers: &HeaderMap, api_key: Option<&str>) -> Result<(), AuthError> {
    let Some(expected) = api_key else {
        return Ok(());
    };
    let given = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if given == Some(expected) {
        Ok(())
    } else {
        tracing::debug!("wrong api key used");
        Err(AuthError::Unauthorized)
    }
}

/// Largest credentials document the auth routes read.
const MAX_BODY_LEN: usize = 64 * 1024;

/// Reads the body only once the method and API key gates have passed.
async fn read_credentials(body: Body) -> Result<Credentials, AuthError> {
    let body = axum::body::to_bytes(body, MAX_BODY_LEN).await.map_err(|e| {
        tracing::debug!("unreadable request body: {}", e);
        AuthError::InvalidBody
    })?;
    parse_credentials(&body)
}

fn parse_credentials(body: &Bytes) -> Result<Credentials, AuthError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("invalid request body: {}", e);
        AuthError::InvalidBody
    })
}

/// Success response carrying the page the client should go to next.
fn redirect_ok(location: &'static str, message: &'static str) -> Response {
    (StatusCode::OK, [(header::LOCATION, location)], message).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn should_map_errors_to_status() {
        assert_eq!(AuthError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(AuthError::InvalidBody.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::UsernameAmbiguous.status(), StatusCode::CONFLICT);
        assert_eq!(AuthError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn should_only_accept_post() {
        assert!(require_post(&Method::POST).is_ok());
        assert!(matches!(
            require_post(&Method::GET),
            Err(AuthError::MethodNotAllowed)
        ));
    }

    #[test]
    fn should_check_api_key_when_configured() {
        let mut headers = HeaderMap::new();
        assert!(require_api_key(&headers, None).is_ok());
        assert!(require_api_key(&headers, Some("letmein")).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("wrong"));
        assert!(require_api_key(&headers, Some("letmein")).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("letmein"));
        assert!(require_api_key(&headers, Some("letmein")).is_ok());
    }

    #[test]
    fn should_parse_credentials() {
        let body = Bytes::from_static(br#"{"username":"alice","password":"secret1"}"#);
        let credentials = parse_credentials(&body).unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password, "secret1");

        let body = Bytes::from_static(br#"{"username":"alice"}"#);
        assert!(matches!(
            parse_credentials(&body),
            Err(AuthError::InvalidBody)
        ));
    }

    #[tokio::test]
    async fn should_refuse_oversized_body() {
        let body = Body::from(vec![b' '; MAX_BODY_LEN + 1]);
        assert!(matches!(
            read_credentials(body).await,
            Err(AuthError::InvalidBody)
        ));
    }
}
