use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::sync::Arc;
use tower_cookies::{
    cookie::{
        time::{Duration, OffsetDateTime},
        SameSite,
    },
    Cookie, Cookies, Key,
};

use crate::settings::Webserver;

/// The signing key could not be built from the configured secret.
#[derive(Debug, thiserror::Error)]
#[error("invalid session secret: {0}")]
pub struct SessionError(String);

/// Authentication state carried by the session cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Whether the browser holding the cookie has logged in.
    pub authenticated: bool,
    /// The logged in user.
    pub username: Option<String>,
    /// Unix time after which the session no longer counts as logged in.
    #[serde(default)]
    pub expires: Option<i64>,
}

impl Session {
    /// A session for a user who just logged in, valid until `expires`.
    pub fn authenticated(username: &str, expires: OffsetDateTime) -> Self {
        Session {
            authenticated: true,
            username: Some(username.to_string()),
            expires: Some(expires.unix_timestamp()),
        }
    }

    /// Whether the session is logged in and not yet expired at `now`.
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        self.authenticated
            && self
                .expires
                .is_some_and(|expires| now.unix_timestamp() < expires)
    }

    fn encode(&self) -> String {
        // Serializing plain fields cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    fn decode(value: &str) -> Option<Self> {
        let json = URL_SAFE_NO_PAD.decode(value).ok()?;
        serde_json::from_slice(&json).ok()
    }
}

/// Issues, reads and clears the signed session cookie.
#[derive(Clone)]
pub struct SessionManager {
    key: Key,
    name: Arc<str>,
    secure: bool,
    max_age: Duration,
}

impl SessionManager {
    /// Builds a manager signing with a key derived from `secret`, under the
    /// cookie `name`. Logins last `max_age`.
    pub fn new(
        secret: &[u8],
        name: &str,
        secure: bool,
        max_age: Duration,
    ) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError("the secret must not be empty".to_string()));
        }
        // SHA-512 yields exactly the 64 bytes a signing key needs.
        let key = Key::from(Sha512::digest(secret).as_slice());
        Ok(SessionManager {
            key,
            name: Arc::from(name),
            secure,
            max_age,
        })
    }

    /// Builds a manager from the webserver settings.
    pub fn from_settings(webserver: &Webserver) -> Result<Self, SessionError> {
        Self::new(
            webserver.secretsessionkey.as_bytes(),
            &webserver.sessionname,
            webserver.securecookie,
            Duration::seconds(webserver.sessionmaxage),
        )
    }

    /// Marks the browser as logged in as `username`.
    pub fn issue(&self, cookies: &Cookies, username: &str) {
        let expires = OffsetDateTime::now_utc() + self.max_age;
        let mut cookie = self.cookie(&Session::authenticated(username, expires));
        cookie.set_max_age(self.max_age);
        cookies.signed(&self.key).add(cookie);
    }

    /// Resets the session and asks the browser to drop the cookie.
    pub fn clear(&self, cookies: &Cookies) {
        let mut cookie = self.cookie(&Session::default());
        cookie.set_max_age(Duration::ZERO);
        cookies.signed(&self.key).add(cookie);
    }

    /// The session carried by the request. Missing, tampered, undecodable
    /// or expired cookies yield the default, unauthenticated session.
    pub fn current(&self, cookies: &Cookies) -> Session {
        let Some(cookie) = cookies.signed(&self.key).get(&self.name) else {
            return Session::default();
        };
        let Some(session) = Session::decode(cookie.value()) else {
            tracing::debug!("undecodable session cookie");
            return Session::default();
        };
        if session.authenticated && !session.is_valid_at(OffsetDateTime::now_utc()) {
            tracing::debug!("expired session cookie");
            return Session::default();
        }
        session
    }

    /// Whether the request carries a logged in session.
    pub fn is_authenticated(&self, cookies: &Cookies) -> bool {
        self.current(cookies).authenticated
    }

    fn cookie(&self, session: &Session) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.name.to_string(), session.encode());
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_secure(self.secure);
        cookie.set_same_site(SameSite::Lax);
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_unauthenticated() {
        let session = Session::default();
        assert!(!session.authenticated);
        assert_eq!(session.username, None);
    }

    fn manager() -> SessionManager {
        SessionManager::new(b"changeme", "brogains", true, Duration::hours(1)).unwrap()
    }

    #[test]
    fn should_decode_encoded_session() {
        let session = Session::authenticated("alice", OffsetDateTime::now_utc());
        assert_eq!(Session::decode(&session.encode()), Some(session));
    }

    #[test]
    fn should_expire_at_deadline() {
        let now = OffsetDateTime::now_utc();
        let session = Session::authenticated("alice", now + Duration::minutes(5));
        assert!(session.is_valid_at(now));
        assert!(!session.is_valid_at(now + Duration::minutes(5)));
        assert!(!session.is_valid_at(now + Duration::days(31)));
    }

    #[test]
    fn should_reject_session_without_deadline() {
        let json = br#"{"authenticated":true,"username":"alice"}"#;
        let session = Session::decode(&URL_SAFE_NO_PAD.encode(json)).unwrap();
        assert!(!session.is_valid_at(OffsetDateTime::now_utc()));
    }

    #[test]
    fn should_not_decode_garbage() {
        assert_eq!(Session::decode("%%%"), None);
        assert_eq!(Session::decode(&URL_SAFE_NO_PAD.encode("[1, 2]")), None);
    }

    #[test]
    fn should_accept_any_non_empty_secret() {
        assert!(SessionManager::new(b"short", "brogains", false, Duration::hours(1)).is_ok());
        assert!(SessionManager::new(b"", "brogains", false, Duration::hours(1)).is_err());
    }

    #[test]
    fn should_build_cookie_with_configured_name() {
        let manager = manager();
        let cookie = manager.cookie(&Session::authenticated("alice", OffsetDateTime::now_utc()));
        assert_eq!(cookie.name(), "brogains");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
    }
}
