use crate::auth::{
    login, logout, register, require_session,
    session::SessionManager,
    store::{AccountStore, PgAccountStore},
};
use crate::settings::Settings;
use crate::{logfile, Error};
use axum::{middleware, routing::any, Router};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// State shared by every request. Read only once the server runs.
#[derive(Clone)]
pub struct AppState {
    /// Where the accounts live.
    pub store: Arc<dyn AccountStore>,
    /// Signs and reads the session cookie.
    pub sessions: SessionManager,
    api_key: Option<Arc<str>>,
}

impl AppState {
    /// Bundles the components. An empty `api_key` disables the API key check.
    pub fn new(
        store: Arc<dyn AccountStore>,
        sessions: SessionManager,
        api_key: Option<&str>,
    ) -> Self {
        AppState {
            store,
            sessions,
            api_key: api_key.filter(|key| !key.is_empty()).map(Arc::from),
        }
    }

    /// The key expected in the `Authorization` header, if any.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

/// Builds the router. `static_dir` holds the public `login/` assets and the
/// session gated `dashboard/` assets.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let dashboard = ServiceBuilder::new()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ))
        .service(ServeDir::new(static_dir.join("dashboard")));

    Router::new()
        .route("/login", any(login))
        .route("/register", any(register))
        .route("/logout", any(logout))
        .nest_service("/dashboard", dashboard)
        .fallback_service(ServeDir::new(static_dir.join("login")))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new()),
        )
        .with_state(state)
}

/// Runs the server. Main entrypoint for the server app.
pub async fn run_server(config_path: &Path, logfile_path: &Path) -> Result<(), Error> {
    logfile::init(logfile_path)?;
    let settings = Settings::load(config_path)?;

    let sessions = SessionManager::from_settings(&settings.webserver)?;
    let store = PgAccountStore::connect(&settings.database).await?;
    let state = AppState::new(Arc::new(store), sessions, settings.api_key());
    if state.api_key().is_none() {
        tracing::warn!("no api key configured, the auth routes are open to any client");
    }

    let addr = SocketAddr::new(
        settings
            .webserver
            .address
            .parse()
            .map_err(|_| Error::Address(settings.webserver.address.clone()))?,
        settings.port(),
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, router(state, &settings.webserver.staticdir)).await?;
    Ok(())
}
