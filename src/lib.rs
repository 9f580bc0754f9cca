#![deny(missing_docs)]

//! This crate contains the server for the brogains app: account registration,
//! login and a session gated dashboard.

/// Module containing all the authentication, registration, cookies, etc. logic.
pub mod auth;
/// Creation and appending of the log file.
pub mod logfile;
/// This module is used to parse and read from the configuration file for the
/// server.
pub mod settings;
mod app;
mod create_account;

pub use app::{router, run_server, AppState};
pub use create_account::create_account;

/// Errors that stop the process at startup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The log file could not be set up.
    #[error(transparent)]
    Logfile(#[from] logfile::LogfileError),
    /// The configuration file is missing, malformed or invalid.
    #[error(transparent)]
    Settings(#[from] settings::SettingsError),
    /// The session secret is unusable.
    #[error(transparent)]
    Session(#[from] auth::session::SessionError),
    /// The database could not be reached or migrated.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// An account operation failed.
    #[error(transparent)]
    Store(#[from] auth::store::StoreError),
    /// A password could not be hashed.
    #[error(transparent)]
    Hash(#[from] auth::hashing::HashError),
    /// The configured bind address does not parse.
    #[error("invalid bind address {0}")]
    Address(String),
    /// Reading input or serving failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The account could not be created.
    #[error("{0}")]
    Account(String),
}
