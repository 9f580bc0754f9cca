/// This module is used to parse and read the JSON configuration file for the
/// server.
use config::{Config, ConfigError, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Lifetime of a session cookie when none is configured: 30 days.
pub const DEFAULT_SESSION_MAX_AGE: i64 = 30 * 24 * 60 * 60;

/// Errors raised while loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The file did not exist; a template was written in its place.
    #[error("configure the settings in the configfile {}", .0.display())]
    Created(PathBuf),
    /// The template could not be written.
    #[error("error creating configfile {}: {source}", .path.display())]
    Write {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying io error.
        source: std::io::Error,
    },
    /// The file exists but is not a valid configuration.
    #[error("error parsing configfile: {0}")]
    Parse(#[from] ConfigError),
    /// The file parsed but holds unusable values.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// This configuration object contains the webserver config.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Webserver {
    /// Port to listen on.
    pub port: i64,
    /// Address to bind to.
    #[serde(default = "default_address")]
    pub address: String,
    /// Secret used to sign the session cookies.
    pub secretsessionkey: String,
    /// Name of the session cookie.
    pub sessionname: String,
    /// Shared key expected in the `Authorization` header of the auth routes.
    #[serde(default)]
    pub apikey: Option<String>,
    /// Whether the session cookie carries the `Secure` attribute.
    #[serde(default)]
    pub securecookie: bool,
    /// Seconds a login stays valid.
    #[serde(default = "default_session_max_age")]
    pub sessionmaxage: i64,
    /// Root of the static assets, holding `login/` and `dashboard/`.
    #[serde(default = "default_static_dir")]
    pub staticdir: PathBuf,
}

/// This configuration object contains the database config.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Database {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: i64,
    /// Database user.
    pub username: String,
    /// Password of the database user.
    pub password: String,
    /// Name of the database holding the `accounts` table.
    pub databasename: String,
    /// Maximum number of connections to the database.
    #[serde(default = "default_max_connections")]
    pub maxconnections: u32,
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("./static")
}

fn default_session_max_age() -> i64 {
    DEFAULT_SESSION_MAX_AGE
}

fn default_max_connections() -> u32 {
    20
}

impl Default for Webserver {
    fn default() -> Self {
        Webserver {
            port: 0,
            address: default_address(),
            secretsessionkey: String::new(),
            sessionname: String::new(),
            apikey: None,
            securecookie: false,
            sessionmaxage: default_session_max_age(),
            staticdir: default_static_dir(),
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Database {
            host: String::new(),
            port: 0,
            username: String::new(),
            password: String::new(),
            databasename: String::new(),
            maxconnections: default_max_connections(),
        }
    }
}

/// This structure contains all the config parameters of the app.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Settings related to the webserver and sessions.
    pub webserver: Webserver,
    /// Settings related to the database.
    pub database: Database,
}

impl Settings {
    /// Loads the configuration from the JSON file at `path`.
    ///
    /// A missing file is replaced by a template with empty values and
    /// reported as [`SettingsError::Created`], so the operator can fill it in
    /// before the next run.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            write_template(path)?;
            return Err(SettingsError::Created(path.to_path_buf()));
        }

        let settings: Settings = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Json))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Port to listen on, once validated.
    pub fn port(&self) -> u16 {
        u16::try_from(self.webserver.port).unwrap_or_default()
    }

    /// The API key, if one is configured. An empty key disables the check.
    pub fn api_key(&self) -> Option<&str> {
        self.webserver.apikey.as_deref().filter(|key| !key.is_empty())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if !(1..=i64::from(u16::MAX)).contains(&self.webserver.port) {
            return Err(SettingsError::Invalid(format!(
                "webserver.port must be between 1 and 65535, got {}",
                self.webserver.port
            )));
        }
        if self.webserver.sessionname.is_empty() {
            return Err(SettingsError::Invalid(
                "webserver.sessionname must not be empty".to_string(),
            ));
        }
        if self.webserver.secretsessionkey.is_empty() {
            return Err(SettingsError::Invalid(
                "webserver.secretsessionkey must not be empty".to_string(),
            ));
        }
        if self.webserver.sessionmaxage <= 0 {
            return Err(SettingsError::Invalid(format!(
                "webserver.sessionmaxage must be positive, got {}",
                self.webserver.sessionmaxage
            )));
        }
        if u16::try_from(self.database.port).is_err() {
            return Err(SettingsError::Invalid(format!(
                "database.port must be between 0 and 65535, got {}",
                self.database.port
            )));
        }
        Ok(())
    }
}

fn write_template(path: &Path) -> Result<(), SettingsError> {
    let to_write_error = |source: std::io::Error| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    };
    let template = serde_json::to_string_pretty(&Settings::default())
        .map_err(|e| to_write_error(e.into()))?;
    std::fs::write(path, template).map_err(to_write_error)?;
    tracing::warn!("created configuration template at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn secret() -> String {
        "changeme".to_string()
    }

    fn write_json(dir: &tempfile::TempDir, value: serde_json::Value) -> PathBuf {
        let path = dir.path().join("config.json");
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    fn valid_config() -> serde_json::Value {
        json!({
            "webserver": {
                "port": 8080,
                "secretsessionkey": secret(),
                "sessionname": "brogains",
                "apikey": "letmein"
            },
            "database": {
                "host": "localhost",
                "port": 5432,
                "username": "brogains",
                "password": "hunter2",
                "databasename": "brogains"
            }
        })
    }

    #[test]
    fn should_write_template_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Created(_)));
        assert!(path.exists());

        // The template parses but still needs to be filled in.
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[test]
    fn should_reject_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ \"webserver\": ").unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn should_load_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(&dir, valid_config());

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.port(), 8080);
        assert_eq!(settings.webserver.sessionname, "brogains");
        assert_eq!(settings.api_key(), Some("letmein"));
        assert_eq!(settings.webserver.address, "0.0.0.0");
        assert_eq!(settings.webserver.staticdir, PathBuf::from("./static"));
        assert_eq!(settings.database.maxconnections, 20);
        assert!(!settings.webserver.securecookie);
        assert_eq!(settings.webserver.sessionmaxage, DEFAULT_SESSION_MAX_AGE);
    }

    #[test]
    fn should_treat_empty_api_key_as_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = valid_config();
        config["webserver"]["apikey"] = json!("");
        let path = write_json(&dir, config);

        assert_eq!(Settings::load(&path).unwrap().api_key(), None);
    }

    #[test]
    fn should_reject_out_of_range_port() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = valid_config();
        config["webserver"]["port"] = json!(70000);
        let path = write_json(&dir, config);

        assert!(matches!(
            Settings::load(&path).unwrap_err(),
            SettingsError::Invalid(_)
        ));
    }

    #[test]
    fn should_reject_empty_secret() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = valid_config();
        config["webserver"]["secretsessionkey"] = json!("");
        let path = write_json(&dir, config);

        assert!(matches!(
            Settings::load(&path).unwrap_err(),
            SettingsError::Invalid(_)
        ));
    }

    #[test]
    fn should_reject_non_positive_session_max_age() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = valid_config();
        config["webserver"]["sessionmaxage"] = json!(0);
        let path = write_json(&dir, config);

        assert!(matches!(
            Settings::load(&path).unwrap_err(),
            SettingsError::Invalid(_)
        ));
    }
}
