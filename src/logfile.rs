use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while setting up the log file.
#[derive(Debug, thiserror::Error)]
pub enum LogfileError {
    /// The directory meant to hold the log file is missing.
    #[error("logfile error: directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),
    /// The log file could not be created or opened.
    #[error("error creating logfile {}: {source}", .path.display())]
    Open {
        /// Path of the log file.
        path: PathBuf,
        /// Underlying io error.
        source: std::io::Error,
    },
}

/// Opens the log file at `path` for appending, creating it if needed.
///
/// Fails if the parent directory does not exist.
pub fn open(path: &Path) -> Result<File, LogfileError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        return Err(LogfileError::MissingDirectory(dir.to_path_buf()));
    }

    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o640);
    }
    options.open(path).map_err(|source| LogfileError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Opens the log file and installs it as the output of the global `tracing`
/// subscriber.
pub fn init(path: &Path) -> Result<(), LogfileError> {
    let file = Mutex::new(open(path)?);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file),
        )
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_fail_when_directory_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("logfile.log");

        let err = open(&path).unwrap_err();
        assert!(matches!(err, LogfileError::MissingDirectory(_)));
    }

    #[test]
    fn should_create_and_reopen_logfile() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logfile.log");

        let mut file = open(&path).unwrap();
        writeln!(file, "first").unwrap();
        let mut file = open(&path).unwrap();
        writeln!(file, "second").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }
}
