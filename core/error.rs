use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Path Not Found: '{0}'")]
    PathNotFound(PathBuf),

    #[error("Path Not Accessible: '{path}', Error: {source}")]
    PathNotAccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File Read Error: Path '{path}', Error: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid wildcard pattern \"{pattern}\": {reason}")]
    FilterMisconfiguration { pattern: String, reason: String },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("TOML Parsing Error: {0}")]
    TomlParse(String),

    #[error("TOML Serialization Error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON Serialization Error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("YAML Parsing/Serialization Error: {0}")]
    YamlError(#[from] serde_yml::Error),

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File Write Error: Path '{path}', Error: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("WalkDir Error: {0}")]
    WalkDir(String),

    #[error("Chunking Error: {0}")]
    Chunking(String),

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("Read of '{path}' timed out after {timeout:?}")]
    Timeout { path: PathBuf, timeout: Duration },

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Worker Pool Error: {0}")]
    Pool(String),

    #[error("Duration Parsing Error: {0}")]
    DurationParse(String),
}

impl AppError {
    /// Classifies an I/O failure on `path` into the not-found / not-accessible /
    /// generic read taxonomy.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => AppError::PathNotFound(path),
            std::io::ErrorKind::PermissionDenied => AppError::PathNotAccessible { path, source },
            _ => AppError::ReadError { path, source },
        }
    }
}

impl From<globset::Error> for AppError {
    fn from(err: globset::Error) -> Self {
        AppError::FilterMisconfiguration {
            pattern: err.glob().unwrap_or_default().to_string(),
            reason: err.kind().to_string(),
        }
    }
}

impl From<walkdir::Error> for AppError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf());
        match (path, err.into_io_error()) {
            (Some(path), Some(io_err)) => AppError::from_io(path, io_err),
            (_, Some(io_err)) => AppError::Io(io_err),
            (path, None) => AppError::WalkDir(format!(
                "filesystem loop detected at {}",
                path.map(|p| p.display().to_string()).unwrap_or_default()
            )),
        }
    }
}

impl From<parse_duration::parse::Error> for AppError {
    fn from(err: parse_duration::parse::Error) -> Self {
        AppError::DurationParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn io_errors_map_onto_path_taxonomy() {
        let not_found = AppError::from_io("/x", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(matches!(not_found, AppError::PathNotFound(_)));

        let denied = AppError::from_io(
            "/x",
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(denied, AppError::PathNotAccessible { .. }));

        let other = AppError::from_io("/x", io::Error::other("boom"));
        assert!(matches!(other, AppError::ReadError { .. }));
    }
}
