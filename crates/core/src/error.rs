use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManscopeError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("{0}")]
    Extraction(String),
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid artifact key: {0:?}")]
    InvalidKey(String),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ManscopeError {
    /// Classifies an I/O failure on `path` into the error taxonomy.
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => ManscopeError::NotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => {
                ManscopeError::PermissionDenied(path.to_path_buf())
            }
            _ => ManscopeError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ManscopeError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ManscopeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_classified_by_kind() {
        let path = Path::new("/tmp/missing");

        let err = ManscopeError::from_io(path, std::io::ErrorKind::NotFound.into());
        assert!(err.is_not_found());

        let err = ManscopeError::from_io(path, std::io::ErrorKind::PermissionDenied.into());
        assert!(matches!(err, ManscopeError::PermissionDenied(p) if p == path));

        let err = ManscopeError::from_io(path, std::io::ErrorKind::InvalidData.into());
        assert!(matches!(err, ManscopeError::Io { .. }));
    }
}
