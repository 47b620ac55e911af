use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid file name: {0}")]
    InvalidFilename(String),

    #[error("File '{0}' was not found.")]
    NotFound(String),

    #[error("'{0}' is a directory.")]
    IsDirectory(String),

    #[error("File '{0}' cannot be accessed.")]
    PermissionDenied(String),

    #[error("File {0} already exists.")]
    AlreadyExists(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("An error occurred during JSON serialization/deserialization: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(path),
            _ => StorageError::Io { path, source },
        }
    }
}
