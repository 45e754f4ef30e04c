use thiserror::Error;

/// Errors raised by hardware sources.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Hardware root not usable: {0}")]
    RootNotFound(String),

    #[error("Hardware source is not open")]
    NotOpen,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("statvfs failed for {path}: {source}")]
    Statvfs {
        path: String,
        #[source]
        source: nix::Error,
    },

    #[error("Snapshot unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    /// Create a read error for a path.
    pub fn read(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.display().to_string(),
            source,
        }
    }

    /// Create a parse error for a path.
    pub fn parse(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias using the hardware source [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
