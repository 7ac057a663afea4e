use std::fmt;

/// Result type for hindsight-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the engine layer
#[derive(Debug)]
pub enum Error {
    /// Index layer error during retrieval
    Index(hindsight_index::Error),

    /// A candidate source failed to produce suggestions
    Retrieval(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Index(err) => write!(f, "Index error: {}", err),
            Error::Retrieval(msg) => write!(f, "Retrieval error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Index(err) => Some(err),
            Error::Retrieval(_) => None,
        }
    }
}

impl From<hindsight_index::Error> for Error {
    fn from(err: hindsight_index::Error) -> Self {
        Error::Index(err)
    }
}
