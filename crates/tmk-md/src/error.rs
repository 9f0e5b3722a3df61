use std::fmt;

/// Errors returned by price oracles and transaction feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Network or transport failure.
    Transport(String),
    /// The upstream answered with a non-success status.
    Api { status: u16, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// The source has nothing for this asset.
    NotFound(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Transport(msg) => write!(f, "transport error: {msg}"),
            SourceError::Api { status, message } => {
                write!(f, "store api error status={status}: {message}")
            }
            SourceError::Decode(msg) => write!(f, "decode error: {msg}"),
            SourceError::NotFound(what) => write!(f, "not found: {what}"),
        }
    }
}

impl std::error::Error for SourceError {}
