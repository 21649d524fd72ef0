use thiserror::Error;

/// Failure reported by a scene collaborator while loading or preparing a frame
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SceneError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to decode {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Failure while reading an override source
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("malformed percent escape in query: {0}")]
    MalformedEscape(String),

    #[error("query string is not valid UTF-8 after decoding")]
    InvalidUtf8,

    #[error("override variable {0} is not valid unicode")]
    NotUnicode(String),
}

/// Failure while constructing a player
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlayerError {
    #[error("no model loader supplied and the prepare/swap pair is incomplete")]
    MissingLoader,

    #[error("no tokio runtime available to run playback on")]
    NoRuntime,
}
