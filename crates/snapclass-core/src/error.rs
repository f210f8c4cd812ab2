//! Error types for SnapClass

use crate::types::ErrorKind;

/// Result type alias using SnapClass's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for SnapClass operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The pretrained model could not be acquired
    #[error("model unavailable: {0}")]
    Initialization(String),

    /// Input bytes are not a decodable image
    #[error("cannot decode image: {0}")]
    Decode(String),

    /// Upload exceeds the configured size ceiling
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    Oversize { size: usize, limit: usize },

    /// Preprocessing (resize/crop/normalize) failed
    #[error("preprocessing failed: {0}")]
    Transform(String),

    /// Forward pass or output post-processing failed
    #[error("inference failed: {0}")]
    Inference(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new initialization error
    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Create a new decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new transform error
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classification failure kind, if this error belongs to the request path
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Initialization(_) => Some(ErrorKind::InitializationError),
            Self::Decode(_) => Some(ErrorKind::DecodeError),
            Self::Oversize { .. } => Some(ErrorKind::OversizeError),
            Self::Transform(_) => Some(ErrorKind::TransformError),
            Self::Inference(_) => Some(ErrorKind::InferenceError),
            Self::Config(_) | Self::Io(_) | Self::Serialization(_) => None,
        }
    }
}
