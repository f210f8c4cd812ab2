//! SnapClass Core
//!
//! Core types and error handling shared across SnapClass components.
//!
//! This crate provides:
//! - The error type used by the classification pipeline
//! - Serializable prediction and classification result types

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Analysis, ClassificationFailure, ClassificationResult, ClassificationSuccess, ErrorKind, Prediction};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{Analysis, ClassificationResult, ErrorKind, Prediction};
}
