//! Core types for SnapClass

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// A single ranked class prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Index into the model's output distribution
    pub class_id: usize,

    /// Human-readable label resolved from the label table
    pub class_name: String,

    /// Probability as a percentage in [0, 100], rounded to 2 decimals
    pub confidence: f64,

    /// 1-based position in the ranking
    pub rank: usize,
}

/// Convenience annotations attached to a successful classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Whether the top label textually matches an animal keyword.
    ///
    /// Substring match against English keywords only. Not a classification.
    pub is_animal: bool,

    /// Confidence of the top prediction
    pub top_confidence: f64,

    /// Number of labels known to the label table
    pub total_classes_available: usize,
}

/// Failure category reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InitializationError,
    DecodeError,
    OversizeError,
    TransformError,
    InferenceError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitializationError => "initialization_error",
            Self::DecodeError => "decode_error",
            Self::OversizeError => "oversize_error",
            Self::TransformError => "transform_error",
            Self::InferenceError => "inference_error",
        }
    }

    /// Short message shown next to the underlying error
    fn user_message(&self) -> &'static str {
        match self {
            Self::InitializationError => "model unavailable, the service is running in degraded mode",
            Self::DecodeError => "classification failed, please check the image format",
            Self::OversizeError => "image is too large",
            Self::TransformError => "classification failed while preparing the image",
            Self::InferenceError => "classification failed while running the model",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a successful classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSuccess {
    pub success: bool,

    /// Top-k predictions, best first
    pub predictions: Vec<Prediction>,

    /// Same entry as `predictions[0]`
    pub top_prediction: Prediction,

    pub analysis: Analysis,

    pub message: String,

    /// Model architecture name
    pub model: String,

    /// Device the forward pass ran on
    pub device: String,

    /// Wall time spent inside the inference service
    pub latency_ms: f64,
}

/// Payload of a failed classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationFailure {
    pub success: bool,

    pub kind: ErrorKind,

    /// Underlying error text
    pub error: String,

    pub message: String,
}

/// Outcome of one classification request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassificationResult {
    Success(ClassificationSuccess),
    Failure(ClassificationFailure),
}

impl ClassificationResult {
    /// Build a success result. `predictions` must be non-empty.
    pub fn success(
        predictions: Vec<Prediction>,
        analysis: Analysis,
        model: impl Into<String>,
        device: impl Into<String>,
        latency_ms: f64,
    ) -> Option<Self> {
        let top_prediction = predictions.first()?.clone();
        Some(Self::Success(ClassificationSuccess {
            success: true,
            predictions,
            top_prediction,
            analysis,
            message: "classification succeeded".to_string(),
            model: model.into(),
            device: device.into(),
            latency_ms,
        }))
    }

    /// Build a failure result of the given kind
    pub fn failure(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self::Failure(ClassificationFailure {
            success: false,
            kind,
            error: error.into(),
            message: kind.user_message().to_string(),
        })
    }

    /// Convert a pipeline error into a failure result.
    ///
    /// Errors outside the request path are reported as inference errors.
    pub fn from_error(err: &Error) -> Self {
        let kind = err.kind().unwrap_or(ErrorKind::InferenceError);
        Self::failure(kind, err.to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Failure kind, `None` on success
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }

    pub fn predictions(&self) -> &[Prediction] {
        match self {
            Self::Success(success) => &success.predictions,
            Self::Failure(_) => &[],
        }
    }
}
