//! Classifier trait for pretrained image models

use crate::preprocess::Preprocess;
use crate::ranking::OutputKind;
use async_trait::async_trait;
use candle_core::{Device, Tensor};
use snapclass_core::Result;

/// A pretrained image classification model.
///
/// Implementations are read-only after construction and must tolerate
/// concurrent `scores` calls from many request handlers.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Run the forward pass on a preprocessed `[1, 3, H, W]` batch.
    ///
    /// Returns a `[1, num_classes]` tensor of logits or probabilities,
    /// as reported by [`ImageClassifier::output`].
    async fn scores(&self, input: Tensor) -> Result<Tensor>;

    /// Get the model name
    fn name(&self) -> &str;

    /// Number of classes in the output distribution
    fn num_classes(&self) -> usize;

    /// Whether `scores` returns logits or probabilities
    fn output(&self) -> OutputKind {
        OutputKind::Logits
    }

    /// Device inputs must be placed on
    fn device(&self) -> &Device;

    /// Transform matching the model's training distribution
    fn preprocess(&self) -> &Preprocess;
}
