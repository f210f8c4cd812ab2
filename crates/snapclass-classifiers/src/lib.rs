//! SnapClass Classifiers
//!
//! Image classification on top of pretrained Candle models.
//!
//! The request path is:
//! - decode the uploaded bytes and apply the model's preprocessing transform
//! - run the forward pass of the shared [`ImageClassifier`]
//! - softmax, top-k selection, and label resolution through the [`LabelTable`]
//!
//! [`InferenceService`] ties these together and converts every failure into a
//! structured `ClassificationResult`.

pub mod classifier;
pub mod labels;
pub mod model_loader;
pub mod preprocess;
pub mod ranking;
pub mod service;

pub use classifier::ImageClassifier;
pub use labels::{LabelSource, LabelTable, LoadError};
pub use model_loader::{Architecture, DeviceType, ModelConfig, ModelSource, ResnetClassifier};
pub use preprocess::Preprocess;
pub use ranking::OutputKind;
pub use service::{InferenceService, ServiceOptions, ServiceState};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::ImageClassifier;
    pub use crate::labels::LabelTable;
    pub use crate::model_loader::{DeviceType, ModelConfig};
    pub use crate::service::{InferenceService, ServiceOptions};
}
