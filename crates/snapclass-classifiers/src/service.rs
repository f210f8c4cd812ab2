//! Inference service: bytes in, ranked predictions out
//!
//! The service owns the single shared classifier instance and the label
//! table. It is constructed once at startup and handed to request handlers
//! behind an `Arc`. If the model cannot be acquired the service stays up in
//! degraded mode and every `classify` call fails fast.

use crate::classifier::ImageClassifier;
use crate::labels::LabelTable;
use crate::model_loader::{ModelConfig, ResnetClassifier};
use crate::preprocess::Preprocess;
use crate::ranking;
use snapclass_core::{Analysis, ClassificationResult, Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Default number of predictions returned per request
pub const DEFAULT_TOP_K: usize = 5;

/// Keywords for the `is_animal` annotation
pub const DEFAULT_ANIMAL_KEYWORDS: &[&str] = &["tiger", "cat", "dog", "lion", "bear", "animal"];

/// Tunables for the inference service
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Number of classes to report; values below 1 are treated as 1
    pub top_k: usize,

    /// Lowercase substrings that mark a label as an animal
    pub animal_keywords: Vec<String>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            animal_keywords: DEFAULT_ANIMAL_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Lifecycle state after initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Ready,
    Degraded { reason: String },
}

enum Backend {
    Ready(Arc<dyn ImageClassifier>),
    Degraded(String),
}

/// Shared image classification service
pub struct InferenceService {
    backend: Backend,
    labels: Arc<LabelTable>,
    options: ServiceOptions,
}

impl InferenceService {
    /// Acquire the pretrained model described by `model`.
    ///
    /// Never fails: a model that cannot be loaded leaves the service in
    /// degraded mode. Blocks while weights are downloaded and mapped.
    pub fn initialize(labels: Arc<LabelTable>, model: &ModelConfig, options: ServiceOptions) -> Self {
        info!("Initializing inference service");
        match ResnetClassifier::load(model) {
            Ok(classifier) => Self::with_classifier(labels, Arc::new(classifier), options),
            Err(e) => {
                error!("Model initialization failed: {}", e);
                warn!("Inference service running in degraded mode, /predict is unavailable");
                Self::degraded(labels, e.to_string(), options)
            }
        }
    }

    /// Wrap an already constructed classifier
    pub fn with_classifier(
        labels: Arc<LabelTable>,
        classifier: Arc<dyn ImageClassifier>,
        options: ServiceOptions,
    ) -> Self {
        if classifier.num_classes() != labels.len() {
            warn!(
                "Model {} has {} classes but the label table has {} entries",
                classifier.name(),
                classifier.num_classes(),
                labels.len()
            );
        }
        Self {
            backend: Backend::Ready(classifier),
            labels,
            options,
        }
    }

    /// A service whose model is unavailable
    pub fn degraded(labels: Arc<LabelTable>, reason: impl Into<String>, options: ServiceOptions) -> Self {
        Self {
            backend: Backend::Degraded(reason.into()),
            labels,
            options,
        }
    }

    pub fn state(&self) -> ServiceState {
        match &self.backend {
            Backend::Ready(_) => ServiceState::Ready,
            Backend::Degraded(reason) => ServiceState::Degraded {
                reason: reason.clone(),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.backend, Backend::Ready(_))
    }

    /// Name of the loaded model
    pub fn model_name(&self) -> Option<&str> {
        match &self.backend {
            Backend::Ready(classifier) => Some(classifier.name()),
            Backend::Degraded(_) => None,
        }
    }

    /// Device the loaded model runs on
    pub fn device_name(&self) -> Option<String> {
        match &self.backend {
            Backend::Ready(classifier) => Some(device_label(classifier.device())),
            Backend::Degraded(_) => None,
        }
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Classify an encoded image.
    ///
    /// Every failure is returned as a failed [`ClassificationResult`].
    pub async fn classify(&self, bytes: &[u8]) -> ClassificationResult {
        let start = Instant::now();
        let result = match self.run(bytes, start).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Classification failed: {}", e);
                ClassificationResult::from_error(&e)
            }
        };

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let outcome = result.kind().map(|k| k.as_str()).unwrap_or("success");
        metrics::counter!("snapclass_classifications_total", "outcome" => outcome).increment(1);
        metrics::histogram!("snapclass_inference_latency_ms").record(elapsed_ms);
        debug!("Classification finished in {:.2}ms ({})", elapsed_ms, outcome);

        result
    }

    async fn run(&self, bytes: &[u8], start: Instant) -> Result<ClassificationResult> {
        let classifier = match &self.backend {
            Backend::Ready(classifier) => classifier,
            Backend::Degraded(reason) => return Err(Error::initialization(reason.clone())),
        };

        let image = Preprocess::decode(bytes)?;
        let input = classifier.preprocess().apply(&image, classifier.device())?;
        drop(image);

        let scores = classifier.scores(input).await?;
        let probs = ranking::probabilities(&scores, classifier.output())?;
        if probs.is_empty() {
            return Err(Error::inference("model returned an empty distribution"));
        }

        let top = ranking::top_k(&probs, self.options.top_k.max(1));
        let predictions = ranking::rank(&top, &self.labels);

        let top_prediction = predictions
            .first()
            .ok_or_else(|| Error::inference("no predictions produced"))?;
        let analysis = Analysis {
            is_animal: self.is_animal(&top_prediction.class_name),
            top_confidence: top_prediction.confidence,
            total_classes_available: self.labels.len(),
        };
        info!(
            "Top prediction: {} ({:.2}%)",
            top_prediction.class_name, top_prediction.confidence
        );

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        ClassificationResult::success(
            predictions,
            analysis,
            classifier.name(),
            device_label(classifier.device()),
            latency_ms,
        )
        .ok_or_else(|| Error::inference("no predictions produced"))
    }

    /// Textual keyword match; not a guarantee the image shows an animal
    fn is_animal(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        self.options
            .animal_keywords
            .iter()
            .any(|keyword| label.contains(keyword.to_lowercase().as_str()))
    }
}

fn device_label(device: &candle_core::Device) -> String {
    match device {
        candle_core::Device::Cpu => "cpu".to_string(),
        candle_core::Device::Cuda(_) => "cuda".to_string(),
        candle_core::Device::Metal(_) => "metal".to_string(),
    }
}
