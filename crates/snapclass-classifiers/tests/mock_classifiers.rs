//! Mock classifiers for testing
//!
//! Provides configurable mock implementations of the ImageClassifier trait
//! for exercising the inference service end-to-end without model weights.

use async_trait::async_trait;
use candle_core::{Device, Tensor};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use snapclass_classifiers::{
    ImageClassifier, InferenceService, LabelTable, OutputKind, Preprocess, ServiceOptions,
};
use snapclass_core::{ClassificationResult, Error, ErrorKind, Result};
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A classifier that returns fixed scores regardless of input
pub struct MockClassifier {
    name: String,
    scores: Vec<f32>,
    output: OutputKind,
    device: Device,
    preprocess: Preprocess,
    call_count: AtomicU32,
}

impl MockClassifier {
    /// Create a mock returning the given logits
    pub fn new(name: &str, scores: Vec<f32>) -> Self {
        Self {
            name: name.to_string(),
            scores,
            output: OutputKind::Logits,
            device: Device::Cpu,
            preprocess: Preprocess::imagenet(),
            call_count: AtomicU32::new(0),
        }
    }

    /// Report the scores as probabilities instead of logits
    pub fn with_probabilities(mut self) -> Self {
        self.output = OutputKind::Probabilities;
        self
    }

    /// Get the number of times scores was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ImageClassifier for MockClassifier {
    async fn scores(&self, input: Tensor) -> Result<Tensor> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        assert_eq!(input.dims(), &[1, 3, 224, 224]);

        Tensor::new(self.scores.as_slice(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::inference(e.to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn num_classes(&self) -> usize {
        self.scores.len()
    }

    fn output(&self) -> OutputKind {
        self.output
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn preprocess(&self) -> &Preprocess {
        &self.preprocess
    }
}

/// A classifier that always fails - for testing error paths
pub struct FailingClassifier {
    device: Device,
    preprocess: Preprocess,
}

impl FailingClassifier {
    pub fn new() -> Self {
        Self {
            device: Device::Cpu,
            preprocess: Preprocess::imagenet(),
        }
    }
}

#[async_trait]
impl ImageClassifier for FailingClassifier {
    async fn scores(&self, _input: Tensor) -> Result<Tensor> {
        Err(Error::inference("Simulated forward pass failure"))
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn num_classes(&self) -> usize {
        0
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn preprocess(&self) -> &Preprocess {
        &self.preprocess
    }
}

fn labels(count: usize) -> Arc<LabelTable> {
    let mut names: Vec<String> = (0..count).map(|i| format!("class {}", i)).collect();
    if count > 3 {
        names[3] = "tabby cat".to_string();
    }
    Arc::new(LabelTable::from_labels(names))
}

fn encoded_image(format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_fn(320, 240, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image).write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn logits() -> Vec<f32> {
    vec![0.5, 1.0, 2.0, 6.0, 3.0, 0.1, 4.0, -1.0, 2.5, 0.0]
}

#[tokio::test]
async fn test_jpeg_end_to_end() {
    let classifier = Arc::new(MockClassifier::new("mock-resnet", logits()));
    let service = InferenceService::with_classifier(labels(10), classifier.clone(), ServiceOptions::default());

    let result = service.classify(&encoded_image(ImageFormat::Jpeg)).await;

    let success = match &result {
        ClassificationResult::Success(s) => s,
        ClassificationResult::Failure(f) => panic!("classification failed: {}", f.error),
    };
    assert!(success.success);
    assert_eq!(success.predictions.len(), 5);
    assert_eq!(
        success.predictions.iter().map(|p| p.rank).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    assert_eq!(
        success.predictions.iter().map(|p| p.class_id).collect::<Vec<_>>(),
        vec![3, 6, 4, 8, 2]
    );
    for p in &success.predictions {
        assert!((0.0..=100.0).contains(&p.confidence));
    }
    for pair in success.predictions.windows(2) {
        assert!(pair[0].confidence > pair[1].confidence);
    }
    assert_eq!(success.top_prediction, success.predictions[0]);
    assert_eq!(success.top_prediction.class_name, "tabby cat");
    assert!(success.analysis.is_animal);
    assert_eq!(success.analysis.top_confidence, success.top_prediction.confidence);
    assert_eq!(success.analysis.total_classes_available, 10);
    assert_eq!(success.model, "mock-resnet");
    assert_eq!(success.device, "cpu");
    assert_eq!(classifier.call_count(), 1);
}

#[tokio::test]
async fn test_png_input_is_accepted() {
    let classifier = Arc::new(MockClassifier::new("mock", logits()));
    let service = InferenceService::with_classifier(labels(10), classifier, ServiceOptions::default());

    let result = service.classify(&encoded_image(ImageFormat::Png)).await;
    assert!(result.is_success());
}

#[tokio::test]
async fn test_corrupted_bytes_are_decode_error() {
    let classifier = Arc::new(MockClassifier::new("mock", logits()));
    let service = InferenceService::with_classifier(labels(10), classifier.clone(), ServiceOptions::default());

    let mut bytes = encoded_image(ImageFormat::Jpeg);
    bytes.truncate(16);

    for payload in [b"not an image at all".to_vec(), bytes, Vec::new()] {
        let result = service.classify(&payload).await;
        assert!(!result.is_success());
        assert_eq!(result.kind(), Some(ErrorKind::DecodeError));
    }
    assert_eq!(classifier.call_count(), 0);
}

#[tokio::test]
async fn test_forward_failure_is_inference_error() {
    let service = InferenceService::with_classifier(
        labels(10),
        Arc::new(FailingClassifier::new()),
        ServiceOptions::default(),
    );

    let result = service.classify(&encoded_image(ImageFormat::Png)).await;
    assert_eq!(result.kind(), Some(ErrorKind::InferenceError));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("Simulated"));
}

#[tokio::test]
async fn test_fewer_classes_than_k() {
    let classifier = Arc::new(MockClassifier::new("tiny", vec![1.0, 3.0, 2.0]));
    let service = InferenceService::with_classifier(labels(3), classifier, ServiceOptions::default());

    let result = service.classify(&encoded_image(ImageFormat::Png)).await;
    let predictions = result.predictions();
    assert_eq!(predictions.len(), 3);
    assert_eq!(predictions.iter().map(|p| p.class_id).collect::<Vec<_>>(), vec![1, 2, 0]);
}

#[tokio::test]
async fn test_probability_output_and_ties() {
    let classifier = Arc::new(
        MockClassifier::new("probs", vec![0.1, 0.3, 0.1, 0.3, 0.2]).with_probabilities(),
    );
    let service = InferenceService::with_classifier(labels(5), classifier, ServiceOptions::default());

    let result = service.classify(&encoded_image(ImageFormat::Png)).await;
    let predictions = result.predictions();
    assert_eq!(predictions.iter().map(|p| p.class_id).collect::<Vec<_>>(), vec![1, 3, 4, 0, 2]);
    assert_eq!(predictions[0].confidence, 30.0);
    assert_eq!(predictions[2].confidence, 20.0);
}

#[tokio::test]
async fn test_labels_shorter_than_model_output() {
    // 10 model classes but only 2 labels: out-of-range indices get placeholders
    let classifier = Arc::new(MockClassifier::new("mock", logits()));
    let service = InferenceService::with_classifier(labels(2), classifier, ServiceOptions::default());

    let result = service.classify(&encoded_image(ImageFormat::Png)).await;
    let predictions = result.predictions();
    assert_eq!(predictions.len(), 5);
    assert!(predictions[0].class_name.contains('3'));
}

#[tokio::test]
async fn test_custom_top_k() {
    let classifier = Arc::new(MockClassifier::new("mock", logits()));
    let options = ServiceOptions {
        top_k: 2,
        ..Default::default()
    };
    let service = InferenceService::with_classifier(labels(10), classifier, options);

    let result = service.classify(&encoded_image(ImageFormat::Png)).await;
    assert_eq!(result.predictions().len(), 2);
}

#[tokio::test]
async fn test_zero_top_k_still_returns_best_class() {
    let classifier = Arc::new(MockClassifier::new("mock", logits()));
    let options = ServiceOptions {
        top_k: 0,
        ..Default::default()
    };
    let service = InferenceService::with_classifier(labels(10), classifier, options);

    let result = service.classify(&encoded_image(ImageFormat::Png)).await;
    assert!(result.is_success());
    let predictions = result.predictions();
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0].class_id, 3);
    assert_eq!(predictions[0].rank, 1);
}

fn strip_png(width: u32, height: u32) -> Vec<u8> {
    let image = image::GrayImage::from_fn(width, height, |_, y| image::Luma([(y % 256) as u8]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(image).write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

#[tokio::test]
async fn test_extreme_aspect_ratio_uploads_are_bounded() {
    let classifier = Arc::new(MockClassifier::new("mock", logits()));
    let service = InferenceService::with_classifier(labels(10), classifier.clone(), ServiceOptions::default());

    // Tall strip within the decode limits: classified from its centered square
    let result = service.classify(&strip_png(2, 12_000)).await;
    assert!(result.is_success());
    assert_eq!(result.predictions().len(), 5);

    // Past the decode limits: rejected as undecodable instead of allocating
    let bytes = strip_png(1, 60_000);
    assert!(bytes.len() < 5 * 1024 * 1024);
    let result = service.classify(&bytes).await;
    assert_eq!(result.kind(), Some(ErrorKind::DecodeError));

    assert_eq!(classifier.call_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_instance() {
    let classifier = Arc::new(MockClassifier::new("shared", logits()));
    let service = Arc::new(InferenceService::with_classifier(
        labels(10),
        classifier.clone(),
        ServiceOptions::default(),
    ));
    let bytes = Arc::new(encoded_image(ImageFormat::Png));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            let bytes = bytes.clone();
            tokio::spawn(async move { service.classify(&bytes).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_success());
    }
    assert_eq!(classifier.call_count(), 8);
}
