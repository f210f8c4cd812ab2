//! ML Classifier Integration Tests
//!
//! Tests for the Candle ResNet classifier using real weights from HuggingFace.
//! These tests require the `ml-models` feature flag and network access, so
//! they are ignored by default. Run with `cargo test -- --ignored`.

#![cfg(feature = "ml-models")]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use snapclass_classifiers::{
    ImageClassifier, InferenceService, LabelTable, ModelConfig, ResnetClassifier, ServiceOptions,
};
use std::io::Cursor;
use std::sync::Arc;

fn model_config() -> ModelConfig {
    serde_yaml::from_str(
        r#"
architecture: resnet18
source:
  type: huggingface
  repo: "lmz/candle-resnet"
device: cpu
"#,
    )
    .unwrap()
}

fn test_jpeg() -> Vec<u8> {
    let image = RgbImage::from_fn(500, 375, |x, y| {
        Rgb([(x * 255 / 500) as u8, (y * 255 / 375) as u8, 90])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buf, ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}

#[test]
#[ignore = "downloads ResNet18 weights"]
fn test_load_resnet18() {
    let classifier = ResnetClassifier::load(&model_config());
    assert!(classifier.is_ok(), "Failed to load resnet18: {:?}", classifier.err());

    let classifier = classifier.unwrap();
    assert_eq!(classifier.name(), "ResNet18");
    assert_eq!(classifier.num_classes(), 1000);
    assert!(classifier.weights_path().exists());
}

#[tokio::test]
#[ignore = "downloads ResNet18 weights"]
async fn test_resnet18_top5() {
    let service = InferenceService::initialize(
        Arc::new(LabelTable::fallback()),
        &model_config(),
        ServiceOptions::default(),
    );
    assert!(service.is_ready());

    let result = service.classify(&test_jpeg()).await;
    let predictions = result.predictions();

    assert!(result.is_success());
    assert_eq!(predictions.len(), 5);
    assert_eq!(predictions.iter().map(|p| p.rank).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    for p in predictions {
        assert!((0.0..=100.0).contains(&p.confidence));
        assert!(p.class_id < 1000);
    }
}
