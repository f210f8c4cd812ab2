//! Latency benchmarks for the request path outside the forward pass
//!
//! Covers decoding, the ImageNet transform, and softmax + top-k ranking,
//! which together bound the overhead added around the model itself.
//!
//! Run with: cargo bench -p snapclass-classifiers

use candle_core::{Device, Tensor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

use snapclass_classifiers::ranking::{probabilities, rank, top_k};
use snapclass_classifiers::{LabelTable, OutputKind, Preprocess};

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 64]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buf, ImageFormat::Jpeg)
        .expect("Failed to encode benchmark image");
    buf.into_inner()
}

/// Benchmark decode + resize/crop/normalize for common upload sizes
fn benchmark_preprocess(c: &mut Criterion) {
    let preprocess = Preprocess::imagenet();
    let test_cases = vec![
        ("small_320x240", jpeg(320, 240)),
        ("medium_1024x768", jpeg(1024, 768)),
        ("large_3000x2000", jpeg(3000, 2000)),
    ];

    let mut group = c.benchmark_group("Preprocess");
    group.sample_size(20);

    for (name, bytes) in &test_cases {
        group.bench_with_input(BenchmarkId::new("decode_and_apply", name), bytes, |b, bytes| {
            b.iter(|| {
                let image = Preprocess::decode(black_box(bytes)).unwrap();
                preprocess.apply(&image, &Device::Cpu).unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark softmax and top-5 over ImageNet-sized outputs
fn benchmark_ranking(c: &mut Criterion) {
    let logits: Vec<f32> = (0..1000).map(|i| ((i * 7919) % 1000) as f32 / 100.0).collect();
    let tensor = Tensor::new(logits.as_slice(), &Device::Cpu)
        .and_then(|t| t.unsqueeze(0))
        .expect("Failed to build logits tensor");
    let labels = LabelTable::from_labels((0..1000).map(|i| format!("class {}", i)).collect());

    let mut group = c.benchmark_group("Ranking");
    group.sample_size(100);

    group.bench_function("softmax_top5_rank", |b| {
        b.iter(|| {
            let probs = probabilities(black_box(&tensor), OutputKind::Logits).unwrap();
            rank(&top_k(&probs, 5), &labels)
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_preprocess, benchmark_ranking);
criterion_main!(benches);
