//! Top-k selection over a class probability distribution

use crate::labels::LabelTable;
use candle_core::{Tensor, D};
use serde::{Deserialize, Serialize};
use snapclass_core::{Error, Prediction, Result};
use std::cmp::Ordering;

/// What a model's raw output represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Unnormalized scores; softmax is applied before ranking
    Logits,
    /// Already a probability distribution
    Probabilities,
}

/// Flatten a `[1, C]` (or `[C]`) model output into class probabilities
pub fn probabilities(scores: &Tensor, output: OutputKind) -> Result<Vec<f32>> {
    let flatten = || -> candle_core::Result<Vec<f32>> {
        let scores = scores.flatten_all()?.to_dtype(candle_core::DType::F32)?;
        let probs = match output {
            OutputKind::Logits => candle_nn::ops::softmax(&scores, D::Minus1)?,
            OutputKind::Probabilities => scores,
        };
        probs.to_vec1::<f32>()
    };
    flatten().map_err(|e| Error::inference(e.to_string()))
}

/// Indices and probabilities of the `k` most likely classes.
///
/// Sorted by descending probability; equal probabilities keep ascending
/// index order. NaN entries rank below every number.
pub fn top_k(probs: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| compare_desc(a.1, b.1).then(a.0.cmp(&b.0)));
    indexed.truncate(k);
    indexed
}

fn compare_desc(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

/// Probability as a percentage rounded to 2 decimals, clamped to [0, 100]
pub fn to_percent(probability: f32) -> f64 {
    if probability.is_nan() {
        return 0.0;
    }
    let percent = (probability as f64 * 100.0).clamp(0.0, 100.0);
    (percent * 100.0).round() / 100.0
}

/// Turn top-k pairs into ranked predictions with resolved labels
pub fn rank(top: &[(usize, f32)], labels: &LabelTable) -> Vec<Prediction> {
    top.iter()
        .enumerate()
        .map(|(position, &(class_id, probability))| Prediction {
            class_id,
            class_name: labels.resolve(class_id).into_owned(),
            confidence: to_percent(probability),
            rank: position + 1,
        })
        .collect()
}
