//! Model loading for Candle-based ResNet classifiers

use crate::classifier::ImageClassifier;
use crate::preprocess::Preprocess;
use async_trait::async_trait;
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Func, VarBuilder};
use serde::{Deserialize, Serialize};
use snapclass_core::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Hugging Face repository with Candle-compatible ResNet weights
pub const DEFAULT_WEIGHTS_REPO: &str = "lmz/candle-resnet";

/// Configuration for loading a pretrained classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Network architecture
    #[serde(default)]
    pub architecture: Architecture,

    /// Where the weights come from
    #[serde(default)]
    pub source: ModelSource,

    /// Device to run inference on
    #[serde(default)]
    pub device: DeviceType,

    /// Size of the classification head
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,

    /// Transform applied before the forward pass
    #[serde(default)]
    pub preprocess: Preprocess,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            architecture: Architecture::default(),
            source: ModelSource::default(),
            device: DeviceType::Cpu,
            num_classes: default_num_classes(),
            preprocess: Preprocess::imagenet(),
        }
    }
}

impl ModelConfig {
    /// Create a new model configuration from local path
    pub fn from_local(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSource::Local { path: path.into() },
            ..Default::default()
        }
    }

    /// Create a new model configuration from Hugging Face
    pub fn from_hf(repo: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            source: ModelSource::HuggingFace {
                repo: repo.into(),
                revision: default_revision(),
                filename: Some(filename.into()),
            },
            ..Default::default()
        }
    }

    /// Set architecture
    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }

    /// Set device
    pub fn with_device(mut self, device: DeviceType) -> Self {
        self.device = device;
        self
    }
}

/// Supported ResNet depths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    #[default]
    Resnet18,
    Resnet34,
    Resnet50,
    Resnet101,
    Resnet152,
}

impl Architecture {
    /// Display name reported to clients
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Resnet18 => "ResNet18",
            Self::Resnet34 => "ResNet34",
            Self::Resnet50 => "ResNet50",
            Self::Resnet101 => "ResNet101",
            Self::Resnet152 => "ResNet152",
        }
    }

    /// Weights file name in the default repository
    pub fn weights_file(&self) -> &'static str {
        match self {
            Self::Resnet18 => "resnet18.safetensors",
            Self::Resnet34 => "resnet34.safetensors",
            Self::Resnet50 => "resnet50.safetensors",
            Self::Resnet101 => "resnet101.safetensors",
            Self::Resnet152 => "resnet152.safetensors",
        }
    }

    fn build(&self, num_classes: usize, vb: VarBuilder<'static>) -> candle_core::Result<Func<'static>> {
        use candle_transformers::models::resnet;
        match self {
            Self::Resnet18 => resnet::resnet18(num_classes, vb),
            Self::Resnet34 => resnet::resnet34(num_classes, vb),
            Self::Resnet50 => resnet::resnet50(num_classes, vb),
            Self::Resnet101 => resnet::resnet101(num_classes, vb),
            Self::Resnet152 => resnet::resnet152(num_classes, vb),
        }
    }
}

/// Source location for model weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSource {
    /// Load a safetensors file from the local file system
    Local { path: PathBuf },

    /// Download from Hugging Face Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
        /// Defaults to the architecture's weights file
        #[serde(default)]
        filename: Option<String>,
    },
}

impl Default for ModelSource {
    fn default() -> Self {
        Self::HuggingFace {
            repo: DEFAULT_WEIGHTS_REPO.to_string(),
            revision: default_revision(),
            filename: None,
        }
    }
}

/// Device type for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeviceType {
    /// CPU inference (always available)
    #[default]
    Cpu,
    /// CUDA GPU inference (if available)
    Cuda(usize),
    /// Metal (Apple Silicon)
    Metal(usize),
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Cuda(idx) => write!(f, "cuda:{}", idx),
            Self::Metal(idx) => write!(f, "metal:{}", idx),
        }
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (kind, index) = match s.split_once(':') {
            Some((kind, idx)) => {
                let idx = idx
                    .parse::<usize>()
                    .map_err(|_| format!("invalid device index in '{}'", s))?;
                (kind.to_string(), idx)
            }
            None => (s.clone(), 0),
        };
        match kind.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(index)),
            "metal" | "mps" => Ok(Self::Metal(index)),
            other => Err(format!("unknown device '{}', expected cpu, cuda[:N] or metal[:N]", other)),
        }
    }
}

impl TryFrom<String> for DeviceType {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceType> for String {
    fn from(device: DeviceType) -> Self {
        device.to_string()
    }
}

fn default_num_classes() -> usize {
    crate::labels::IMAGENET_CLASS_COUNT
}

fn default_revision() -> String {
    "main".to_string()
}

/// Pretrained ResNet running on Candle
pub struct ResnetClassifier {
    name: String,
    model: Func<'static>,
    device: Device,
    num_classes: usize,
    preprocess: Preprocess,
    weights_path: PathBuf,
}

impl ResnetClassifier {
    /// Load a model from configuration.
    ///
    /// Every failure is reported as [`Error::Initialization`].
    pub fn load(config: &ModelConfig) -> Result<Self> {
        #[cfg(feature = "ml-models")]
        {
            let weights_path = resolve_weights_path(config)?;
            let device = create_device(config.device)?;

            info!(
                "Loading {} weights from {}",
                config.architecture.display_name(),
                weights_path.display()
            );

            // SAFETY: the weights file is not modified while mapped
            let vb = unsafe {
                VarBuilder::from_mmaped_safetensors(&[weights_path.as_path()], DType::F32, &device)
            }
            .map_err(|e| Error::initialization(format!("Failed to load weights: {}", e)))?;

            let model = config
                .architecture
                .build(config.num_classes, vb)
                .map_err(|e| Error::initialization(format!("Failed to build network: {}", e)))?;

            info!(
                "Loaded {} with {} classes on {}",
                config.architecture.display_name(),
                config.num_classes,
                config.device
            );

            Ok(Self {
                name: config.architecture.display_name().to_string(),
                model,
                device,
                num_classes: config.num_classes,
                preprocess: config.preprocess.clone(),
                weights_path,
            })
        }

        #[cfg(not(feature = "ml-models"))]
        {
            let _ = config;
            Err(Error::initialization(
                "ML models require 'ml-models' feature flag",
            ))
        }
    }

    /// Get weights path
    pub fn weights_path(&self) -> &Path {
        &self.weights_path
    }
}

#[async_trait]
impl ImageClassifier for ResnetClassifier {
    async fn scores(&self, input: Tensor) -> Result<Tensor> {
        let model = self.model.clone();
        tokio::task::spawn_blocking(move || model.forward(&input))
            .await
            .map_err(|e| Error::inference(format!("Inference task failed: {}", e)))?
            .map_err(|e| Error::inference(format!("Model forward pass failed: {}", e)))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn preprocess(&self) -> &Preprocess {
        &self.preprocess
    }
}

/// Resolve model weights path from source
fn resolve_weights_path(config: &ModelConfig) -> Result<PathBuf> {
    match &config.source {
        ModelSource::Local { path } => {
            if !path.exists() {
                return Err(Error::initialization(format!(
                    "Model file not found: {}",
                    path.display()
                )));
            }
            Ok(path.clone())
        }
        ModelSource::HuggingFace {
            repo,
            revision,
            filename,
        } => {
            let filename = filename
                .clone()
                .unwrap_or_else(|| config.architecture.weights_file().to_string());

            info!("Fetching {} from Hugging Face repo {} @ {}", filename, repo, revision);

            let api = hf_hub::api::sync::Api::new()
                .map_err(|e| Error::initialization(format!("Failed to initialize HF API: {}", e)))?;

            let repo = api.repo(hf_hub::Repo::with_revision(
                repo.clone(),
                hf_hub::RepoType::Model,
                revision.clone(),
            ));

            repo.get(&filename)
                .map_err(|e| Error::initialization(format!("Failed to download model from HF: {}", e)))
        }
    }
}

/// Create Candle device from device type
fn create_device(device_type: DeviceType) -> Result<Device> {
    match device_type {
        DeviceType::Cpu => Ok(Device::Cpu),
        DeviceType::Cuda(idx) => Device::new_cuda(idx)
            .map_err(|e| Error::initialization(format!("Failed to create CUDA device: {}", e))),
        DeviceType::Metal(idx) => Device::new_metal(idx)
            .map_err(|e| Error::initialization(format!("Failed to create Metal device: {}", e))),
    }
}
