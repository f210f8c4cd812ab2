//! Server configuration

use crate::cli::Cli;
use serde::{Deserialize, Serialize};
use snapclass_classifiers::service::{DEFAULT_ANIMAL_KEYWORDS, DEFAULT_TOP_K};
use snapclass_classifiers::{ModelConfig, ModelSource, ServiceOptions};
use snapclass_core::{Error, Result};
use std::path::{Path, PathBuf};

const MIB: usize = 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Label file consumed once at startup
    #[serde(default = "default_labels_path")]
    pub labels_path: PathBuf,

    /// Uploads larger than this are rejected before classification
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Number of predictions per response
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Keywords for the `is_animal` annotation
    #[serde(default = "default_animal_keywords")]
    pub animal_keywords: Vec<String>,

    /// Pretrained model to serve
    #[serde(default)]
    pub model: ModelConfig,

    /// Cross-origin settings
    #[serde(default)]
    pub cors: CorsConfig,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &Path, cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(listen) = &cli.listen {
            config.listen = listen.clone();
        }

        if let Some(port) = cli.port {
            config.port = port;
        }

        if let Some(labels) = &cli.labels {
            config.labels_path = labels.clone();
        }

        if let Some(path) = &cli.model_path {
            config.model.source = ModelSource::Local { path: path.clone() };
        }

        if let Some(device) = cli.device {
            config.model.device = device;
        }

        if let Some(mb) = cli.max_upload_mb {
            config.max_upload_bytes = mb
                .checked_mul(MIB)
                .ok_or_else(|| Error::config(format!("max upload of {} MiB is out of range", mb)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(Error::config("max_upload_bytes must be greater than zero"));
        }
        if self.top_k == 0 {
            return Err(Error::config("top_k must be greater than zero"));
        }
        if self.model.num_classes == 0 {
            return Err(Error::config("model.num_classes must be greater than zero"));
        }
        Ok(())
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            top_k: self.top_k,
            animal_keywords: self.animal_keywords.clone(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            labels_path: default_labels_path(),
            max_upload_bytes: default_max_upload_bytes(),
            top_k: default_top_k(),
            animal_keywords: default_animal_keywords(),
            model: ModelConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

/// Cross-origin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allow requests from any origin
    #[serde(default = "default_true")]
    pub allow_any: bool,

    /// Allowed origins when `allow_any` is off
    #[serde(default)]
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_any: true,
            origins: Vec::new(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_labels_path() -> PathBuf {
    PathBuf::from("imagenet_classes.json")
}

fn default_max_upload_bytes() -> usize {
    5 * MIB
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_animal_keywords() -> Vec<String> {
    DEFAULT_ANIMAL_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapclass_classifiers::{Architecture, DeviceType};
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.top_k, 5);
        assert!(config.cors.allow_any);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(&dir.path().join("absent.yaml"), &Cli::default()).unwrap();
        assert_eq!(config.listen, "0.0.0.0");
        assert_eq!(config.labels_path, PathBuf::from("imagenet_classes.json"));
    }

    #[test]
    fn test_yaml_with_cli_overrides() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            r#"
port: 9000
labels_path: ./data/labels.json
top_k: 3
model:
  architecture: resnet34
  device: cpu
cors:
  allow_any: false
  origins: ["http://localhost:5173"]
"#
        )
        .unwrap();

        let cli = Cli {
            port: Some(9100),
            model_path: Some(PathBuf::from("/models/resnet34.safetensors")),
            device: Some(DeviceType::Cuda(0)),
            max_upload_mb: Some(2),
            ..Default::default()
        };
        let config = ServerConfig::load(file.path(), &cli).unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.labels_path, PathBuf::from("./data/labels.json"));
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
        assert_eq!(config.model.architecture, Architecture::Resnet34);
        assert_eq!(config.model.device, DeviceType::Cuda(0));
        assert!(matches!(config.model.source, ModelSource::Local { .. }));
        assert!(!config.cors.allow_any);
        assert_eq!(config.cors.origins.len(), 1);
    }

    #[test]
    fn test_huge_upload_override_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli {
            max_upload_mb: Some(usize::MAX),
            ..Default::default()
        };

        let err = ServerConfig::load(&dir.path().join("absent.yaml"), &cli).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let config = ServerConfig {
            max_upload_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            top_k: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
