use clap::Parser;
use snapclass_classifiers::DeviceType;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "snapclass-server")]
#[command(author, version, about = "Image classification service with a browser upload UI", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SNAPCLASS_CONFIG", default_value = "snapclass.yaml")]
    pub config: PathBuf,

    /// Listen address
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Label file (JSON array or one label per line)
    #[arg(long, env = "SNAPCLASS_LABELS")]
    pub labels: Option<PathBuf>,

    /// Local safetensors weights, instead of downloading from Hugging Face
    #[arg(long, env = "SNAPCLASS_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Inference device: cpu, cuda[:N] or metal[:N]
    #[arg(long)]
    pub device: Option<DeviceType>,

    /// Maximum upload size in MiB
    #[arg(long)]
    pub max_upload_mb: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
