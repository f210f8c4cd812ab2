//! SnapClass Server
//!
//! HTTP front end for the inference service: the `/predict` upload endpoint,
//! health and metrics endpoints, and the embedded browser UI.

pub mod app;
pub mod cli;
pub mod config;
pub mod routes;
pub mod state;
pub mod static_files;

pub use app::{build_app, run_server};
pub use cli::Cli;
pub use config::{CorsConfig, ServerConfig};
pub use state::AppState;
