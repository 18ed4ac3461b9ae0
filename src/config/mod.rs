mod types;

pub use types::*;

use crate::Result;
use std::env;
use std::path::Path;
use tracing::debug;

pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

    let config = load_from(&config_path).await?;

    Ok(apply_model_path_override(config, env::var("MODEL_PATH").ok()))
}

/// Replaces the configured model path with `model_path` (the `MODEL_PATH`
/// variable) when set.
pub fn apply_model_path_override(mut config: Config, model_path: Option<String>) -> Config {
    if let Some(model_path) = model_path {
        debug!("Model path overridden by MODEL_PATH: {}", model_path);
        config.model.path = model_path;
    }
    config
}

pub async fn load_from(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    debug!("Loading configuration from: {}", path.display());

    let config_str = tokio::fs::read_to_string(path).await?;
    let config: Config = serde_yaml::from_str(&config_str)?;

    Ok(config)
}
