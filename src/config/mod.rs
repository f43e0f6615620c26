mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./config.toml",
        "./anilib.toml",
        "~/.config/anilib/config.toml",
        "/etc/anilib/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    for path in &config.library.watch_directories {
        if !path.exists() {
            tracing::warn!("Watch directory does not exist: {:?}", path);
        }
    }

    if config.metadata.candidates == 0 {
        anyhow::bail!("metadata.candidates must be at least 1");
    }
    if config.metadata.requests_per_minute == 0 {
        anyhow::bail!("metadata.requests_per_minute must be at least 1");
    }

    let transcode = &config.transcode;
    if transcode.max_concurrent == 0 {
        anyhow::bail!("transcode.max_concurrent must be at least 1");
    }
    if transcode.cover_width == 0 {
        anyhow::bail!("transcode.cover_width must be at least 1");
    }
    if transcode.output_suffix.trim().is_empty() {
        // An empty suffix would make the transcode overwrite an mp4 source.
        anyhow::bail!("transcode.output_suffix cannot be empty");
    }
    if transcode.video_codecs.is_empty() || transcode.audio_codecs.is_empty() {
        anyhow::bail!("transcode codec lists cannot be empty");
    }

    Ok(())
}
