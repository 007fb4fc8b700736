use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ConfigFile {
    api_key: Option<String>,
}

/// Load the Gemini API key from a YAML config file.
///
/// A missing file or a missing/empty `api_key` entry is fatal: the pipeline
/// must not start fetching without working credentials.
pub fn load_api_key(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("configuration file not found: {}", path.display()))?;
    let config: ConfigFile = serde_yaml::from_str(&raw)
        .with_context(|| format!("invalid YAML in {}", path.display()))?;

    match config.api_key {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => bail!(
            "`api_key` is missing or empty in configuration file {}",
            path.display()
        ),
    }
}
