use std::fs;
use std::path::{Path, PathBuf};

use crate::types::Config;

/// Environment variable that overrides `apiUrl` from the config file.
pub const API_URL_ENV: &str = "PLANVIEW_API_URL";

/// Get the canonical config file path (~/.planview/config.json)
pub fn config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".planview").join("config.json"))
}

/// Load configuration from ~/.planview/config.json.
///
/// A missing file yields defaults; `PLANVIEW_API_URL` wins over the file.
pub fn load_config() -> Result<Config, String> {
    let path = config_path()?;
    let override_url = std::env::var(API_URL_ENV).ok();
    load_config_from(&path, override_url.as_deref())
}

pub fn load_config_from(path: &Path, api_url_override: Option<&str>) -> Result<Config, String> {
    let mut config = if path.exists() {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;
        serde_json::from_str::<Config>(&content)
            .map_err(|e| format!("Failed to parse config {}: {}", path.display(), e))?
    } else {
        log::debug!("No config at {}; using defaults", path.display());
        Config::default()
    };

    if let Some(url) = api_url_override.map(str::trim).filter(|u| !u.is_empty()) {
        config.api_url = url.to_string();
    }

    if config.api_url.trim().is_empty() {
        return Err("Config apiUrl must not be empty".to_string());
    }

    Ok(config)
}
