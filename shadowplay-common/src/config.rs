//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Default relay websocket endpoint for same-machine setups
pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:5830/ws";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Some(path) = read_config_key("root_folder") {
        return Ok(PathBuf::from(path));
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_root_folder())
}

/// Relay endpoint resolution: CLI > SHADOWPLAY_RELAY env > TOML > default
pub fn resolve_relay_url(cli_arg: Option<&str>) -> String {
    if let Some(url) = cli_arg {
        return url.to_string();
    }
    if let Ok(url) = std::env::var("SHADOWPLAY_RELAY") {
        return url;
    }
    if let Some(url) = read_config_key("relay_url") {
        return url;
    }
    DEFAULT_RELAY_URL.to_string()
}

/// Read one string key from the TOML config file, if present
fn read_config_key(key: &str) -> Option<String> {
    let config_path = config_file_path().ok()?;
    let toml_content = std::fs::read_to_string(config_path).ok()?;
    let config = toml::from_str::<toml::Value>(&toml_content).ok()?;
    config.get(key).and_then(|v| v.as_str()).map(String::from)
}

/// Default configuration file path for the platform
fn config_file_path() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // ~/.config/shadowplay/config.toml first, then /etc/shadowplay/config.toml
        if let Some(path) = dirs::config_dir().map(|d| d.join("shadowplay").join("config.toml")) {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/shadowplay/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let path = dirs::config_dir()
        .map(|d| d.join("shadowplay").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("shadowplay"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/shadowplay"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("shadowplay"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/shadowplay"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("shadowplay"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\shadowplay"))
    } else {
        PathBuf::from("./shadowplay_data")
    }
}
