//! Standard config locations

use std::path::PathBuf;

/// Config file name inside the voxring directory
pub const CONFIG_FILE: &str = "config.yaml";

/// Directory holding voxring configuration
///
/// Returns: `<platform config dir>/voxring` (e.g. `~/.config/voxring`)
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voxring")
}

/// Default path of the player config file
pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}
