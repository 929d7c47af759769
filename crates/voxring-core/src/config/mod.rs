//! Configuration for voxring
//!
//! - `PlayerConfig`: sample rate, buffer sizing, output selection
//! - YAML load/save with defaults on a missing or broken file
//! - Standard config path
//!
//! ```ignore
//! use voxring_core::config::{default_config_path, load_config, PlayerConfig};
//!
//! let config: PlayerConfig = load_config(&default_config_path());
//! ```

mod io;
mod paths;
mod player;

pub use io::{load_config, save_config};
pub use paths::{config_dir, default_config_path, CONFIG_FILE};
pub use player::{PlayerConfig, THRESHOLD_ENV};
