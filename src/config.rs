use std::path::PathBuf;

use ash::vk;
use serde::{Deserialize, Serialize};

use crate::kernel;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub window_width: u32,
    pub window_height: u32,
    pub present_mode: PresentMode,
    pub object_path: String,
    pub floor_path: String,
    /// Directory holding the compiled shader binaries; defaults to the
    /// build output directory when absent.
    pub shader_dir: Option<String>,
    pub kernel_seed: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_width: 800,
            window_height: 600,
            present_mode: PresentMode::Fifo,
            object_path: "assets/objects/dragon.sbm".to_string(),
            floor_path: "assets/objects/cube.sbm".to_string(),
            shader_dir: None,
            kernel_seed: kernel::DEFAULT_SEED,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub enum PresentMode {
    Immediate,
    Mailbox,
    Fifo,
    FifoRelaxed,
}

impl From<PresentMode> for vk::PresentModeKHR {
    fn from(mode: PresentMode) -> Self {
        match mode {
            PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
            PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
            PresentMode::Fifo => vk::PresentModeKHR::FIFO,
            PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
        }
    }
}

pub struct ConfigFileLoader {
    pub path: PathBuf,
}

impl ConfigFileLoader {
    pub fn new(path: &str) -> Self {
        Self { path: path.into() }
    }

    /// Loads the config, writing the defaults to disk on first run. A
    /// malformed file falls back to the defaults with a warning instead of
    /// aborting startup.
    pub fn load_config(&self) -> Config {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(err) => {
                    log::warn!(
                        "could not parse {}: {err}; using defaults",
                        self.path.display()
                    );
                    Config::default()
                }
            },
            Err(_) => {
                let config = Config::default();
                self.save_config(&config);
                config
            }
        }
    }

    pub fn save_config(&self, config: &Config) {
        match serde_json::to_string_pretty(config) {
            Ok(content) => {
                if let Err(err) = std::fs::write(&self.path, content) {
                    log::warn!("could not write {}: {err}", self.path.display());
                }
            }
            Err(err) => log::warn!("could not serialize config: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.window_width, config.window_width);
        assert_eq!(back.kernel_seed, config.kernel_seed);
        assert_eq!(back.object_path, config.object_path);
    }
}
