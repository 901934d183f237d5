//! Configuration file support for Liftlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/liftlog/config.toml`.

use crate::{Error, ProgressionRules, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub progression: ProgressionConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Progression parameters configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressionConfig {
    #[serde(default = "default_starting_points")]
    pub starting_points: u64,

    #[serde(default = "default_first_star_at")]
    pub first_star_at: u32,

    #[serde(default = "default_points_per_workout")]
    pub points_per_workout: u64,

    #[serde(default = "default_star_bonus_points")]
    pub star_bonus_points: u64,

    #[serde(default = "default_star_threshold_factor")]
    pub star_threshold_factor: u32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            starting_points: default_starting_points(),
            first_star_at: default_first_star_at(),
            points_per_workout: default_points_per_workout(),
            star_bonus_points: default_star_bonus_points(),
            star_threshold_factor: default_star_threshold_factor(),
        }
    }
}

impl ProgressionConfig {
    /// Rules handed to the progression engine
    pub fn rules(&self) -> ProgressionRules {
        ProgressionRules {
            starting_points: self.starting_points,
            first_star_at: self.first_star_at,
            points_per_workout: self.points_per_workout,
            star_bonus_points: self.star_bonus_points,
            star_threshold_factor: self.star_threshold_factor,
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("liftlog")
}

fn default_starting_points() -> u64 {
    50
}

fn default_first_star_at() -> u32 {
    20
}

fn default_points_per_workout() -> u64 {
    5
}

fn default_star_bonus_points() -> u64 {
    50
}

fn default_star_threshold_factor() -> u32 {
    2
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("liftlog").join("config.toml")
    }

    /// Reject settings that would break the star threshold invariants
    pub fn validate(&self) -> Result<()> {
        if self.progression.first_star_at == 0 {
            return Err(Error::Config(
                "progression.first_star_at must be at least 1".into(),
            ));
        }
        if self.progression.star_threshold_factor == 0 {
            return Err(Error::Config(
                "progression.star_threshold_factor must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
