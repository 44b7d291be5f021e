//! Startup configuration: defaults, an optional TOML file, then CLI overrides.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::{rngs::StdRng, SeedableRng};
use serde::Deserialize;

use crate::engine::SpawnPolicy;

/// Who may raise the best score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BestScorePolicy {
    /// Any session raises it, including both players of a two-player game.
    #[default]
    Shared,
    /// Only single-player scoring counts.
    SinglePlayerOnly,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Where the save record lives.
    pub save_path: PathBuf,
    /// Chance that a spawned tile is a 4.
    pub four_probability: f64,
    /// Seed for a reproducible tile sequence; entropy when absent.
    pub seed: Option<u64>,
    pub best_score_policy: BestScorePolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from("savegame.dat"),
            four_probability: SpawnPolicy::DEFAULT_FOUR_PROBABILITY,
            seed: None,
            best_score_policy: BestScorePolicy::Shared,
        }
    }
}

impl GameConfig {
    /// Parse and validate a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.four_probability) {
            return Err(ConfigError::Invalid("four_probability must be within 0..=1"));
        }
        if self.save_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("save_path must not be empty"));
        }
        Ok(())
    }

    pub fn spawn_policy(&self) -> SpawnPolicy {
        SpawnPolicy::new(self.four_probability)
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
