use std::path::Path;

use anyhow::Context;

use runners_engine::{ArenaConfig, PhysicsConfig};
use runners_training::config::EvolutionConfig;
use serde::{Deserialize, Serialize};

use crate::util;

/// Everything a training or evaluation run is parameterized by.
///
/// Every section is optional in the JSON file and defaults to the built-in
/// values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub evolution: EvolutionConfig,
    pub arena: ArenaConfig,
    pub physics: PhysicsConfig,
}

impl RunConfig {
    /// Loads the config file if one is given, applies `seed` to both the
    /// population and the arena, and validates the result.
    pub fn load(path: Option<&Path>, seed: Option<u64>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => util::read_json_file("run config", path)?,
            None => Self::default(),
        };
        if let Some(seed) = seed {
            config.evolution.seed = Some(seed);
            config.arena.seed = Some(seed);
        }
        config
            .evolution
            .validate()
            .context("Invalid evolution config")?;
        config.arena.validate().context("Invalid arena config")?;
        Ok(config)
    }
}
