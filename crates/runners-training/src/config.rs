//! Evolution parameters and their validation.

use runners_brain::{
    agent::{FitnessShaping, MOTOR_OUTPUT_COUNT, MotorDecoding},
    network::NetworkShape,
    sensor::{SENSOR_COUNT, SensorConfig},
};
use runners_engine::Vec2;
use serde::{Deserialize, Serialize};

/// Parameters of one training run.
///
/// Missing fields fall back to [`Default`] when deserialized, so a config
/// file only needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Number of agents in every generation.
    pub population_size: usize,
    /// Number of top agents whose brains are copied unchanged.
    ///
    /// Also sizes the tournament pool (`2 × elite_count` best agents).
    pub elite_count: usize,
    /// Per-gene mutation probability in `[0, 1]`.
    pub mutation_rate: f32,
    /// Half-width of the uniform mutation perturbation.
    pub mutation_strength: f32,
    /// Candidates drawn per tournament.
    pub tournament_size: usize,
    /// Frames per episode.
    pub episode_length: u32,
    /// Number of generation summaries kept in the rolling history.
    pub history_capacity: usize,
    pub network: NetworkShape,
    /// Starting positions, assigned round-robin by list index.
    ///
    /// Each spawn point is also the home base of the agents placed on it.
    pub spawn_points: Vec<Vec2>,
    /// Seed of the population RNG. Drawn from the OS when absent.
    pub seed: Option<u64>,
    pub fitness: FitnessShaping,
    pub motor: MotorDecoding,
    pub sensors: SensorConfig,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            elite_count: 5,
            mutation_rate: 0.1,
            mutation_strength: 0.3,
            tournament_size: 3,
            episode_length: 1800,
            history_capacity: 50,
            network: NetworkShape::new(SENSOR_COUNT, 12, MOTOR_OUTPUT_COUNT),
            spawn_points: vec![
                Vec2::new(50.0, 450.0),
                Vec2::new(750.0, 450.0),
                Vec2::new(50.0, 50.0),
                Vec2::new(750.0, 50.0),
            ],
            seed: None,
            fitness: FitnessShaping::default(),
            motor: MotorDecoding::default(),
            sensors: SensorConfig::default(),
        }
    }
}

/// Error returned by [`EvolutionConfig::validate`].
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("population size must be positive")]
    EmptyPopulation,
    #[display("elite count must be positive")]
    NoElites,
    #[display("elite count {elite_count} exceeds population size {population_size}")]
    EliteCountExceedsPopulation {
        elite_count: usize,
        population_size: usize,
    },
    #[display("mutation rate must be within [0, 1], got {rate}")]
    InvalidMutationRate { rate: f32 },
    #[display("mutation strength must be finite and non-negative, got {strength}")]
    InvalidMutationStrength { strength: f32 },
    #[display("tournament size must be positive")]
    ZeroTournamentSize,
    #[display("episode length must be positive")]
    ZeroEpisodeLength,
    #[display("history capacity must be positive")]
    ZeroHistoryCapacity,
    #[display("at least one spawn point is required")]
    NoSpawnPoints,
    #[display("sensor ray length must be finite and positive, got {length}")]
    InvalidRayLength { length: f32 },
    #[display("sensor velocity scale must be finite and positive, got {scale}")]
    InvalidVelocityScale { scale: f32 },
    #[display("network shape {shape} does not match the sensor and motor layout")]
    InvalidNetworkShape { shape: NetworkShape },
    #[display("population size {population_size} does not match {brains} supplied brains")]
    BrainCountMismatch {
        population_size: usize,
        brains: usize,
    },
}

impl EvolutionConfig {
    /// Checks every parameter, reporting the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.elite_count == 0 {
            return Err(ConfigError::NoElites);
        }
        if self.elite_count > self.population_size {
            return Err(ConfigError::EliteCountExceedsPopulation {
                elite_count: self.elite_count,
                population_size: self.population_size,
            });
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(ConfigError::InvalidMutationRate {
                rate: self.mutation_rate,
            });
        }
        if !self.mutation_strength.is_finite() || self.mutation_strength < 0.0 {
            return Err(ConfigError::InvalidMutationStrength {
                strength: self.mutation_strength,
            });
        }
        if self.tournament_size == 0 {
            return Err(ConfigError::ZeroTournamentSize);
        }
        if self.episode_length == 0 {
            return Err(ConfigError::ZeroEpisodeLength);
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroHistoryCapacity);
        }
        if self.spawn_points.is_empty() {
            return Err(ConfigError::NoSpawnPoints);
        }
        let SensorConfig {
            ray_length,
            velocity_scale,
            ..
        } = self.sensors;
        if !ray_length.is_finite() || ray_length <= 0.0 {
            return Err(ConfigError::InvalidRayLength { length: ray_length });
        }
        if !velocity_scale.is_finite() || velocity_scale <= 0.0 {
            return Err(ConfigError::InvalidVelocityScale {
                scale: velocity_scale,
            });
        }
        let shape = self.network;
        if !shape.is_valid() || shape.input != SENSOR_COUNT || shape.output != MOTOR_OUTPUT_COUNT {
            return Err(ConfigError::InvalidNetworkShape { shape });
        }
        Ok(())
    }
}
