use runners_engine::{Arena, PointMassPhysics};
use runners_training::{
    population::{Population, PopulationError, StepOutcome},
    statistics::GenerationSummary,
};

use crate::model::run_config::RunConfig;

/// A population together with the reference collaborators it runs in.
#[derive(Debug)]
pub struct Simulation {
    population: Population,
    arena: Arena,
    physics: PointMassPhysics,
}

impl Simulation {
    pub fn new(population: Population, config: &RunConfig) -> Self {
        let arena = Arena::new(config.arena.clone());
        let mut physics = PointMassPhysics::new(config.physics.clone());
        population.attach_embodiments(&mut physics);
        Self {
            population,
            arena,
            physics,
        }
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Steps until the current episode ends.
    ///
    /// Physics and crystal respawns advance after every step that keeps the
    /// episode running.
    pub fn run_generation(&mut self) -> Result<GenerationSummary, PopulationError> {
        loop {
            let outcome = self.population.step(&mut self.arena, &mut self.physics)?;
            if let StepOutcome::GenerationComplete(summary) = outcome {
                return Ok(summary);
            }
            self.physics.advance();
            self.arena.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use runners_training::config::EvolutionConfig;

    use super::*;

    #[test]
    fn test_run_generation_hands_over_to_next_generation() {
        let config = RunConfig {
            evolution: EvolutionConfig {
                population_size: 5,
                elite_count: 1,
                episode_length: 40,
                seed: Some(3),
                ..EvolutionConfig::default()
            },
            ..RunConfig::default()
        };
        let population = Population::new(config.evolution.clone()).unwrap();
        let mut simulation = Simulation::new(population, &config);

        let summary = simulation.run_generation().unwrap();
        assert_eq!(summary.generation, 1);
        assert_eq!(simulation.population().generation(), 2);
        assert_eq!(simulation.population().frame(), 0);
    }
}
