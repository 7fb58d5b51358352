//! Evolution of resource-runner brains with a genetic algorithm.
//!
//! # How Training Works
//!
//! 1. **Population** - A fixed number of agents, each with a randomly initialized brain
//! 2. **Episode** - The agents run for a fixed number of frames in a shared environment
//! 3. **Fitness** - Deliveries, holding time, collisions and idleness become one score per agent
//! 4. **Selection** - Agents are ranked and the best ones keep their brains (elitism)
//! 5. **Reproduction** - The rest of the next generation is bred from the best agents
//! 6. **Repeat** - Indefinitely, until the caller stops stepping
//!
//! # Architecture
//!
//! ```text
//! Population (population)
//!     ↓ steps agents through
//! Environment + Physics collaborators (runners-engine)
//!     ↓ report interactions to
//! Agents (runners-brain)
//!     ↓ ranked by fitness and bred by
//! PopulationEvolver (genetic)
//!     ↓ summarized as
//! GenerationSummary (statistics)
//! ```
//!
//! # Parameters
//!
//! All parameters live in [`config::EvolutionConfig`], validated before a
//! population is created:
//!
//! - **Population size** - Number of agents per generation
//! - **Elite count** - Number of top brains copied unchanged, also sizing the tournament pool
//! - **Tournament size** - Candidates drawn per parent selection
//! - **Mutation rate** - Probability of perturbing each gene
//! - **Mutation strength** - Maximum magnitude of a perturbation
//! - **Episode length** - Frames per generation
//!
//! # Example
//!
//! ```
//! use runners_engine::{Arena, ArenaConfig, PhysicsConfig, PointMassPhysics};
//! use runners_training::{
//!     config::EvolutionConfig,
//!     population::{Population, StepOutcome},
//! };
//!
//! let config = EvolutionConfig {
//!     population_size: 8,
//!     elite_count: 2,
//!     episode_length: 30,
//!     seed: Some(1),
//!     ..EvolutionConfig::default()
//! };
//! let mut population = Population::new(config)?;
//! let mut arena = Arena::new(ArenaConfig::default());
//! let mut physics = PointMassPhysics::new(PhysicsConfig::default());
//! population.attach_embodiments(&mut physics);
//!
//! let summary = loop {
//!     if let StepOutcome::GenerationComplete(summary) = population.step(&mut arena, &mut physics)? {
//!         break summary;
//!     }
//!     physics.advance();
//!     arena.advance();
//! };
//! assert_eq!(summary.generation, 1);
//! assert_eq!(population.agents().len(), 8);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod genetic;
pub mod population;
pub mod statistics;
