//! The generational loop.
//!
//! A [`Population`] cycles through four phases:
//!
//! ```text
//! Running ──(frame == episode_length)──> Evaluating ──> Breeding ──> Reset ──> Running
//! ```
//!
//! - **Running** - [`Population::step`] senses, decides and drives every
//!   agent for one frame, then lets the environment resolve interactions
//! - **Evaluating** - fitness is computed and the agents are ranked
//! - **Breeding** - the next generation is bred (see [`crate::genetic`])
//! - **Reset** - the old embodiments are detached, the new ones attached and
//!   the environment reset
//!
//! Evaluation, breeding and reset happen inside the step that ends the
//! episode, so between calls the population is always `Running`. There is no
//! terminal phase; the caller decides when to stop.

use std::mem;

use rand::SeedableRng as _;
use rand_pcg::Pcg32;
use runners_brain::{
    agent::Agent,
    network::{DimensionMismatch, PolicyNetwork},
    sensor::SensorEncoder,
};
use runners_engine::{AgentId, Environment, Physics, Vec2};
use runners_stats::history::RollingHistory;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::{
    config::{ConfigError, EvolutionConfig},
    genetic::PopulationEvolver,
    statistics::{self, GenerationSummary, StatisticsSnapshot},
};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
pub enum EpisodePhase {
    Running,
    Evaluating,
    Breeding,
    Reset,
}

/// Result of a successful [`Population::step`].
#[derive(Debug, Clone, PartialEq, derive_more::IsVariant)]
pub enum StepOutcome {
    /// The episode goes on.
    Running,
    /// The step ended the episode and a new generation took over.
    GenerationComplete(GenerationSummary),
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum PopulationError {
    #[display("network dimension mismatch: {_0}")]
    Network(DimensionMismatch),
    #[display("population is {actual}, expected {expected}")]
    InvalidPhase {
        expected: EpisodePhase,
        actual: EpisodePhase,
    },
}

impl From<DimensionMismatch> for PopulationError {
    fn from(err: DimensionMismatch) -> Self {
        Self::Network(err)
    }
}

/// A fixed-size population of agents evolving episode by episode.
///
/// Agents are driven through the [`Environment`] and [`Physics`]
/// collaborators passed to [`step`](Self::step). Every agent gets a fresh
/// [`AgentId`] when it is created, and ids are never reused, so physics
/// tables keyed by id never confuse two generations.
#[derive(Debug)]
pub struct Population {
    config: EvolutionConfig,
    evolver: PopulationEvolver,
    encoder: SensorEncoder,
    rng: Pcg32,
    agents: Vec<Agent>,
    phase: EpisodePhase,
    generation: u32,
    frame: u32,
    next_id: u64,
    history: RollingHistory<GenerationSummary>,
}

impl Population {
    /// Creates generation 1 with randomly initialized brains.
    ///
    /// The embodiments are not attached yet; call
    /// [`attach_embodiments`](Self::attach_embodiments) before the first step.
    pub fn new(config: EvolutionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut population = Self::empty(config);
        let brains = population.random_brains();
        population.agents = population.embody(brains);
        Ok(population)
    }

    /// Creates generation 1 from existing brains, one agent per brain.
    ///
    /// Used to replay saved models.
    pub fn with_brains(
        config: EvolutionConfig,
        brains: Vec<PolicyNetwork>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if brains.len() != config.population_size {
            return Err(ConfigError::BrainCountMismatch {
                population_size: config.population_size,
                brains: brains.len(),
            });
        }
        if let Some(brain) = brains.iter().find(|b| b.shape() != config.network) {
            return Err(ConfigError::InvalidNetworkShape {
                shape: brain.shape(),
            });
        }
        let mut population = Self::empty(config);
        population.agents = population.embody(brains);
        Ok(population)
    }

    fn empty(config: EvolutionConfig) -> Self {
        Self {
            evolver: PopulationEvolver::from_config(&config),
            encoder: SensorEncoder::new(config.sensors.clone()),
            rng: seeded_rng(config.seed),
            agents: vec![],
            phase: EpisodePhase::Running,
            generation: 1,
            frame: 0,
            next_id: 0,
            history: RollingHistory::new(config.history_capacity),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Agents of the current generation.
    ///
    /// Elites of the previous generation come first, in rank order.
    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    #[must_use]
    pub fn phase(&self) -> EpisodePhase {
        self.phase
    }

    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    #[must_use]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    #[must_use]
    pub fn history(&self) -> &RollingHistory<GenerationSummary> {
        &self.history
    }

    /// Brain of the best agent of the last completed generation.
    ///
    /// Elitism puts a copy of it at the front of the current generation.
    /// Returns `None` before the first generation completes.
    #[must_use]
    pub fn champion(&self) -> Option<&PolicyNetwork> {
        if self.history.is_empty() {
            return None;
        }
        self.agents.first().map(Agent::brain)
    }

    /// Creates a body for every agent at its home position.
    pub fn attach_embodiments<Y>(&self, physics: &mut Y)
    where
        Y: Physics + ?Sized,
    {
        for agent in &self.agents {
            physics.attach_embodiment(agent.id(), agent.home());
        }
    }

    fn detach_embodiments<Y>(&self, physics: &mut Y)
    where
        Y: Physics + ?Sized,
    {
        for agent in &self.agents {
            physics.detach_embodiment(agent.id());
        }
    }

    /// Advances the episode by one frame.
    ///
    /// Every live agent senses the environment, decides and hands its motor
    /// command to `physics`. Agents without kinematics are skipped. The
    /// environment then resolves pickups, deliveries and contacts.
    ///
    /// The step that reaches the episode length also evaluates, breeds and
    /// resets, and returns the summary of the finished generation.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::InvalidPhase`] unless the population is
    /// [`EpisodePhase::Running`], and [`PopulationError::Network`] if a brain
    /// rejects its input.
    pub fn step<E, Y>(&mut self, env: &mut E, physics: &mut Y) -> Result<StepOutcome, PopulationError>
    where
        E: Environment,
        Y: Physics + ?Sized,
    {
        if self.phase != EpisodePhase::Running {
            return Err(PopulationError::InvalidPhase {
                expected: EpisodePhase::Running,
                actual: self.phase,
            });
        }

        self.frame += 1;
        let mut acted = 0_usize;
        for agent in self.agents.iter_mut().filter(|a| a.is_alive()) {
            let Some(kinematics) = physics.current_kinematics(agent.id()) else {
                warn!(agent = %agent.id(), "no kinematics for live agent, skipped");
                continue;
            };
            let sensors = self
                .encoder
                .encode(&kinematics, agent.is_carrying(), &*env);
            let command = agent.act(&sensors, &self.config.motor)?;
            physics.apply_motor_command(agent.id(), &command);
            acted += 1;
        }
        env.resolve_interactions(&*physics, &mut self.agents);
        trace!(generation = self.generation, frame = self.frame, acted, "step");

        if self.frame < self.config.episode_length {
            return Ok(StepOutcome::Running);
        }
        let summary = self.advance_generation(env, physics)?;
        Ok(StepOutcome::GenerationComplete(summary))
    }

    fn advance_generation<E, Y>(
        &mut self,
        env: &mut E,
        physics: &mut Y,
    ) -> Result<GenerationSummary, PopulationError>
    where
        E: Environment,
        Y: Physics + ?Sized,
    {
        self.enter(EpisodePhase::Evaluating);
        for agent in &mut self.agents {
            let velocity = physics
                .current_kinematics(agent.id())
                .map_or(Vec2::ZERO, |k| k.velocity);
            agent.compute_fitness(velocity, &self.config.fitness);
        }
        rank_by_fitness(&mut self.agents);
        let summary = GenerationSummary::from_ranked(self.generation, &self.agents);
        info!(
            generation = summary.generation,
            best = summary.best_fitness,
            mean = summary.mean_fitness,
            delivered = summary.total_delivered,
            "generation complete"
        );
        self.history.push(summary.clone());

        self.enter(EpisodePhase::Breeding);
        let brains = self
            .evolver
            .evolve(&self.agents, self.config.population_size, &mut self.rng)?;
        let next = self.embody(brains);

        self.enter(EpisodePhase::Reset);
        self.replace_generation(next, env, physics);
        self.generation += 1;
        self.enter(EpisodePhase::Running);
        Ok(summary)
    }

    /// Discards the run and starts over from a random generation 1.
    ///
    /// Detaches every embodiment, clears the history and resets the
    /// environment. A seeded population replays the same brains it started
    /// with, under new ids.
    pub fn reset<E, Y>(&mut self, env: &mut E, physics: &mut Y)
    where
        E: Environment,
        Y: Physics + ?Sized,
    {
        self.enter(EpisodePhase::Reset);
        if let Some(seed) = self.config.seed {
            self.rng = Pcg32::seed_from_u64(seed);
        }
        let brains = self.random_brains();
        let next = self.embody(brains);
        self.replace_generation(next, env, physics);
        self.generation = 1;
        self.history.clear();
        self.enter(EpisodePhase::Running);
    }

    /// Snapshot of the running episode.
    #[must_use]
    pub fn statistics(&self) -> StatisticsSnapshot {
        let episode_length = self.config.episode_length;
        #[expect(clippy::cast_precision_loss)]
        let progress = self.frame as f32 / episode_length as f32 * 100.0;
        let (best_fitness, average_fitness) = self
            .history
            .latest()
            .map_or((0.0, 0.0), |s| (s.best_fitness, s.mean_fitness));
        StatisticsSnapshot {
            generation: self.generation,
            frame: self.frame,
            progress,
            frames_remaining: episode_length.saturating_sub(self.frame),
            best_fitness,
            average_fitness,
            top_agents: statistics::top_agents(&self.agents),
            total_delivered: statistics::total_delivered(&self.agents),
        }
    }

    fn replace_generation<E, Y>(&mut self, next: Vec<Agent>, env: &mut E, physics: &mut Y)
    where
        E: Environment,
        Y: Physics + ?Sized,
    {
        self.detach_embodiments(physics);
        let previous = mem::replace(&mut self.agents, next);
        debug!(
            retired = previous.len(),
            spawned = self.agents.len(),
            "generation replaced"
        );
        self.attach_embodiments(physics);
        env.reset();
        self.frame = 0;
    }

    fn random_brains(&mut self) -> Vec<PolicyNetwork> {
        let shape = self.config.network;
        (0..self.config.population_size)
            .map(|_| PolicyNetwork::random(shape, &mut self.rng))
            .collect()
    }

    /// Wraps brains in fresh agents, assigning homes round-robin by index.
    fn embody(&mut self, brains: Vec<PolicyNetwork>) -> Vec<Agent> {
        let spawn_points = &self.config.spawn_points;
        brains
            .into_iter()
            .enumerate()
            .map(|(i, brain)| {
                let id = AgentId(self.next_id);
                self.next_id += 1;
                Agent::new(id, spawn_points[i % spawn_points.len()], brain)
            })
            .collect()
    }

    fn enter(&mut self, phase: EpisodePhase) {
        debug!(generation = self.generation, from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
    }
}

/// Sorts best first. The sort is stable, so equal fitness keeps the previous
/// order, which decides the elites and the tournament pool among ties.
fn rank_by_fitness(agents: &mut [Agent]) {
    agents.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
}

fn seeded_rng(seed: Option<u64>) -> Pcg32 {
    match seed {
        Some(seed) => Pcg32::seed_from_u64(seed),
        None => Pcg32::from_rng(&mut rand::rng()),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use runners_brain::{
        agent::{AgentCounters, FitnessShaping},
        network::NetworkShape,
    };
    use runners_engine::{Arena, ArenaConfig, PhysicsConfig, PointMassPhysics};

    use super::*;
    use crate::genetic::tournament_pool;

    fn config() -> EvolutionConfig {
        EvolutionConfig {
            population_size: 6,
            elite_count: 2,
            episode_length: 20,
            history_capacity: 3,
            seed: Some(42),
            ..EvolutionConfig::default()
        }
    }

    fn world() -> (Arena, PointMassPhysics) {
        let arena = Arena::new(ArenaConfig {
            seed: Some(7),
            ..ArenaConfig::default()
        });
        (arena, PointMassPhysics::new(PhysicsConfig::default()))
    }

    #[test]
    fn test_new_population_starts_running() {
        let population = Population::new(config()).unwrap();
        assert_eq!(population.phase(), EpisodePhase::Running);
        assert_eq!(population.generation(), 1);
        assert_eq!(population.frame(), 0);
        assert_eq!(population.agents().len(), 6);
        assert!(population.champion().is_none());

        let spawn_points = &population.config().spawn_points;
        for (i, agent) in population.agents().iter().enumerate() {
            assert_eq!(agent.home(), spawn_points[i % spawn_points.len()]);
            assert_eq!(agent.id(), AgentId(i as u64));
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = EvolutionConfig {
            elite_count: 7,
            ..config()
        };
        assert!(matches!(
            Population::new(config),
            Err(ConfigError::EliteCountExceedsPopulation { .. })
        ));
    }

    #[test]
    fn test_step_requires_running_phase() {
        let (mut arena, mut physics) = world();
        let mut population = Population::new(config()).unwrap();
        population.attach_embodiments(&mut physics);
        population.phase = EpisodePhase::Breeding;

        let err = population.step(&mut arena, &mut physics).unwrap_err();
        assert_eq!(
            err,
            PopulationError::InvalidPhase {
                expected: EpisodePhase::Running,
                actual: EpisodePhase::Breeding
            }
        );
        assert_eq!(population.frame(), 0);
    }

    #[test]
    fn test_episode_ends_at_episode_length() {
        let (mut arena, mut physics) = world();
        let mut population = Population::new(config()).unwrap();
        population.attach_embodiments(&mut physics);

        for frame in 1..20 {
            let outcome = population.step(&mut arena, &mut physics).unwrap();
            assert!(outcome.is_running());
            assert_eq!(population.frame(), frame);
            physics.advance();
            arena.advance();
        }
        let StepOutcome::GenerationComplete(summary) =
            population.step(&mut arena, &mut physics).unwrap()
        else {
            panic!("episode should end at frame 20");
        };
        assert_eq!(summary.generation, 1);
        assert_eq!(population.generation(), 2);
        assert_eq!(population.frame(), 0);
        assert_eq!(population.phase(), EpisodePhase::Running);
        assert_eq!(population.history().len(), 1);
        assert_eq!(physics.body_count(), 6);
        assert!(population.champion().is_some());
    }

    #[test]
    fn test_agents_without_body_are_skipped() {
        let (mut arena, mut physics) = world();
        let mut population = Population::new(config()).unwrap();

        let outcome = population.step(&mut arena, &mut physics).unwrap();
        assert!(outcome.is_running());
        for agent in population.agents() {
            assert_eq!(agent.last_action(), [0.0; 3]);
            assert_eq!(*agent.counters(), AgentCounters::default());
        }
    }

    #[test]
    fn test_ranking_keeps_order_among_ties() {
        let mut population = Population::new(config()).unwrap();
        let shaping = FitnessShaping::default();
        for (i, agent) in population.agents.iter_mut().enumerate() {
            // agents 1 and 4 move, everyone else idles at zero
            let velocity = if i == 1 || i == 4 {
                Vec2::new(1.0, 0.0)
            } else {
                Vec2::ZERO
            };
            if i == 1 || i == 4 {
                agent.on_resource_pickup();
                agent.on_resource_deliver_attempt(0.0);
            }
            agent.compute_fitness(velocity, &shaping);
        }
        rank_by_fitness(&mut population.agents);

        let ids = population.agents().iter().map(|a| a.id().0).collect::<Vec<_>>();
        assert_eq!(ids, [1, 4, 0, 2, 3, 5]);
        let pool = tournament_pool(population.agents(), 2)
            .iter()
            .map(|a| a.id().0)
            .collect::<Vec<_>>();
        assert_eq!(pool, [1, 4, 0, 2]);
    }

    #[test]
    fn test_tied_generation_keeps_leading_brains_as_elites() {
        let (mut arena, mut physics) = world();
        // no bodies attached: nobody moves, so every agent ends with fitness 0
        let mut population = Population::new(config()).unwrap();
        let leading = population.agents()[..2]
            .iter()
            .map(|a| a.brain().clone())
            .collect::<Vec<_>>();

        let summary = loop {
            if let StepOutcome::GenerationComplete(summary) =
                population.step(&mut arena, &mut physics).unwrap()
            {
                break summary;
            }
        };
        assert!(summary.best_fitness.abs() < f32::EPSILON);
        let ids = summary.top_agents.iter().map(|a| a.id.0).collect::<Vec<_>>();
        assert_eq!(ids, [0, 1, 2, 3, 4]);
        for (agent, brain) in population.agents().iter().zip(&leading) {
            assert_eq!(agent.brain(), brain);
        }
    }

    #[test]
    fn test_statistics_snapshot() {
        let (mut arena, mut physics) = world();
        let mut population = Population::new(config()).unwrap();
        population.attach_embodiments(&mut physics);
        for _ in 0..5 {
            population.step(&mut arena, &mut physics).unwrap();
        }

        let stats = population.statistics();
        assert_eq!(stats.generation, 1);
        assert_eq!(stats.frame, 5);
        assert!((stats.progress - 25.0).abs() < 1e-4);
        assert_eq!(stats.frames_remaining, 15);
        assert!(stats.best_fitness.abs() < f32::EPSILON);
        assert_eq!(stats.top_agents.len(), 5);
    }

    #[test]
    fn test_reset_replays_seeded_generation() {
        let (mut arena, mut physics) = world();
        let mut population = Population::new(config()).unwrap();
        population.attach_embodiments(&mut physics);
        let initial = population
            .agents()
            .iter()
            .map(|a| a.brain().clone())
            .collect::<Vec<_>>();

        for _ in 0..25 {
            population.step(&mut arena, &mut physics).unwrap();
        }
        assert_eq!(population.generation(), 2);

        population.reset(&mut arena, &mut physics);
        assert_eq!(population.generation(), 1);
        assert_eq!(population.frame(), 0);
        assert!(population.history().is_empty());
        assert_eq!(physics.body_count(), 6);
        for (agent, brain) in population.agents().iter().zip(&initial) {
            assert_eq!(agent.brain(), brain);
            assert!(agent.id() >= AgentId(12));
        }
    }

    #[test]
    fn test_with_brains_checks_shape_and_count() {
        let config = EvolutionConfig {
            population_size: 1,
            elite_count: 1,
            ..config()
        };
        let mut rng = Pcg32::seed_from_u64(1);
        let good = PolicyNetwork::random(config.network, &mut rng);
        let bad = PolicyNetwork::random(NetworkShape::new(8, 5, 3), &mut rng);

        assert!(Population::with_brains(config.clone(), vec![good.clone()]).is_ok());
        assert!(matches!(
            Population::with_brains(config.clone(), vec![bad]),
            Err(ConfigError::InvalidNetworkShape { .. })
        ));
        assert!(matches!(
            Population::with_brains(config, vec![good.clone(), good]),
            Err(ConfigError::BrainCountMismatch { .. })
        ));
    }
}
