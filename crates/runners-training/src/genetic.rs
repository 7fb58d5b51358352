//! Genetic operators that turn a ranked generation into the next one.
//!
//! # Algorithm Overview
//!
//! Given the agents of a finished episode, ranked by fitness (best first):
//!
//! 1. **Elitism** - The brains of the top `elite_count` agents are cloned
//!    unchanged into the next generation
//! 2. **Tournament Selection** - Each parent is the fittest of
//!    `tournament_size` candidates drawn uniformly, with replacement, from the
//!    top `2 × elite_count` agents
//! 3. **Uniform Crossover** - Every gene of the child comes from one of the
//!    two parents with equal probability
//! 4. **Uniform Mutation** - Each gene is perturbed with probability
//!    `mutation_rate` by a value from `[-mutation_strength, mutation_strength]`
//!
//! Steps 2-4 repeat until the next generation is full.
//!
//! # Design Decisions
//!
//! ## Brains, not Agents
//!
//! [`PopulationEvolver::evolve`] returns the brains of the next generation
//! only. Identities, home bases and counters belong to the population, which
//! wraps every brain in a fresh [`Agent`]. An elite therefore survives as an
//! independent copy of its network and never as the live agent of the
//! previous episode.
//!
//! ## Restricted Tournament Pool
//!
//! Parents are drawn from the top `2 × elite_count` agents rather than the
//! whole population. Together with a stable ranking this keeps selection
//! pressure high and makes the pool deterministic for a given ranking.
//!
//! # Current Limitations
//!
//! - **Fixed parameters**: rates do not adapt over generations
//! - **No diversity maintenance** beyond random tournament draws
//! - **Single objective**: fitness is one scalar per agent

use rand::Rng;
use runners_brain::{
    agent::Agent,
    network::{DimensionMismatch, PolicyNetwork},
};

use crate::config::EvolutionConfig;

/// Controls how one generation is bred from the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationEvolver {
    /// Number of top agents preserved unchanged (elitism)
    pub elite_count: usize,
    /// Candidates per tournament (larger = stronger selection pressure)
    pub tournament_size: usize,
    /// Probability of mutating each gene
    pub mutation_rate: f32,
    /// Half-width of the uniform mutation noise
    pub mutation_strength: f32,
}

impl PopulationEvolver {
    #[must_use]
    pub fn from_config(config: &EvolutionConfig) -> Self {
        Self {
            elite_count: config.elite_count,
            tournament_size: config.tournament_size,
            mutation_rate: config.mutation_rate,
            mutation_strength: config.mutation_strength,
        }
    }

    /// Breeds the brains of the next generation.
    ///
    /// The first `elite_count` brains are copies of the leading agents in
    /// rank order, the rest are mutated offspring. The result always holds
    /// exactly `population_size` brains.
    ///
    /// # Arguments
    ///
    /// * `ranked` - Agents of the finished episode (must be sorted by fitness descending)
    /// * `population_size` - Number of brains to produce
    /// * `rng` - Random number generator
    ///
    /// # Errors
    ///
    /// Returns [`DimensionMismatch`] if two selected parents have different
    /// network shapes.
    ///
    /// # Panics
    ///
    /// Panics if `ranked` is empty or not sorted.
    pub fn evolve<R>(
        &self,
        ranked: &[Agent],
        population_size: usize,
        rng: &mut R,
    ) -> Result<Vec<PolicyNetwork>, DimensionMismatch>
    where
        R: Rng + ?Sized,
    {
        assert!(!ranked.is_empty(), "cannot breed from an empty generation");
        assert!(
            ranked.is_sorted_by(|a, b| a.fitness() >= b.fitness()),
            "agents must be ranked by fitness"
        );

        let elite_count = self.elite_count.min(ranked.len()).min(population_size);
        let mut next = Vec::with_capacity(population_size);
        next.extend(ranked[..elite_count].iter().map(|a| a.brain().clone()));

        let pool = tournament_pool(ranked, self.elite_count);
        while next.len() < population_size {
            let p1 = tournament_select(pool, self.tournament_size, rng);
            let p2 = tournament_select(pool, self.tournament_size, rng);
            let mut child = p1.brain().crossover(p2.brain(), rng)?;
            child.mutate(self.mutation_rate, self.mutation_strength, rng);
            next.push(child);
        }
        Ok(next)
    }
}

/// Returns the agents eligible as parents: the best `2 × elite_count`.
///
/// The pool is clamped to the population and holds at least one agent.
///
/// # Panics
///
/// Panics if `ranked` is empty.
#[must_use]
pub fn tournament_pool(ranked: &[Agent], elite_count: usize) -> &[Agent] {
    assert!(!ranked.is_empty());
    let size = elite_count.saturating_mul(2).clamp(1, ranked.len());
    &ranked[..size]
}

/// Selects an agent using tournament selection.
///
/// Draws `tournament_size` agents uniformly with replacement and returns the
/// one with the highest fitness. Ties keep the earliest draw.
///
/// # Panics
///
/// Panics if `pool` is empty or `tournament_size` is zero.
pub fn tournament_select<'a, R>(pool: &'a [Agent], tournament_size: usize, rng: &mut R) -> &'a Agent
where
    R: Rng + ?Sized,
{
    assert!(tournament_size > 0);
    assert!(!pool.is_empty());
    let mut best = &pool[rng.random_range(0..pool.len())];
    for _ in 1..tournament_size {
        let candidate = &pool[rng.random_range(0..pool.len())];
        if candidate.fitness() > best.fitness() {
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;
    use runners_brain::{agent::FitnessShaping, network::NetworkShape};
    use runners_engine::{AgentId, Vec2};

    use super::*;

    const SHAPE: NetworkShape = NetworkShape::new(8, 6, 3);

    /// Agents ranked best first, fitness `100 × (count - i)`.
    fn ranked_agents(count: u32) -> Vec<Agent> {
        let mut rng = Pcg32::seed_from_u64(99);
        (0..count)
            .map(|i| {
                let mut agent = Agent::new(
                    AgentId(u64::from(i)),
                    Vec2::ZERO,
                    PolicyNetwork::random(SHAPE, &mut rng),
                );
                for _ in 0..count - i {
                    agent.on_resource_pickup();
                    agent.on_resource_deliver_attempt(0.0);
                }
                agent.compute_fitness(Vec2::new(1.0, 0.0), &FitnessShaping::default());
                agent
            })
            .collect()
    }

    fn evolver(elite_count: usize, mutation_rate: f32) -> PopulationEvolver {
        PopulationEvolver {
            elite_count,
            tournament_size: 3,
            mutation_rate,
            mutation_strength: 0.3,
        }
    }

    #[test]
    fn test_tournament_returns_best_of_its_draws() {
        let ranked = ranked_agents(20);
        let pool = tournament_pool(&ranked, 5);
        assert_eq!(pool.len(), 10);

        for seed in 0..32 {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut replay = rng.clone();
            let draws = (0..3)
                .map(|_| &pool[replay.random_range(0..pool.len())])
                .collect::<Vec<_>>();

            let selected = tournament_select(pool, 3, &mut rng);
            assert!(draws.iter().all(|d| selected.fitness() >= d.fitness()));
            assert!(draws.iter().any(|d| d.id() == selected.id()));
            assert_eq!(rng, replay);
        }
    }

    #[test]
    fn test_tournament_pool_is_clamped() {
        let ranked = ranked_agents(3);
        assert_eq!(tournament_pool(&ranked, 5).len(), 3);
        assert_eq!(tournament_pool(&ranked, 0).len(), 1);
    }

    #[test]
    fn test_evolve_keeps_size_and_elites() {
        let ranked = ranked_agents(10);
        let mut rng = Pcg32::seed_from_u64(5);
        let next = evolver(3, 0.1).evolve(&ranked, 10, &mut rng).unwrap();

        assert_eq!(next.len(), 10);
        for (elite, brain) in ranked.iter().zip(&next[..3]) {
            assert_eq!(elite.brain(), brain);
        }
    }

    #[test]
    fn test_elite_copies_are_independent() {
        let ranked = ranked_agents(4);
        let original = ranked[0].brain().clone();
        let mut rng = Pcg32::seed_from_u64(6);
        let mut next = evolver(1, 0.0).evolve(&ranked, 4, &mut rng).unwrap();

        next[0].mutate(1.0, 1.0, &mut rng);
        assert_ne!(&next[0], ranked[0].brain());
        assert_eq!(ranked[0].brain(), &original);
    }

    #[test]
    fn test_offspring_genes_come_from_the_pool() {
        let ranked = ranked_agents(10);
        let pool = tournament_pool(&ranked, 2);
        let pool_genes = pool
            .iter()
            .map(|a| a.brain().genes().collect::<Vec<_>>())
            .collect::<Vec<_>>();

        let mut rng = Pcg32::seed_from_u64(11);
        let next = evolver(2, 0.0).evolve(&ranked, 10, &mut rng).unwrap();
        for child in &next[2..] {
            for (pos, gene) in child.genes().enumerate() {
                assert!(pool_genes.iter().any(|genes| genes[pos] == gene));
            }
        }
    }

    #[test]
    fn test_evolve_is_deterministic_for_a_seed() {
        let ranked = ranked_agents(8);
        let a = evolver(2, 0.5)
            .evolve(&ranked, 8, &mut Pcg32::seed_from_u64(3))
            .unwrap();
        let b = evolver(2, 0.5)
            .evolve(&ranked, 8, &mut Pcg32::seed_from_u64(3))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_mismatched_parents_fail() {
        let mut ranked = ranked_agents(2);
        let other = PolicyNetwork::random(NetworkShape::new(8, 12, 3), &mut Pcg32::seed_from_u64(1));
        ranked[1] = {
            let mut agent = Agent::new(AgentId(7), Vec2::ZERO, other);
            agent.on_resource_pickup();
            agent.on_resource_deliver_attempt(0.0);
            agent.compute_fitness(Vec2::new(1.0, 0.0), &FitnessShaping::default());
            agent
        };
        // any child of two distinct parents mismatches
        let evolver = PopulationEvolver {
            elite_count: 1,
            tournament_size: 1,
            mutation_rate: 0.0,
            mutation_strength: 0.0,
        };
        let failed = (0..64).any(|seed| {
            evolver
                .evolve(&ranked, 16, &mut Pcg32::seed_from_u64(seed))
                .is_err_and(|e| matches!(e, DimensionMismatch::Shape { .. }))
        });
        assert!(failed);
    }
}
