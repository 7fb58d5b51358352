//! Per-generation summaries and live progress snapshots.

use arrayvec::ArrayVec;
use runners_brain::agent::{Agent, AgentSummary};
use runners_stats::descriptive::DescriptiveStats;
use serde::{Deserialize, Serialize};

/// Number of agents listed in summaries and snapshots.
pub const TOP_K: usize = 5;

/// Outcome of one completed generation, recorded right after ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: u32,
    /// Fitness of the top-ranked agent.
    pub best_fitness: f32,
    pub mean_fitness: f32,
    /// Full distribution of fitness values across the population.
    pub fitness: DescriptiveStats,
    /// Deliveries made by the whole population during the episode.
    pub total_delivered: u32,
    pub top_agents: ArrayVec<AgentSummary, TOP_K>,
}

impl GenerationSummary {
    /// Summarizes agents ranked by fitness, best first.
    ///
    /// # Panics
    ///
    /// Panics if `ranked` is empty.
    #[must_use]
    pub fn from_ranked(generation: u32, ranked: &[Agent]) -> Self {
        let fitness = DescriptiveStats::new(ranked.iter().map(Agent::fitness))
            .expect("ranked population must not be empty");
        Self {
            generation,
            best_fitness: ranked[0].fitness(),
            mean_fitness: fitness.mean,
            fitness,
            total_delivered: total_delivered(ranked),
            top_agents: top_agents(ranked),
        }
    }
}

/// Live view of a population in the middle of an episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub generation: u32,
    pub frame: u32,
    /// Episode progress in percent.
    pub progress: f32,
    pub frames_remaining: u32,
    /// Best fitness of the last completed generation, zero before the first.
    pub best_fitness: f32,
    /// Mean fitness of the last completed generation, zero before the first.
    pub average_fitness: f32,
    /// Leading agents of the current generation in list order.
    pub top_agents: ArrayVec<AgentSummary, TOP_K>,
    /// Deliveries made so far in the current episode.
    pub total_delivered: u32,
}

pub(crate) fn top_agents(agents: &[Agent]) -> ArrayVec<AgentSummary, TOP_K> {
    agents.iter().take(TOP_K).map(Agent::summary).collect()
}

pub(crate) fn total_delivered(agents: &[Agent]) -> u32 {
    agents.iter().map(|a| a.counters().delivered).sum()
}
