use std::path::PathBuf;

use anyhow::Context as _;
use runners_training::{config::EvolutionConfig, population::Population};

use crate::{
    model::run_config::RunConfig,
    simulation::Simulation,
    util::{self, Output},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct EvaluateArg {
    /// Path to the model file (JSON format)
    model_file: PathBuf,
    /// Run config file (JSON). Built-in defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for the arena RNG
    #[arg(long)]
    seed: Option<u64>,
    /// Output file path for the episode summary
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &EvaluateArg) -> anyhow::Result<()> {
    let EvaluateArg {
        model_file,
        config,
        seed,
        output,
    } = arg;

    eprintln!("Loading model from {}", model_file.display());
    let model = util::read_model_file(model_file)?;
    eprintln!(
        "Loaded {:?} (generation {}, fitness {:.3}, network {})",
        model.name,
        model.generation,
        model.final_fitness,
        model.network.shape()
    );

    let config = RunConfig::load(config.as_deref(), *seed)?;
    let evolution = EvolutionConfig {
        population_size: 1,
        elite_count: 1,
        network: model.network.shape(),
        ..config.evolution.clone()
    };
    let population = Population::with_brains(evolution, vec![model.network])
        .context("Model does not fit the run config")?;
    let mut simulation = Simulation::new(population, &config);

    let summary = simulation.run_generation()?;
    let agent = summary
        .top_agents
        .first()
        .context("Episode finished without agents")?;

    eprintln!("Episode completed ({} frames)", config.evolution.episode_length);
    eprintln!("  Fitness:    {:.3}", agent.fitness);
    eprintln!("  Collected:  {}", agent.collected);
    eprintln!("  Delivered:  {}", agent.delivered);
    eprintln!("  Collisions: {}", agent.collisions);

    if output.is_some() {
        Output::save_json(&summary, output.clone())?;
    }

    Ok(())
}
