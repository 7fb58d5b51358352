use std::path::PathBuf;

use anyhow::Context as _;
use chrono::Utc;
use runners_training::{population::Population, statistics::GenerationSummary};

use crate::{
    model::{run_config::RunConfig, runner_model::RunnerModel},
    simulation::Simulation,
    util::Output,
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Run config file (JSON). Built-in defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of generations to evolve
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..))]
    generations: u32,
    /// Seed for the population and arena RNGs
    #[arg(long)]
    seed: Option<u64>,
    /// Name stored in the saved model
    #[arg(long, default_value = "runner")]
    name: String,
    /// Output file path for the trained model
    #[arg(long)]
    output: Option<PathBuf>,
    /// Output file path for the generation history
    #[arg(long)]
    history: Option<PathBuf>,
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let TrainArg {
        config,
        generations,
        seed,
        name,
        output,
        history,
    } = arg;
    let config = RunConfig::load(config.as_deref(), *seed)?;
    let population =
        Population::new(config.evolution.clone()).context("Invalid evolution config")?;
    let mut simulation = Simulation::new(population, &config);

    eprintln!(
        "Training {} agents for {generations} generations ({} frames per episode)",
        config.evolution.population_size, config.evolution.episode_length
    );
    let mut last = None;
    for _ in 0..*generations {
        let summary = simulation.run_generation()?;
        print_summary(&summary);
        last = Some(summary);
    }
    let last = last.context("No generation completed")?;
    let champion = simulation
        .population()
        .champion()
        .context("No champion after training")?;

    eprintln!("Training completed.");

    let model = RunnerModel {
        name: name.clone(),
        trained_at: Utc::now(),
        generation: last.generation,
        final_fitness: last.best_fitness,
        network: champion.clone(),
    };
    Output::save_json(&model, output.clone())?;

    eprintln!();
    eprintln!("Model saved successfully");
    if let Some(path) = &output {
        eprintln!("  Path: {}", path.display());
    }
    eprintln!("  Name: {}", model.name);
    eprintln!("  Trained at: {}", model.trained_at);
    eprintln!("  Generation: {}", model.generation);
    eprintln!("  Final fitness: {:.3}", model.final_fitness);
    eprintln!("  Network: {}", model.network.shape());

    if let Some(path) = history {
        Output::save_json(simulation.population().history(), Some(path.clone()))?;
        eprintln!("History saved to {}", path.display());
    }

    Ok(())
}

fn print_summary(summary: &GenerationSummary) {
    eprintln!("Generation #{}:", summary.generation);
    eprintln!("  Fitness Stats:");
    eprintln!("    Min:    {:.3}", summary.fitness.min);
    eprintln!("    Max:    {:.3}", summary.fitness.max);
    eprintln!("    Mean:   {:.3}", summary.fitness.mean);
    eprintln!("    Stddev: {:.3}", summary.fitness.std_dev);
    eprintln!("  Delivered: {}", summary.total_delivered);
    eprintln!("  Top Agents:");
    for (i, agent) in summary.top_agents.iter().enumerate() {
        eprintln!(
            "  {i:2}: {} => {:.3} (collected {}, delivered {}, collisions {})",
            agent.id, agent.fitness, agent.collected, agent.delivered, agent.collisions
        );
    }
}
