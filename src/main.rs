use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use longwinter::{
    config::{Scenario, ScenarioLoader},
    engine::{EngineBuilder, EngineSettings},
    systems::{InfluenceSystem, TransitionSystem, WorkerSystem},
    world::{Outcome, SimWorld},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "longwinter headless simulation runner")]
struct Cli {
    /// Path to a scenario YAML file (built-in scenario when omitted)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Override tick count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut scenario = match &cli.scenario {
        Some(path) => ScenarioLoader::new(".").load(path)?,
        None => Scenario::frozen_valley(),
    };
    if let Some(seed) = cli.seed {
        scenario.seed = seed;
    }
    let ticks = scenario.ticks(cli.ticks);

    let mut world = SimWorld::generate(&scenario);
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        dt_seconds: scenario.dt_seconds,
    };
    let mut engine = EngineBuilder::new(settings)
        .with_system(InfluenceSystem::new())
        .with_system(WorkerSystem::new())
        .with_system(TransitionSystem::new())
        .build();

    let outcome = engine.run(&mut world, ticks)?;
    let verdict = match outcome {
        Some(Outcome::Victory) => "victory",
        Some(Outcome::Defeat) => "defeat",
        None => "still burning",
    };
    println!(
        "Scenario '{}' ran {} ticks: {}. Wood: {}, workers: {}.",
        scenario.name,
        engine.current_tick(),
        verdict,
        world.inventory.wood(),
        world.worker_count()
    );
    Ok(())
}
