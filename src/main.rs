use anyhow::Result;
use clap::Parser;
use env_logger::Builder;
use log::{debug, info, LevelFilter};
use spatial_egt::egt_common::SimulationConfig;
use spatial_egt::run_experiment;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Experiment file (.toml or .json)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Replicate seed, overrides [run] seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output directory, overrides [output] directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut logger = Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter(None, if args.verbose { LevelFilter::Debug } else { LevelFilter::Info });
    }
    logger.init();

    info!("Starting spatial EGT experiment...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        config.run.seed = seed;
    }
    let output_dir = args.output.unwrap_or_else(|| PathBuf::from(&config.output.directory));
    debug!("Configuration: {:#?}", config);

    info!(
        "Scenarios {:?}, {} ticks, seed {}, writing to {}",
        config.scenarios().iter().map(|s| s.name()).collect::<Vec<_>>(),
        config.run.num_ticks,
        config.run.seed,
        output_dir.display()
    );

    let start_time = Instant::now();
    let summaries = run_experiment(&config, &output_dir)?;
    for s in &summaries {
        info!(
            "{}: {} -> {} cells ({} S, {} R)",
            s.model,
            s.starting_population,
            s.final_population.total(),
            s.final_population.sensitive,
            s.final_population.resistant
        );
    }
    info!("Experiment finished in {:.3} seconds.", start_time.elapsed().as_secs_f64());
    Ok(())
}
