use clap::Parser;
use log;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use rusty_noise_scan::engine::escape::EscapeRateEngine;
use rusty_noise_scan::error::ScanError;
use rusty_noise_scan::sweep;
use rusty_noise_scan::sweep::config::{SweepConfig, SweepMode};

#[derive(Parser, Debug)]
struct Args {
    /// A JSON configuration file, missing fields take their default value
    #[arg(long)]
    config: Option<PathBuf>,
    /// The sweep to run, must be one of: resonance, steady
    #[arg(long, default_value = "resonance")]
    mode: SweepMode,
    /// The base seed of all trials (overrides the configuration file)
    #[arg(long)]
    seed: Option<u64>,
    /// The number of workers, one per core by default (overrides the configuration file)
    #[arg(long)]
    workers: Option<usize>,
    /// The number of trials per grid point of the resonance sweep (overrides the configuration file)
    #[arg(long)]
    trials: Option<usize>,
    /// The path of the output table, derived from the arguments by default
    #[arg(long)]
    output: Option<PathBuf>,
    /// A directory for per-grid-point checkpoints, disabled by default
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,
    /// The directory of the log files
    #[arg(long, default_value = "log")]
    log_dir: PathBuf,
}

fn init_logger(log_path: &Path) -> Result<(), ScanError> {
    let pattern = "{d} {l} - {m}{n}";
    let logfile = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build(log_path)
        .map_err(|e| ScanError::IOError(e.to_string()))?;
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(
            Root::builder()
                .appender("logfile")
                .appender("stdout")
                .build(LevelFilter::Info),
        )
        .map_err(|e| ScanError::IOError(e.to_string()))?;

    log4rs::init_config(config).map_err(|e| ScanError::IOError(e.to_string()))?;
    Ok(())
}

fn main() -> Result<(), ScanError> {
    let args = Args::parse();

    let mut hasher = Sha256::new();
    hasher.update(format!("{:?}", args));
    let hash = format!("{:x}", hasher.finalize());

    init_logger(&args.log_dir.join(format!("{}.log", hash)))?;
    log::info!("{:?}", args);

    let mut config = match &args.config {
        Some(path) => SweepConfig::load_from(path)?,
        None => SweepConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.workers.is_some() {
        config.workers = args.workers;
    }
    if args.trials.is_some() {
        config.resonance.trials_per_point = args.trials;
    }
    config.validate(args.mode)?;
    log::info!("Configuration: {:?}", config);

    let engine = EscapeRateEngine::new(config.neuron.clone())?;
    let table = sweep::run(engine, &config, args.mode, args.checkpoint_dir.as_deref())?;
    log::info!("Sweep: done!");

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("results/{}.json", hash)));
    table.save_to(&output)?;
    log::info!("Table saving: done! Saved to {}", output.display());

    Ok(())
}
