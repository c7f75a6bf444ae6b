//! Sweeps over the (time window, coefficient) grid.
//!
//! - [`config`]: Parameters of the sweeps
//! - [`seed`]: Explicit per-trial seeds
//! - [`dispatcher`]: The worker pool running the trials
//! - [`checkpoint`]: Per-grid-point checkpoints
//! - [`walker`]: The walk over the grid
//!
//! The results of a sweep are flattened into a single [`FlattenedTable`], the only artifact of a run.
use log;
use std::path::Path;

use crate::core::table::FlattenedTable;
use crate::engine::SimulationEngine;
use crate::error::ScanError;

pub mod checkpoint;
pub mod config;
pub mod dispatcher;
pub mod seed;
pub mod walker;

use checkpoint::Checkpoint;
use config::{SweepConfig, SweepMode};
use dispatcher::TrialDispatcher;
use walker::GridWalker;

/// Run a whole sweep with the given engine and flatten its results.
///
/// If a checkpoint directory is given, grid points saved there by a previous run are not simulated again.
pub fn run<E: SimulationEngine>(
    engine: E,
    config: &SweepConfig,
    mode: SweepMode,
    checkpoint_dir: Option<&Path>,
) -> Result<FlattenedTable, ScanError> {
    config.validate(mode)?;

    let dispatcher = TrialDispatcher::new(config.workers)?;
    let mut walker = GridWalker::new(engine, dispatcher);
    if let Some(dir) = checkpoint_dir {
        walker = walker.with_checkpoint(Checkpoint::open(dir)?);
    }

    let results = walker.sweep(config, mode)?;
    let table = FlattenedTable::flatten(&results)?;
    log::info!(
        "Sweep done: {} grid points flattened into {} entries",
        results.len(),
        table.len()
    );
    Ok(table)
}
