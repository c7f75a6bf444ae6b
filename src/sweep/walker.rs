//! Iteration over the parameter grid of a sweep.
use itertools::iproduct;
use log;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::key::Index;
use crate::core::result::TrialResult;
use crate::core::spike_train::bin;
use crate::engine::config::NeuronConfig;
use crate::engine::stimulus::StimulusDrive;
use crate::engine::{SimulationEngine, SteadyTrial};
use crate::error::ScanError;
use crate::index;
use crate::sweep::checkpoint::{fingerprint, Checkpoint};
use crate::sweep::config::{SweepConfig, SweepMode};
use crate::sweep::dispatcher::{TrialDispatcher, TrialPlan};
use crate::sweep::seed::derive_seed;

/// Everything the aggregate of a resonance grid point depends on, besides the engine itself.
#[derive(Debug, Serialize)]
struct PointSettings<'a> {
    grid_point: &'a Index,
    trials: usize,
    plan: &'a TrialPlan<'a>,
    neuron: &'a NeuronConfig,
}

/// Walks the grid of a sweep, one grid point at a time, dispatching the work of each point on the worker pool.
#[derive(Debug)]
pub struct GridWalker<E: SimulationEngine> {
    engine: E,
    dispatcher: TrialDispatcher,
    checkpoint: Option<Checkpoint>,
}

impl<E: SimulationEngine> GridWalker<E> {
    pub fn new(engine: E, dispatcher: TrialDispatcher) -> Self {
        GridWalker {
            engine,
            dispatcher,
            checkpoint: None,
        }
    }

    /// Save every finished grid point to the given store, and reuse the points already saved there.
    pub fn with_checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn dispatcher(&self) -> &TrialDispatcher {
        &self.dispatcher
    }

    /// Run the sweep of the given mode and return its results, grid point by grid point.
    pub fn sweep(
        &self,
        config: &SweepConfig,
        mode: SweepMode,
    ) -> Result<BTreeMap<Index, TrialResult>, ScanError> {
        match mode {
            SweepMode::Resonance => self.sweep_resonance(config),
            SweepMode::Steady => self.sweep_steady(config),
        }
    }

    /// Run the stochastic-resonance sweep.
    ///
    /// For every (time window, coefficient), time window in the outer loop, the trials of the point are
    /// run in parallel and summed. The result of each point is keyed by (unit name, intensity).
    /// All trials present the same shuffled intensity schedule.
    pub fn sweep_resonance(
        &self,
        config: &SweepConfig,
    ) -> Result<BTreeMap<Index, TrialResult>, ScanError> {
        config.validate(SweepMode::Resonance)?;
        let sweep = &config.resonance;
        let trials_per_point = sweep
            .trials_per_point
            .unwrap_or(self.dispatcher.num_workers());
        let schedule = sweep.intensities.schedule(config.seed);
        let num_points = sweep.time_windows.len() * sweep.coefficients.len();

        log::info!(
            "Resonance sweep over {} grid points, {} trials per point, {} presentations per trial",
            num_points,
            trials_per_point,
            schedule.len()
        );

        let mut results = BTreeMap::new();
        for (i, (&tw, &coefficient)) in
            iproduct!(sweep.time_windows.iter(), sweep.coefficients.iter()).enumerate()
        {
            let grid_point = index![tw, coefficient];
            let plan = TrialPlan {
                base_seed: config.seed,
                duration: tw,
                step: config.step,
                intensities: &schedule,
                drive: StimulusDrive::new(&config.neuron, coefficient),
            };
            let store = match &self.checkpoint {
                Some(checkpoint) => {
                    let settings = fingerprint(&PointSettings {
                        grid_point: &grid_point,
                        trials: trials_per_point,
                        plan: &plan,
                        neuron: &config.neuron,
                    })?;
                    Some((checkpoint, settings))
                }
                None => None,
            };

            let restored = match &store {
                Some((checkpoint, settings)) => checkpoint.load(&grid_point, settings)?,
                None => None,
            };
            let aggregate = match restored {
                Some(aggregate) => aggregate,
                None => {
                    log::info!(
                        "Grid point {} / {}: time window {} ms, coefficient {}",
                        i + 1,
                        num_points,
                        tw,
                        coefficient
                    );
                    let trials = self.dispatcher.run_trials(
                        &self.engine,
                        &grid_point,
                        trials_per_point,
                        &plan,
                    )?;
                    let aggregate = TrialResult::aggregate(&trials)?;
                    if let Some((checkpoint, settings)) = &store {
                        checkpoint.store(&grid_point, settings, &aggregate)?;
                    }
                    aggregate
                }
            };

            if results.insert(grid_point.clone(), aggregate).is_some() {
                return Err(ScanError::FlattenCollision(format!(
                    "grid point {} visited twice",
                    grid_point
                )));
            }
        }

        Ok(results)
    }

    /// Run the steady-state sweep.
    ///
    /// One job per coefficient scans every intensity level, then bins the spike train of every unit with
    /// every time window. The result of each time window is keyed by (unit name, coefficient, intensity).
    pub fn sweep_steady(
        &self,
        config: &SweepConfig,
    ) -> Result<BTreeMap<Index, TrialResult>, ScanError> {
        config.validate(SweepMode::Steady)?;
        let sweep = &config.steady;
        let levels = sweep.intensities.levels();

        log::info!(
            "Steady sweep over {} coefficients and {} intensities, binned with {} time windows",
            sweep.coefficients.len(),
            levels.len(),
            sweep.time_windows.len()
        );

        let batches = self
            .dispatcher
            .submit_batch(sweep.coefficients.clone(), |_, coefficient| {
                let drive = StimulusDrive::new(&config.neuron, coefficient);
                let mut binned = vec![];
                for &intensity in levels.iter() {
                    let (excitatory_rate, inhibitory_rate) = drive.rates(intensity);
                    let spike_trains = self.engine.run_steady_trial(&SteadyTrial {
                        seed: derive_seed(config.seed, &index![coefficient, intensity], 0),
                        total_duration: sweep.total_duration,
                        step: config.step,
                        excitatory_rate,
                        inhibitory_rate,
                    })?;

                    for (unit, firing_times) in spike_trains.iter() {
                        for &tw in sweep.time_windows.iter() {
                            let counts =
                                bin(firing_times, tw, sweep.total_duration, sweep.offset)?;
                            binned.push((
                                index![tw],
                                index![unit.as_str(), coefficient, intensity],
                                counts,
                            ));
                        }
                    }
                }
                log::info!("Steady scan done for coefficient {}", coefficient);
                Ok(binned)
            })?;

        let mut results: BTreeMap<Index, TrialResult> = BTreeMap::new();
        for (grid_point, inner_index, counts) in batches.into_iter().flatten() {
            let result = results.entry(grid_point.clone()).or_default();
            if result.insert(inner_index.clone(), counts).is_some() {
                return Err(ScanError::FlattenCollision(format!(
                    "inner index {} produced twice for grid point {}",
                    inner_index, grid_point
                )));
            }
        }

        Ok(results)
    }
}
