//! Interface to the simulation engine producing the raw data of the sweeps.
//!
//! The sweeps only see the engine through the [`SimulationEngine`] trait: one call runs one trial,
//! with every source of randomness derived from the seed carried by the trial.
//!
//! - [`config`]: Configuration of the simulated neuron
//! - [`stimulus`]: Stimulus intensities and input rates
//! - [`escape`]: A reference engine based on escape noise
use std::collections::BTreeMap;

use crate::core::result::TrialResult;
use crate::engine::stimulus::StimulusDrive;
use crate::error::ScanError;

pub mod config;
pub mod escape;
pub mod stimulus;

/// One stochastic-resonance trial: a sequence of stimulus presentations of equal duration.
#[derive(Debug, PartialEq, Clone)]
pub struct ResonanceTrial<'a> {
    /// The seed of every random draw of the trial.
    pub seed: u64,
    /// The duration of each presentation (ms).
    pub duration: f64,
    /// The integration time step (ms).
    pub step: f64,
    /// The intensities, in presentation order.
    pub intensities: &'a [f64],
    pub drive: StimulusDrive,
}

/// One steady-state trial: constant input rates over the whole duration.
#[derive(Debug, PartialEq, Clone)]
pub struct SteadyTrial {
    pub seed: u64,
    pub total_duration: f64,
    pub step: f64,
    pub excitatory_rate: f64,
    pub inhibitory_rate: f64,
}

pub trait SimulationEngine: Sync {
    /// The names of the simulated units.
    fn unit_names(&self) -> Vec<String>;

    /// Run a stochastic-resonance trial.
    /// The result is keyed by (unit name, intensity), with one spike count per presentation of the intensity.
    /// Two calls with the same trial must return the same result.
    fn run_resonance_trial(&self, trial: &ResonanceTrial) -> Result<TrialResult, ScanError>;

    /// Run a steady-state trial and return the firing times of every unit in `[0, total_duration)`.
    fn run_steady_trial(&self, trial: &SteadyTrial)
        -> Result<BTreeMap<String, Vec<f64>>, ScanError>;
}
