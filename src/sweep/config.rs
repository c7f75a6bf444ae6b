//! Configuration of the sweeps, loaded from a single JSON document.
use itertools::iproduct;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use crate::core::key::Index;
use crate::core::spike_train::num_bins;
use crate::engine::config::NeuronConfig;
use crate::engine::stimulus::IntensityGrid;
use crate::error::ScanError;
use crate::index;
use crate::DEFAULT_TIME_STEP;

/// The two kinds of sweep.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepMode {
    /// Many seeded trials per (time window, coefficient), summed into one result per grid point.
    Resonance,
    /// One steady-state scan per coefficient, binned with every time window.
    Steady,
}

impl FromStr for SweepMode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "resonance" => Ok(SweepMode::Resonance),
            "steady" => Ok(SweepMode::Steady),
            _ => Err(ScanError::InvalidParameter(format!(
                "Unknown sweep mode: {} (expected resonance or steady)",
                s
            ))),
        }
    }
}

fn check_positive(name: &str, values: &[f64]) -> Result<(), ScanError> {
    if values.is_empty() {
        return Err(ScanError::InvalidParameter(format!(
            "At least one {} is required",
            name
        )));
    }
    if let Some(v) = values.iter().find(|v| !(**v > 0.0 && v.is_finite())) {
        return Err(ScanError::InvalidParameter(format!(
            "Every {} must be positive, got {}",
            name, v
        )));
    }
    Ok(())
}

fn check_finite(name: &str, values: &[f64]) -> Result<(), ScanError> {
    if values.is_empty() {
        return Err(ScanError::InvalidParameter(format!(
            "At least one {} is required",
            name
        )));
    }
    if let Some(v) = values.iter().find(|v| !v.is_finite()) {
        return Err(ScanError::InvalidParameter(format!(
            "Every {} must be finite, got {}",
            name, v
        )));
    }
    Ok(())
}

/// Collect the keys, failing on the first repeated one.
fn unique_keys(name: &str, keys: impl Iterator<Item = Index>) -> Result<Vec<Index>, ScanError> {
    let mut seen = HashSet::new();
    let mut unique = vec![];
    for key in keys {
        if !seen.insert(key.clone()) {
            return Err(ScanError::InvalidParameter(format!(
                "Duplicate {} {}",
                name, key
            )));
        }
        unique.push(key);
    }
    Ok(unique)
}

/// The stochastic-resonance sweep.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResonanceSweep {
    /// Duration of each stimulus presentation (ms), outer loop.
    pub time_windows: Vec<f64>,
    /// Input correlation coefficients, inner loop.
    pub coefficients: Vec<f64>,
    pub intensities: IntensityGrid,
    /// Trials per grid point, one per worker if not set.
    pub trials_per_point: Option<usize>,
}

impl Default for ResonanceSweep {
    fn default() -> Self {
        ResonanceSweep {
            time_windows: vec![1000.0, 750.0, 500.0, 250.0],
            coefficients: vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0],
            intensities: IntensityGrid {
                start_exponent: 0.0,
                stop_exponent: 1.6,
                count: 100,
                repeats: 2,
            },
            trials_per_point: None,
        }
    }
}

impl ResonanceSweep {
    pub fn validate(&self) -> Result<(), ScanError> {
        check_positive("time window", &self.time_windows)?;
        check_finite("coefficient", &self.coefficients)?;
        self.intensities.validate()?;
        if self.trials_per_point == Some(0) {
            return Err(ScanError::InvalidParameter(
                "At least one trial per grid point is required".to_string(),
            ));
        }
        self.grid_points()?;
        Ok(())
    }

    /// The grid points (time window, coefficient), time window in the outer loop.
    pub fn grid_points(&self) -> Result<Vec<Index>, ScanError> {
        unique_keys(
            "grid point",
            iproduct!(self.time_windows.iter(), self.coefficients.iter())
                .map(|(&tw, &coefficient)| index![tw, coefficient]),
        )
    }
}

/// The steady-state sweep.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SteadySweep {
    /// Bin windows (ms) applied to every spike train.
    pub time_windows: Vec<f64>,
    pub coefficients: Vec<f64>,
    pub intensities: IntensityGrid,
    /// Initial transient discarded before binning (ms).
    pub offset: f64,
    /// Simulated duration, transient included (ms).
    pub total_duration: f64,
}

impl Default for SteadySweep {
    fn default() -> Self {
        SteadySweep {
            time_windows: vec![250.0, 500.0, 750.0, 1000.0],
            coefficients: (0..6).map(|i| i as f64 / 5.0).collect(),
            intensities: IntensityGrid {
                start_exponent: 0.0,
                stop_exponent: 1.6,
                count: 50,
                repeats: 1,
            },
            offset: 1000.0,
            total_duration: 11000.0,
        }
    }
}

impl SteadySweep {
    pub fn validate(&self) -> Result<(), ScanError> {
        check_positive("time window", &self.time_windows)?;
        check_finite("coefficient", &self.coefficients)?;
        self.intensities.validate()?;
        if self.intensities.repeats != 1 {
            return Err(ScanError::InvalidParameter(
                "Each intensity is scanned once in the steady sweep".to_string(),
            ));
        }
        if !(self.total_duration.is_finite() && self.offset >= 0.0 && self.offset < self.total_duration)
        {
            return Err(ScanError::InvalidParameter(format!(
                "The offset must be in [0, {}), got {}",
                self.total_duration, self.offset
            )));
        }
        for &tw in self.time_windows.iter() {
            if num_bins(tw, self.total_duration, self.offset)? == 0 {
                return Err(ScanError::InvalidParameter(format!(
                    "The time window {} does not fit in the recorded duration",
                    tw
                )));
            }
        }
        self.grid_points()?;
        unique_keys(
            "coefficient",
            self.coefficients.iter().map(|&coefficient| index![coefficient]),
        )?;
        unique_keys(
            "intensity",
            self.intensities.levels().into_iter().map(|level| index![level]),
        )?;
        Ok(())
    }

    /// The grid points (time window).
    pub fn grid_points(&self) -> Result<Vec<Index>, ScanError> {
        unique_keys("grid point", self.time_windows.iter().map(|&tw| index![tw]))
    }
}

/// The whole configuration of a run.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Base seed from which every trial seed is derived.
    pub seed: u64,
    /// Size of the worker pool, one worker per core if not set.
    pub workers: Option<usize>,
    /// Integration time step (ms).
    pub step: f64,
    pub neuron: NeuronConfig,
    pub resonance: ResonanceSweep,
    pub steady: SteadySweep,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            seed: 0,
            workers: None,
            step: DEFAULT_TIME_STEP,
            neuron: NeuronConfig::default(),
            resonance: ResonanceSweep::default(),
            steady: SteadySweep::default(),
        }
    }
}

impl SweepConfig {
    /// Load a configuration from a JSON file. Missing fields take their default value.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let file = File::open(&path).map_err(|e| ScanError::IOError(e.to_string()))?;
        let config: SweepConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ScanError::IOError(e.to_string()))?;
        Ok(config)
    }

    /// Check the parameters of the given sweep before any work starts.
    pub fn validate(&self, mode: SweepMode) -> Result<(), ScanError> {
        if !(self.step > 0.0 && self.step.is_finite()) {
            return Err(ScanError::InvalidParameter(format!(
                "The time step must be positive, got {}",
                self.step
            )));
        }
        if self.workers == Some(0) {
            return Err(ScanError::InvalidParameter(
                "The worker pool needs at least one worker".to_string(),
            ));
        }
        self.neuron.validate()?;
        match mode {
            SweepMode::Resonance => self.resonance.validate(),
            SweepMode::Steady => self.steady.validate(),
        }
    }
}
