//! Configuration of the simulated neuron, i.e., the input of the simulation engine.
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Passive membrane parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MembraneConfig {
    /// Resting potential (mV).
    pub resting_potential: f64,
    /// Membrane resistance (MOhm).
    pub membrane_resistance: f64,
    /// Membrane capacitance (nF).
    pub membrane_capacitance: f64,
}

impl Default for MembraneConfig {
    fn default() -> Self {
        MembraneConfig {
            resting_potential: -80.0,
            membrane_resistance: 50.0,
            membrane_capacitance: 0.1,
        }
    }
}

/// A multi-timescale adaptive threshold (MAT). Each threshold set is one simulated unit.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub name: String,
    pub alpha1: f64,
    pub alpha2: f64,
    pub tau1: f64,
    pub tau2: f64,
    /// Resting value of the threshold (mV).
    pub omega: f64,
    pub refractory_period: f64,
}

impl ThresholdConfig {
    pub fn new(name: &str, alpha1: f64, alpha2: f64, omega: f64) -> Self {
        ThresholdConfig {
            name: name.to_string(),
            alpha1,
            alpha2,
            tau1: 10.0,
            tau2: 200.0,
            omega,
            refractory_period: 2.0,
        }
    }

    /// Regular spiking, intrinsic bursting, fast spiking and chattering units.
    pub fn standard_set() -> Vec<ThresholdConfig> {
        vec![
            ThresholdConfig::new("RS", 30.0, 2.0, -65.0),
            ThresholdConfig::new("IB", 7.5, 1.5, -64.3),
            ThresholdConfig::new("FS", 10.0, 0.2, -62.4),
            ThresholdConfig::new("CH", -0.5, 0.4, -61.8),
        ]
    }
}

/// A shot-noise conductance driven by Poisson input events.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ConductanceConfig {
    /// Mean number of input events per time step.
    pub rate: f64,
    /// Conductance increment per input event (uS).
    pub g_peak: f64,
    /// Reversal potential (mV).
    pub reversal: f64,
    /// Decay time constant (ms).
    pub decay: f64,
}

impl ConductanceConfig {
    pub fn excitatory() -> Self {
        ConductanceConfig {
            rate: 2.67,
            g_peak: 0.0015,
            reversal: 0.0,
            decay: 3.0,
        }
    }

    pub fn inhibitory() -> Self {
        ConductanceConfig {
            rate: 3.73,
            g_peak: 0.0015,
            reversal: -75.0,
            decay: 10.0,
        }
    }

    /// Stationary mean of the conductance for a given event rate and time step.
    pub fn mean(&self, rate: f64, step: f64) -> f64 {
        let decay = (-step / self.decay).exp();
        rate * self.g_peak * decay / (1.0 - decay)
    }
}

/// Parameters of the escape noise mapping the distance to threshold into a firing rate.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct EscapeConfig {
    /// Firing rate at threshold (1/ms).
    pub rate_at_threshold: f64,
    /// Voltage scale of the exponential escape (mV).
    pub width: f64,
}

impl Default for EscapeConfig {
    fn default() -> Self {
        EscapeConfig {
            rate_at_threshold: 0.01,
            width: 2.0,
        }
    }
}

/// The full neuron configuration: membrane, threshold sets and conductance processes.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuronConfig {
    pub membrane: MembraneConfig,
    pub thresholds: Vec<ThresholdConfig>,
    pub excitatory: ConductanceConfig,
    pub inhibitory: ConductanceConfig,
    pub escape: EscapeConfig,
}

impl Default for NeuronConfig {
    fn default() -> Self {
        NeuronConfig {
            membrane: MembraneConfig::default(),
            thresholds: ThresholdConfig::standard_set(),
            excitatory: ConductanceConfig::excitatory(),
            inhibitory: ConductanceConfig::inhibitory(),
            escape: EscapeConfig::default(),
        }
    }
}

impl NeuronConfig {
    /// Membrane time constant (ms).
    pub fn time_constant(&self) -> f64 {
        self.membrane.membrane_resistance * self.membrane.membrane_capacitance
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if !(self.membrane.membrane_resistance > 0.0 && self.membrane.membrane_capacitance > 0.0) {
            return Err(ScanError::InvalidParameter(
                "Membrane resistance and capacitance must be positive".to_string(),
            ));
        }
        if self.thresholds.is_empty() {
            return Err(ScanError::InvalidParameter(
                "At least one threshold set is required".to_string(),
            ));
        }
        let mut names: Vec<&str> = self.thresholds.iter().map(|t| t.name.as_str()).collect();
        names.sort();
        if let Some(w) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(ScanError::InvalidParameter(format!(
                "Duplicate threshold set name: {}",
                w[0]
            )));
        }
        for threshold in self.thresholds.iter() {
            if !(threshold.refractory_period > 0.0 && threshold.tau1 > 0.0 && threshold.tau2 > 0.0)
            {
                return Err(ScanError::InvalidParameter(format!(
                    "Threshold set {}: time constants and refractory period must be positive",
                    threshold.name
                )));
            }
        }
        for conductance in [&self.excitatory, &self.inhibitory] {
            if !(conductance.rate >= 0.0 && conductance.g_peak >= 0.0 && conductance.decay > 0.0) {
                return Err(ScanError::InvalidParameter(
                    "Conductance rates and peaks must be non-negative, decays positive".to_string(),
                ));
            }
        }
        if !(self.escape.rate_at_threshold > 0.0 && self.escape.width > 0.0) {
            return Err(ScanError::InvalidParameter(
                "Escape rate and width must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
