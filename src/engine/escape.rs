//! A reference simulation engine based on escape noise.
//!
//! The engine does not integrate the membrane dynamics. The shot-noise conductances are replaced by
//! their stationary means, giving a mean membrane potential for every pair of input rates; each
//! threshold set then fires as a renewal process whose rate grows exponentially with the distance
//! between that potential and its resting threshold, up to one spike per refractory period.
use log;
use rand::Rng;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use rand_distr::{Distribution, Exp, Poisson};
use std::collections::BTreeMap;

use crate::core::result::TrialResult;
use crate::engine::config::{NeuronConfig, ThresholdConfig};
use crate::engine::{ResonanceTrial, SimulationEngine, SteadyTrial};
use crate::error::ScanError;
use crate::index;

#[derive(Debug, PartialEq, Clone)]
pub struct EscapeRateEngine {
    config: NeuronConfig,
}

impl EscapeRateEngine {
    /// Create an engine for the given neuron configuration.
    pub fn new(config: NeuronConfig) -> Result<Self, ScanError> {
        config.validate()?;
        Ok(EscapeRateEngine { config })
    }

    pub fn config(&self) -> &NeuronConfig {
        &self.config
    }

    /// The mean membrane potential under the given input rates.
    pub fn mean_potential(&self, excitatory_rate: f64, inhibitory_rate: f64, step: f64) -> f64 {
        let g_exc = self.config.excitatory.mean(excitatory_rate, step);
        let g_inh = self.config.inhibitory.mean(inhibitory_rate, step);
        let resistance = self.config.membrane.membrane_resistance;

        (self.config.membrane.resting_potential
            + resistance
                * (g_exc * self.config.excitatory.reversal
                    + g_inh * self.config.inhibitory.reversal))
            / (1.0 + resistance * (g_exc + g_inh))
    }

    /// The firing rate (1/ms) of a threshold set at the given potential.
    pub fn firing_rate(&self, threshold: &ThresholdConfig, potential: f64) -> f64 {
        let rate = self.config.escape.rate_at_threshold
            * ((potential - threshold.omega) / self.config.escape.width).exp();
        rate.min(1.0 / threshold.refractory_period)
    }

    fn check_times(duration: f64, step: f64) -> Result<(), ScanError> {
        if !(duration > 0.0 && duration.is_finite()) {
            return Err(ScanError::InvalidParameter(format!(
                "The trial duration must be positive, got {}",
                duration
            )));
        }
        if !(step > 0.0 && step.is_finite()) {
            return Err(ScanError::InvalidParameter(format!(
                "The time step must be positive, got {}",
                step
            )));
        }
        Ok(())
    }
}

/// Sample a Poisson spike count with the given mean.
fn sample_count<R: Rng>(mean: f64, rng: &mut R) -> Result<u64, ScanError> {
    if mean <= 0.0 {
        return Ok(0);
    }
    let poisson = Poisson::new(mean).map_err(|e| ScanError::InvalidParameter(e.to_string()))?;
    Ok(poisson.sample(rng) as u64)
}

/// Sample the firing times of a renewal process with dead time over `[0, duration)`, on a grid of resolution `step`.
fn sample_firing_times<R: Rng>(
    rate: f64,
    refractory_period: f64,
    duration: f64,
    step: f64,
    rng: &mut R,
) -> Result<Vec<f64>, ScanError> {
    let mut firing_times = vec![];
    if rate <= 0.0 {
        return Ok(firing_times);
    }

    // Mean inter-spike interval beyond the refractory period
    let free_interval = 1.0 / rate - refractory_period;
    let exp = if free_interval > 0.0 {
        Some(Exp::new(1.0 / free_interval).map_err(|e| ScanError::InvalidParameter(e.to_string()))?)
    } else {
        None
    };

    let mut time = match &exp {
        Some(exp) => exp.sample(rng),
        None => 0.0,
    };
    while time < duration {
        firing_times.push((time / step).floor() * step);
        time += refractory_period + exp.as_ref().map_or(0.0, |exp| exp.sample(rng));
    }

    Ok(firing_times)
}

impl SimulationEngine for EscapeRateEngine {
    fn unit_names(&self) -> Vec<String> {
        self.config.thresholds.iter().map(|t| t.name.clone()).collect()
    }

    fn run_resonance_trial(&self, trial: &ResonanceTrial) -> Result<TrialResult, ScanError> {
        Self::check_times(trial.duration, trial.step)?;
        let mut rng = ChaCha8Rng::seed_from_u64(trial.seed);
        let mut result = TrialResult::new();

        for (i, &intensity) in trial.intensities.iter().enumerate() {
            let (exc, inh) = trial.drive.rates(intensity);
            let potential = self.mean_potential(exc, inh, trial.step);
            for threshold in self.config.thresholds.iter() {
                let mean_count = self.firing_rate(threshold, potential) * trial.duration;
                let count = sample_count(mean_count, &mut rng)?;
                result.record(index![threshold.name.as_str(), intensity], count);
            }

            if trial.intensities.len() >= 100 && i % (trial.intensities.len() / 100) == 0 {
                log::trace!("Presentation {} / {}", i, trial.intensities.len());
            }
        }

        Ok(result)
    }

    fn run_steady_trial(
        &self,
        trial: &SteadyTrial,
    ) -> Result<BTreeMap<String, Vec<f64>>, ScanError> {
        Self::check_times(trial.total_duration, trial.step)?;
        let mut rng = ChaCha8Rng::seed_from_u64(trial.seed);
        let potential =
            self.mean_potential(trial.excitatory_rate, trial.inhibitory_rate, trial.step);

        self.config
            .thresholds
            .iter()
            .map(|threshold| {
                let rate = self.firing_rate(threshold, potential);
                let firing_times = sample_firing_times(
                    rate,
                    threshold.refractory_period,
                    trial.total_duration,
                    trial.step,
                    &mut rng,
                )?;
                Ok((threshold.name.clone(), firing_times))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::stimulus::StimulusDrive;
    use approx::assert_relative_eq;
    use itertools::Itertools;

    fn engine() -> EscapeRateEngine {
        EscapeRateEngine::new(NeuronConfig::default()).unwrap()
    }

    #[test]
    fn test_mean_potential() {
        let engine = engine();
        // Without input, the membrane rests
        assert_relative_eq!(engine.mean_potential(0.0, 0.0, 0.1), -80.0);
        // The potential stays between the reversal potentials
        let potential = engine.mean_potential(26.7, 3.73, 0.1);
        assert!(potential > -80.0 && potential < 0.0);
        // More excitation depolarizes
        assert!(engine.mean_potential(5.0, 3.73, 0.1) > engine.mean_potential(2.67, 3.73, 0.1));
    }

    #[test]
    fn test_firing_rate_bounded() {
        let engine = engine();
        let threshold = &engine.config().thresholds[0];
        assert_relative_eq!(
            engine.firing_rate(threshold, threshold.omega),
            engine.config().escape.rate_at_threshold
        );
        assert_relative_eq!(
            engine.firing_rate(threshold, 100.0),
            1.0 / threshold.refractory_period
        );
        assert!(engine.firing_rate(threshold, -100.0) < 1e-6);
    }

    #[test]
    fn test_resonance_trial_keys() {
        let engine = engine();
        let intensities = vec![1.0, 2.0, 1.0, 4.0];
        let trial = ResonanceTrial {
            seed: 3,
            duration: 250.0,
            step: 0.1,
            intensities: &intensities,
            drive: StimulusDrive::new(engine.config(), 0.4),
        };
        let result = engine.run_resonance_trial(&trial).unwrap();
        assert_eq!(result.len(), 4 * 3);
        for name in engine.unit_names() {
            assert_eq!(result.get(&index![name.as_str(), 1.0]).unwrap().len(), 2);
            assert_eq!(result.get(&index![name.as_str(), 4.0]).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_resonance_trial_deterministic() {
        let engine = engine();
        let intensities = vec![1.0, 10.0, 30.0];
        let mut trial = ResonanceTrial {
            seed: 11,
            duration: 1000.0,
            step: 0.1,
            intensities: &intensities,
            drive: StimulusDrive::new(engine.config(), 0.0),
        };
        let first = engine.run_resonance_trial(&trial).unwrap();
        assert_eq!(first, engine.run_resonance_trial(&trial).unwrap());

        trial.seed = 12;
        let other = engine.run_resonance_trial(&trial).unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn test_resonance_trial_invalid() {
        let engine = engine();
        let trial = ResonanceTrial {
            seed: 0,
            duration: 0.0,
            step: 0.1,
            intensities: &[1.0],
            drive: StimulusDrive::new(engine.config(), 0.0),
        };
        assert!(matches!(
            engine.run_resonance_trial(&trial),
            Err(ScanError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_steady_trial() {
        let engine = engine();
        let trial = SteadyTrial {
            seed: 5,
            total_duration: 2000.0,
            step: 0.1,
            excitatory_rate: 26.7,
            inhibitory_rate: 3.73,
        };
        let spike_trains = engine.run_steady_trial(&trial).unwrap();
        assert_eq!(
            spike_trains.keys().cloned().collect::<Vec<String>>(),
            vec!["CH", "FS", "IB", "RS"]
        );
        for (name, firing_times) in spike_trains.iter() {
            let threshold = engine
                .config()
                .thresholds
                .iter()
                .find(|t| &t.name == name)
                .unwrap();
            assert!(firing_times.iter().all(|&t| (0.0..2000.0).contains(&t)));
            assert!(firing_times
                .iter()
                .tuple_windows()
                .all(|(t1, t2)| t2 - t1 >= threshold.refractory_period - 0.1 - 1e-9));
        }
        assert_eq!(spike_trains, engine.run_steady_trial(&trial).unwrap());
    }

    #[test]
    fn test_sample_firing_times_saturated() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let firing_times = sample_firing_times(0.5, 2.0, 10.0, 0.1, &mut rng).unwrap();
        assert_eq!(firing_times.len(), 5);
        assert!(sample_firing_times(0.0, 2.0, 10.0, 0.1, &mut rng)
            .unwrap()
            .is_empty());
    }
}
