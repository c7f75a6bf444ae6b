//! Stimulus intensities and their mapping to input rates.
use rand::seq::SliceRandom;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use serde::{Deserialize, Serialize};

use crate::engine::config::NeuronConfig;
use crate::error::ScanError;

/// Maps a stimulus intensity to the excitatory and inhibitory input rates.
///
/// The excitatory rate scales with the intensity, while the coefficient sets how much of that
/// scaling is shared by the inhibitory input: `exc = exc_0 * I` and `inh = inh_0 * (1 + B * (I - 1))`.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct StimulusDrive {
    pub excitatory_rate: f64,
    pub inhibitory_rate: f64,
    pub coefficient: f64,
}

impl StimulusDrive {
    /// The drive of a neuron for a given coefficient, using the baseline rates of its conductances.
    pub fn new(neuron: &NeuronConfig, coefficient: f64) -> Self {
        StimulusDrive {
            excitatory_rate: neuron.excitatory.rate,
            inhibitory_rate: neuron.inhibitory.rate,
            coefficient,
        }
    }

    /// The (excitatory, inhibitory) rates for the given intensity. Rates are never negative.
    pub fn rates(&self, intensity: f64) -> (f64, f64) {
        let exc = self.excitatory_rate * intensity;
        let inh = self.inhibitory_rate * (1.0 + self.coefficient * (intensity - 1.0));
        (exc.max(0.0), inh.max(0.0))
    }
}

/// A grid of log-spaced stimulus intensities, `count` values from `10^start_exponent` to `10^stop_exponent`
/// (both included), each presented `repeats` times.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct IntensityGrid {
    pub start_exponent: f64,
    pub stop_exponent: f64,
    pub count: usize,
    pub repeats: usize,
}

impl IntensityGrid {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.count == 0 || self.repeats == 0 {
            return Err(ScanError::InvalidParameter(
                "The intensity grid needs at least one value and one repeat".to_string(),
            ));
        }
        if !(self.start_exponent.is_finite() && self.stop_exponent.is_finite()) {
            return Err(ScanError::InvalidParameter(
                "The intensity exponents must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// The distinct intensity levels, in increasing order of exponent.
    pub fn levels(&self) -> Vec<f64> {
        match self.count {
            0 => vec![],
            1 => vec![10_f64.powf(self.start_exponent)],
            n => {
                let step = (self.stop_exponent - self.start_exponent) / (n - 1) as f64;
                (0..n)
                    .map(|i| 10_f64.powf(self.start_exponent + i as f64 * step))
                    .collect()
            }
        }
    }

    /// The presentation schedule: every level repeated `repeats` times, randomly permuted.
    ///
    /// The permutation only depends on the seed. Consumers must still index results by intensity
    /// value rather than by position in the schedule.
    pub fn schedule(&self, seed: u64) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut schedule: Vec<f64> = self
            .levels()
            .into_iter()
            .flat_map(|level| std::iter::repeat(level).take(self.repeats))
            .collect();
        schedule.shuffle(&mut rng);
        schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use itertools::Itertools;

    #[test]
    fn test_drive_rates() {
        let drive = StimulusDrive {
            excitatory_rate: 2.67,
            inhibitory_rate: 3.73,
            coefficient: 0.0,
        };
        let (exc, inh) = drive.rates(10.0);
        assert_relative_eq!(exc, 26.7);
        assert_relative_eq!(inh, 3.73);

        let drive = StimulusDrive {
            coefficient: 1.0,
            ..drive
        };
        let (exc, inh) = drive.rates(10.0);
        assert_relative_eq!(exc, 26.7);
        assert_relative_eq!(inh, 37.3);

        // Unit intensity is the baseline whatever the coefficient
        let (exc, inh) = StimulusDrive::new(&NeuronConfig::default(), 0.6).rates(1.0);
        assert_relative_eq!(exc, 2.67);
        assert_relative_eq!(inh, 3.73);
    }

    #[test]
    fn test_levels() {
        let grid = IntensityGrid {
            start_exponent: 0.0,
            stop_exponent: 1.6,
            count: 100,
            repeats: 2,
        };
        let levels = grid.levels();
        assert_eq!(levels.len(), 100);
        assert_relative_eq!(levels[0], 1.0);
        assert_relative_eq!(levels[99], 10_f64.powf(1.6), max_relative = 1e-12);
        assert!(levels.iter().tuple_windows().all(|(a, b)| a < b));

        let single = IntensityGrid {
            count: 1,
            ..grid.clone()
        };
        assert_eq!(single.levels(), vec![1.0]);
    }

    #[test]
    fn test_schedule() {
        let grid = IntensityGrid {
            start_exponent: 0.0,
            stop_exponent: 1.0,
            count: 20,
            repeats: 3,
        };
        let schedule = grid.schedule(7);
        assert_eq!(schedule.len(), 60);
        assert_eq!(schedule, grid.schedule(7));

        // Every level appears exactly `repeats` times
        for level in grid.levels() {
            assert_eq!(schedule.iter().filter(|&&s| s == level).count(), 3);
        }

        let mut sorted = schedule.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        assert_ne!(schedule, sorted);
    }

    #[test]
    fn test_validate() {
        let grid = IntensityGrid {
            start_exponent: 0.0,
            stop_exponent: 1.0,
            count: 0,
            repeats: 1,
        };
        assert!(grid.validate().is_err());
        let grid = IntensityGrid { count: 3, ..grid };
        assert!(grid.validate().is_ok());
    }
}
