//! This crate provides tools for sweeping stimulus and noise parameters over stochastic spiking simulations in Rust.
//!
//! A sweep walks a grid of (time window, coefficient) points. For every point, independent seeded trials
//! of a simulation engine run in parallel on a fixed worker pool, and their spike counts are summed.
//! The nested results are finally flattened into a single table keyed by `(*grid_point, *inner_index)`.
//!
//! # Running a Sweep
//!
//! ```rust
//! use rusty_noise_scan::engine::escape::EscapeRateEngine;
//! use rusty_noise_scan::engine::stimulus::IntensityGrid;
//! use rusty_noise_scan::sweep::config::{SweepConfig, SweepMode};
//! use rusty_noise_scan::index;
//!
//! // A small resonance sweep: 2 time windows x 2 coefficients, 3 trials per point
//! let mut config = SweepConfig::default();
//! config.seed = 42;
//! config.workers = Some(2);
//! config.resonance.time_windows = vec![500.0, 250.0];
//! config.resonance.coefficients = vec![0.0, 1.0];
//! config.resonance.intensities = IntensityGrid { start_exponent: 0.0, stop_exponent: 1.0, count: 5, repeats: 2 };
//! config.resonance.trials_per_point = Some(3);
//!
//! let engine = EscapeRateEngine::new(config.neuron.clone()).unwrap();
//! let table = rusty_noise_scan::sweep::run(engine, &config, SweepMode::Resonance, None).unwrap();
//!
//! // One entry per grid point, unit and intensity, with one count per presentation
//! assert_eq!(table.len(), 2 * 2 * 4 * 5);
//! assert_eq!(table.get(&index![250.0, 1.0, "RS", 1.0]).unwrap().len(), 2);
//! ```
//!
//! # Binning Spike Trains
//!
//! ```rust
//! use rusty_noise_scan::core::spike_train::bin;
//!
//! let counts = bin(&[50.0, 150.0, 260.0, 1050.0], 100.0, 300.0, 0.0).unwrap();
//! assert_eq!(counts, vec![1, 1, 1]);
//! ```

pub mod core;
pub mod engine;
pub mod error;
pub mod sweep;

/// The default integration time step (ms).
pub const DEFAULT_TIME_STEP: f64 = 0.1;
