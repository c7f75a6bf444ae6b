//! Core module defining the data structures shared by all sweeps.
//!
//! It consists of the following components:
//!
//! - [`key`]: Levels and multi-level indices addressing results
//! - [`spike_train`]: Binning of spike trains into spike counts
//! - [`result`]: Trial results and their aggregation
//! - [`table`]: Flattening of nested results into a single persisted table
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeMap;
//! use rusty_noise_scan::core::{result::TrialResult, spike_train::bin, table::FlattenedTable};
//! use rusty_noise_scan::index;
//!
//! // Two trials of the same grid point
//! let mut trials = vec![];
//! for firing_times in [vec![10.0, 120.0], vec![20.0, 30.0, 250.0]] {
//!     let mut trial = TrialResult::new();
//!     trial.insert(index!["RS", 1.0], bin(&firing_times, 100.0, 300.0, 0.0).unwrap());
//!     trials.push(trial);
//! }
//!
//! // Sum the trials and flatten the result
//! let mut nested = BTreeMap::new();
//! nested.insert(index![100.0, 0.0], TrialResult::aggregate(&trials).unwrap());
//! let table = FlattenedTable::flatten(&nested).unwrap();
//!
//! assert_eq!(table.get(&index![100.0, 0.0, "RS", 1.0]), Some(&vec![3, 1, 1]));
//! ```
pub mod key;
pub mod result;
pub mod spike_train;
pub mod table;
