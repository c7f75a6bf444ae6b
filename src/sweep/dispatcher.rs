//! Parallel dispatch of independent jobs on a fixed-size worker pool.
use log;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};

use crate::core::key::Index;
use crate::core::result::TrialResult;
use crate::engine::stimulus::StimulusDrive;
use crate::engine::{ResonanceTrial, SimulationEngine};
use crate::error::ScanError;
use crate::sweep::seed::derive_seed;

/// The settings shared by all trials of a resonance grid point.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct TrialPlan<'a> {
    pub base_seed: u64,
    pub duration: f64,
    pub step: f64,
    pub intensities: &'a [f64],
    pub drive: StimulusDrive,
}

/// A worker pool created once and reused for every batch of a sweep.
///
/// Each batch is a scatter of independent jobs followed by a full barrier: [`TrialDispatcher::submit_batch`]
/// only returns once every job of the batch is done, with the results in job order.
#[derive(Debug)]
pub struct TrialDispatcher {
    pool: ThreadPool,
    num_workers: usize,
}

impl TrialDispatcher {
    /// Create a pool with the given number of workers, or one worker per available core.
    pub fn new(num_workers: Option<usize>) -> Result<Self, ScanError> {
        let num_workers = match num_workers {
            Some(0) => {
                return Err(ScanError::InvalidParameter(
                    "The worker pool needs at least one worker".to_string(),
                ))
            }
            Some(n) => n,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .thread_name(|i| format!("scan-worker-{}", i))
            .build()
            .map_err(|e| ScanError::InvalidParameter(e.to_string()))?;
        log::info!("Worker pool started with {} workers", num_workers);
        Ok(TrialDispatcher { pool, num_workers })
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Run every job of the batch on the pool and wait for all of them.
    ///
    /// A job returning an error or panicking makes the whole batch fail with [`ScanError::WorkerFailure`];
    /// failed jobs are never retried and no partial results are returned.
    pub fn submit_batch<J, T, F>(&self, jobs: Vec<J>, task: F) -> Result<Vec<T>, ScanError>
    where
        J: Send,
        T: Send,
        F: Fn(usize, J) -> Result<T, ScanError> + Sync,
    {
        let num_jobs = jobs.len();
        log::debug!("Dispatching {} jobs", num_jobs);
        let results = self.pool.install(|| {
            jobs.into_par_iter()
                .enumerate()
                .map(|(job, input)| {
                    match panic::catch_unwind(AssertUnwindSafe(|| task(job, input))) {
                        Ok(Ok(output)) => Ok(output),
                        Ok(Err(e)) => Err(ScanError::WorkerFailure {
                            job,
                            reason: e.to_string(),
                        }),
                        Err(payload) => Err(ScanError::WorkerFailure {
                            job,
                            reason: panic_message(payload.as_ref()),
                        }),
                    }
                })
                .collect::<Result<Vec<T>, ScanError>>()
        })?;
        log::debug!("All {} jobs completed", num_jobs);
        Ok(results)
    }

    /// Run `trial_count` independent resonance trials of a grid point, each with its own seed.
    pub fn run_trials<E: SimulationEngine>(
        &self,
        engine: &E,
        grid_point: &Index,
        trial_count: usize,
        plan: &TrialPlan,
    ) -> Result<Vec<TrialResult>, ScanError> {
        let seeds: Vec<u64> = (0..trial_count)
            .map(|trial| derive_seed(plan.base_seed, grid_point, trial))
            .collect();

        self.submit_batch(seeds, |trial, seed| {
            log::debug!("Trial {} of grid point {} (seed {})", trial, grid_point, seed);
            engine.run_resonance_trial(&ResonanceTrial {
                seed,
                duration: plan.duration,
                step: plan.step,
                intensities: plan.intensities,
                drive: plan.drive,
            })
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_new() {
        assert!(matches!(
            TrialDispatcher::new(Some(0)),
            Err(ScanError::InvalidParameter(_))
        ));
        assert_eq!(TrialDispatcher::new(Some(3)).unwrap().num_workers(), 3);
        assert!(TrialDispatcher::new(None).unwrap().num_workers() >= 1);
    }

    #[test]
    fn test_submit_batch_keeps_order() {
        let dispatcher = TrialDispatcher::new(Some(4)).unwrap();
        let jobs: Vec<u64> = (0..32).collect();
        let results = dispatcher
            .submit_batch(jobs, |i, job| {
                // Later jobs finish first
                thread::sleep(Duration::from_millis(32 - job));
                Ok((i, job * job))
            })
            .unwrap();
        assert_eq!(
            results,
            (0..32u64).map(|i| (i as usize, i * i)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_submit_batch_error() {
        let dispatcher = TrialDispatcher::new(Some(2)).unwrap();
        let result = dispatcher.submit_batch(vec![0, 1, 2, 3], |_, job| {
            if job == 2 {
                Err(ScanError::InvalidParameter("bad job".to_string()))
            } else {
                Ok(job)
            }
        });
        assert_eq!(
            result,
            Err(ScanError::WorkerFailure {
                job: 2,
                reason: "Invalid parameters: bad job".to_string()
            })
        );
    }

    #[test]
    fn test_submit_batch_panic() {
        let dispatcher = TrialDispatcher::new(Some(2)).unwrap();
        let result = dispatcher.submit_batch(vec![0, 1], |_, job| {
            if job == 1 {
                panic!("engine crashed");
            }
            Ok(job)
        });
        assert_eq!(
            result,
            Err(ScanError::WorkerFailure {
                job: 1,
                reason: "panicked: engine crashed".to_string()
            })
        );

        // The pool survives a failed batch
        assert_eq!(
            dispatcher.submit_batch(vec![1, 2], |_, job| Ok(job + 1)),
            Ok(vec![2, 3])
        );
    }
}
