//! Error module for the Rusty Noise Scan library.
use std::error::Error;
use std::fmt;

/// Error types for the library.
#[derive(Debug, PartialEq)]
pub enum ScanError {
    /// A dispatched job failed (returned an error or panicked) while simulating.
    WorkerFailure { job: usize, reason: String },
    /// Trial results to be summed do not share the same keys or sequence lengths.
    AggregationMismatch(String),
    /// Two distinct (grid point, inner index) pairs map to the same flattened key.
    FlattenCollision(String),
    /// The final table could not be written.
    SerializationFailure(String),
    /// Error for invalid parameters, e.g., a non-positive bin window.
    InvalidParameter(String),
    /// Error while reading or writing a checkpoint.
    CheckpointError(String),
    /// Error for I/O operations.
    IOError(String),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanError::WorkerFailure { job, reason } => {
                write!(f, "Worker failure on job {}: {}", job, reason)
            }
            ScanError::AggregationMismatch(e) => write!(f, "Aggregation mismatch: {}", e),
            ScanError::FlattenCollision(e) => write!(f, "Flattened key collision: {}", e),
            ScanError::SerializationFailure(e) => write!(f, "Serialization failure: {}", e),
            ScanError::InvalidParameter(e) => write!(f, "Invalid parameters: {}", e),
            ScanError::CheckpointError(e) => write!(f, "Checkpoint error: {}", e),
            ScanError::IOError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for ScanError {}
