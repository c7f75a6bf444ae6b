//! Per-grid-point checkpoints, so that a failure only loses the grid point being processed.
use log;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::key::Index;
use crate::core::result::TrialResult;
use crate::error::ScanError;

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointEntry {
    grid_point: Index,
    fingerprint: String,
    result: TrialResult,
}

/// The hex SHA-256 digest of the JSON encoding of `settings`.
///
/// A checkpoint is only reused by a run whose fingerprint is the same, so the settings must hold
/// everything the result of a grid point depends on.
pub fn fingerprint<T: Serialize>(settings: &T) -> Result<String, ScanError> {
    let bytes =
        serde_json::to_vec(settings).map_err(|e| ScanError::CheckpointError(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// A directory holding one JSON file per completed grid point and fingerprint.
#[derive(Debug, PartialEq, Clone)]
pub struct Checkpoint {
    dir: PathBuf,
}

impl Checkpoint {
    /// Open (and create if necessary) a checkpoint directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, ScanError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| ScanError::CheckpointError(e.to_string()))?;
        Ok(Checkpoint { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, grid_point: &Index, fingerprint: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(grid_point.to_bytes());
        hasher.update(fingerprint.as_bytes());
        self.dir.join(format!("{:x}.json", hasher.finalize()))
    }

    /// Load the result of a grid point, if it has been stored before with the same fingerprint.
    pub fn load(
        &self,
        grid_point: &Index,
        fingerprint: &str,
    ) -> Result<Option<TrialResult>, ScanError> {
        let path = self.path_for(grid_point, fingerprint);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path).map_err(|e| ScanError::CheckpointError(e.to_string()))?;
        let entry: CheckpointEntry = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ScanError::CheckpointError(format!("{}: {}", path.display(), e)))?;
        if &entry.grid_point != grid_point {
            return Err(ScanError::CheckpointError(format!(
                "{} holds grid point {} instead of {}",
                path.display(),
                entry.grid_point,
                grid_point
            )));
        }
        if entry.fingerprint != fingerprint {
            return Err(ScanError::CheckpointError(format!(
                "{} was computed with other settings ({} instead of {})",
                path.display(),
                entry.fingerprint,
                fingerprint
            )));
        }
        log::info!("Grid point {} restored from checkpoint", grid_point);
        Ok(Some(entry.result))
    }

    /// Store the result of a grid point. The file is written aside then renamed, so that an
    /// interrupted write never leaves a truncated checkpoint behind.
    pub fn store(
        &self,
        grid_point: &Index,
        fingerprint: &str,
        result: &TrialResult,
    ) -> Result<(), ScanError> {
        let path = self.path_for(grid_point, fingerprint);
        let tmp_path = path.with_extension("json.tmp");
        let entry = CheckpointEntry {
            grid_point: grid_point.clone(),
            fingerprint: fingerprint.to_string(),
            result: result.clone(),
        };

        let file =
            File::create(&tmp_path).map_err(|e| ScanError::CheckpointError(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &entry)
            .map_err(|e| ScanError::CheckpointError(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| ScanError::CheckpointError(e.to_string()))?;
        fs::rename(&tmp_path, &path).map_err(|e| ScanError::CheckpointError(e.to_string()))?;
        log::debug!("Grid point {} saved to {}", grid_point, path.display());
        Ok(())
    }
}
