//! Flattened, composite-keyed tables of sweep results.
use log;
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::core::key::Index;
use crate::core::result::{Record, TrialResult};
use crate::error::ScanError;

/// A single table mapping composite keys `(*grid_point, *inner_index)` to sequences of counts.
/// This is the unit of persistence of a sweep.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(into = "Vec<Record>", try_from = "Vec<Record>")]
pub struct FlattenedTable {
    entries: BTreeMap<Index, Vec<u64>>,
}

impl FlattenedTable {
    /// Flatten nested results, i.e., grid point -> (inner index -> counts), into a single table.
    ///
    /// The grid points and inner indices may have any arity, the keys of the table are simply their
    /// concatenation. Two pairs ending up with the same key fail with [`ScanError::FlattenCollision`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use rusty_noise_scan::core::result::TrialResult;
    /// use rusty_noise_scan::core::table::FlattenedTable;
    /// use rusty_noise_scan::index;
    ///
    /// let mut inner = TrialResult::new();
    /// inner.insert(index!["RS", 1.0], vec![3, 4]);
    /// inner.insert(index!["FS", 1.0], vec![0, 1]);
    ///
    /// let mut nested = BTreeMap::new();
    /// nested.insert(index![1000.0, 0.2], inner);
    ///
    /// let table = FlattenedTable::flatten(&nested).unwrap();
    /// assert_eq!(table.len(), 2);
    /// assert_eq!(table.get(&index![1000.0, 0.2, "RS", 1.0]), Some(&vec![3, 4]));
    /// ```
    pub fn flatten(nested: &BTreeMap<Index, TrialResult>) -> Result<Self, ScanError> {
        let mut table = FlattenedTable::default();
        for (grid_point, result) in nested.iter() {
            table.extend(grid_point, result)?;
        }
        Ok(table)
    }

    /// Add all entries of a result under the given grid point.
    pub fn extend(&mut self, grid_point: &Index, result: &TrialResult) -> Result<(), ScanError> {
        for (inner_index, counts) in result.iter() {
            let key = grid_point.concat(inner_index);
            match self.entries.entry(key) {
                btree_map::Entry::Occupied(entry) => {
                    return Err(ScanError::FlattenCollision(format!(
                        "grid point {} and inner index {} map to the existing key {}",
                        grid_point,
                        inner_index,
                        entry.key()
                    )));
                }
                btree_map::Entry::Vacant(entry) => {
                    entry.insert(counts.clone());
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &Index) -> Option<&Vec<u64>> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Index> {
        self.entries.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Index, Vec<u64>> {
        self.entries.iter()
    }

    /// Save the table to a file (JSON list of key/counts records).
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ScanError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ScanError::SerializationFailure(e.to_string()))?;
        }
        let file =
            File::create(path).map_err(|e| ScanError::SerializationFailure(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| ScanError::SerializationFailure(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| ScanError::SerializationFailure(e.to_string()))?;
        log::info!("{} entries saved to {}", self.len(), path.display());
        Ok(())
    }

    /// Load a table from a file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let file = File::open(path).map_err(|e| ScanError::IOError(e.to_string()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| ScanError::IOError(e.to_string()))
    }
}

impl From<FlattenedTable> for Vec<Record> {
    fn from(table: FlattenedTable) -> Self {
        table
            .entries
            .into_iter()
            .map(|(key, counts)| Record { key, counts })
            .collect()
    }
}

impl TryFrom<Vec<Record>> for FlattenedTable {
    type Error = ScanError;

    fn try_from(records: Vec<Record>) -> Result<Self, Self::Error> {
        let mut entries = BTreeMap::new();
        for record in records {
            if entries.insert(record.key.clone(), record.counts).is_some() {
                return Err(ScanError::FlattenCollision(format!(
                    "duplicate key {} in table",
                    record.key
                )));
            }
        }
        Ok(FlattenedTable { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index;
    use tempfile::tempdir;

    #[test]
    fn test_flatten() {
        let mut inner = TrialResult::new();
        inner.insert(index!["n1", 1.0], vec![1, 2]);
        inner.insert(index!["n2", 2.0], vec![3]);
        let mut nested = BTreeMap::new();
        nested.insert(index![1000.0, 0.0], inner);

        let table = FlattenedTable::flatten(&nested).unwrap();
        let keys: Vec<&Index> = table.keys().collect();
        assert_eq!(
            keys,
            vec![
                &index![1000.0, 0.0, "n1", 1.0],
                &index![1000.0, 0.0, "n2", 2.0]
            ]
        );
        assert_eq!(table.get(&index![1000.0, 0.0, "n1", 1.0]), Some(&vec![1, 2]));
        assert_eq!(table.get(&index![1000.0, 0.0, "n2", 2.0]), Some(&vec![3]));
    }

    #[test]
    fn test_flatten_mixed_arity() {
        let mut short = TrialResult::new();
        short.insert(index!["RS", 1.0], vec![1]);
        let mut long = TrialResult::new();
        long.insert(index!["RS", 0.4, 1.0], vec![2, 3]);

        let mut nested = BTreeMap::new();
        nested.insert(index![250.0, 0.4], short);
        nested.insert(index![500.0], long);

        let table = FlattenedTable::flatten(&nested).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&index![250.0, 0.4, "RS", 1.0]), Some(&vec![1]));
        assert_eq!(table.get(&index![500.0, "RS", 0.4, 1.0]), Some(&vec![2, 3]));
    }

    #[test]
    fn test_flatten_collision() {
        let mut a = TrialResult::new();
        a.insert(index![0.2, "RS"], vec![1]);
        let mut b = TrialResult::new();
        b.insert(index!["RS"], vec![2]);

        let mut nested = BTreeMap::new();
        nested.insert(index![1000.0], a);
        nested.insert(index![1000.0, 0.2], b);

        assert!(matches!(
            FlattenedTable::flatten(&nested),
            Err(ScanError::FlattenCollision(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let mut inner = TrialResult::new();
        inner.insert(index!["RS", 1.0], vec![4, 5]);
        inner.insert(index!["CH", 39.8], vec![0, 0]);
        let mut nested = BTreeMap::new();
        nested.insert(index![750.0, 0.6], inner);
        let table = FlattenedTable::flatten(&nested).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("results").join("table.json");
        table.save_to(&path).unwrap();
        assert_eq!(FlattenedTable::load_from(&path).unwrap(), table);
    }

    #[test]
    fn test_save_failure() {
        let dir = tempdir().unwrap();
        // A directory cannot be overwritten by a file
        assert!(matches!(
            FlattenedTable::default().save_to(dir.path()),
            Err(ScanError::SerializationFailure(_))
        ));
    }
}
