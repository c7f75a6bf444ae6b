//! Trial results and their elementwise aggregation.
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::core::key::Index;
use crate::error::ScanError;

/// A single (key, counts) record, used to (de)serialize keyed collections as JSON lists.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Record {
    pub key: Index,
    pub counts: Vec<u64>,
}

/// The outcome of a single trial: a mapping from inner index to an ordered sequence of counts.
///
/// Results must be addressed by key, never by position: intensities are presented in a random order
/// (with repeats), so the order in which keys were produced is not stable across trials.
/// Within a key, counts are stored in presentation order.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(into = "Vec<Record>", try_from = "Vec<Record>")]
pub struct TrialResult {
    counts: BTreeMap<Index, Vec<u64>>,
}

impl TrialResult {
    pub fn new() -> Self {
        TrialResult {
            counts: BTreeMap::new(),
        }
    }

    /// Append a count to the sequence of the given key, creating it if necessary.
    pub fn record(&mut self, key: Index, count: u64) {
        self.counts.entry(key).or_default().push(count);
    }

    /// Insert a whole sequence for the given key, returning the previous one if any.
    pub fn insert(&mut self, key: Index, counts: Vec<u64>) -> Option<Vec<u64>> {
        self.counts.insert(key, counts)
    }

    pub fn get(&self, key: &Index) -> Option<&Vec<u64>> {
        self.counts.get(key)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Index> {
        self.counts.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Index, Vec<u64>> {
        self.counts.iter()
    }

    /// The total number of counts over all keys.
    pub fn total(&self) -> u64 {
        self.counts.values().flatten().sum()
    }

    /// Check that `other` has exactly the same keys as `self`, with sequences of equal lengths.
    pub fn check_compatible(&self, other: &TrialResult) -> Result<(), ScanError> {
        if let Some(key) = self.keys().find(|key| !other.counts.contains_key(key)) {
            return Err(ScanError::AggregationMismatch(format!(
                "key {} is missing from one of the results",
                key
            )));
        }
        if let Some(key) = other.keys().find(|key| !self.counts.contains_key(key)) {
            return Err(ScanError::AggregationMismatch(format!(
                "key {} is missing from one of the results",
                key
            )));
        }
        for (key, counts) in self.iter() {
            let other_len = other.counts[key].len();
            if counts.len() != other_len {
                return Err(ScanError::AggregationMismatch(format!(
                    "sequences of key {} have different lengths ({} and {})",
                    key,
                    counts.len(),
                    other_len
                )));
            }
        }
        Ok(())
    }

    /// Elementwise sum of a list of trial results sharing the same keys ("sersum").
    ///
    /// All results are validated before anything is summed: a key missing from one of them, or
    /// sequences of different lengths, fail with [`ScanError::AggregationMismatch`].
    /// The sum does not depend on the order of the results.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rusty_noise_scan::core::result::TrialResult;
    /// use rusty_noise_scan::index;
    ///
    /// let mut a = TrialResult::new();
    /// a.insert(index!["RS", 1.0], vec![1, 2]);
    /// let mut b = TrialResult::new();
    /// b.insert(index!["RS", 1.0], vec![3, 0]);
    ///
    /// let sum = TrialResult::aggregate(&[a, b]).unwrap();
    /// assert_eq!(sum.get(&index!["RS", 1.0]), Some(&vec![4, 2]));
    /// ```
    pub fn aggregate(results: &[TrialResult]) -> Result<TrialResult, ScanError> {
        let (first, rest) = results.split_first().ok_or_else(|| {
            ScanError::InvalidParameter("Cannot aggregate an empty list of results".to_string())
        })?;

        for result in rest.iter() {
            first.check_compatible(result)?;
        }

        rest.iter().try_fold(first.clone(), |mut acc, result| {
            for (key, counts) in acc.counts.iter_mut() {
                for (count, other) in counts.iter_mut().zip(result.counts[key].iter()) {
                    *count = count.checked_add(*other).ok_or_else(|| {
                        ScanError::AggregationMismatch(format!(
                            "count overflow while summing key {}",
                            key
                        ))
                    })?;
                }
            }
            Ok(acc)
        })
    }
}

impl From<TrialResult> for Vec<Record> {
    fn from(result: TrialResult) -> Self {
        result
            .counts
            .into_iter()
            .map(|(key, counts)| Record { key, counts })
            .collect()
    }
}

impl TryFrom<Vec<Record>> for TrialResult {
    type Error = ScanError;

    fn try_from(records: Vec<Record>) -> Result<Self, Self::Error> {
        let mut result = TrialResult::new();
        for record in records {
            if result.insert(record.key.clone(), record.counts).is_some() {
                return Err(ScanError::InvalidParameter(format!(
                    "duplicate key {} in trial result",
                    record.key
                )));
            }
        }
        Ok(result)
    }
}

impl FromIterator<(Index, Vec<u64>)> for TrialResult {
    fn from_iter<I: IntoIterator<Item = (Index, Vec<u64>)>>(iter: I) -> Self {
        TrialResult {
            counts: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TrialResult {
    type Item = (&'a Index, &'a Vec<u64>);
    type IntoIter = btree_map::Iter<'a, Index, Vec<u64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index;

    fn result_from(entries: &[(&str, f64, Vec<u64>)]) -> TrialResult {
        entries
            .iter()
            .map(|(name, intensity, counts)| (index![*name, *intensity], counts.clone()))
            .collect()
    }

    #[test]
    fn test_record() {
        let mut result = TrialResult::new();
        result.record(index!["RS", 2.0], 3);
        result.record(index!["FS", 1.0], 1);
        result.record(index!["RS", 2.0], 5);
        assert_eq!(result.len(), 2);
        assert_eq!(result.get(&index!["RS", 2.0]), Some(&vec![3, 5]));
        assert_eq!(result.total(), 9);
    }

    #[test]
    fn test_aggregate_sums_elementwise() {
        let a = result_from(&[("RS", 1.0, vec![1, 2]), ("FS", 1.0, vec![0, 4])]);
        let b = result_from(&[("RS", 1.0, vec![3, 0]), ("FS", 1.0, vec![2, 2])]);
        let sum = TrialResult::aggregate(&[a, b]).unwrap();
        assert_eq!(
            sum,
            result_from(&[("RS", 1.0, vec![4, 2]), ("FS", 1.0, vec![2, 6])])
        );
    }

    #[test]
    fn test_aggregate_order_independent() {
        let a = result_from(&[("RS", 1.0, vec![1, 2, 3]), ("IB", 2.5, vec![7])]);
        let b = result_from(&[("IB", 2.5, vec![1]), ("RS", 1.0, vec![0, 0, 9])]);
        let c = result_from(&[("RS", 1.0, vec![5, 5, 5]), ("IB", 2.5, vec![2])]);
        assert_eq!(
            TrialResult::aggregate(&[a.clone(), b.clone(), c.clone()]).unwrap(),
            TrialResult::aggregate(&[c.clone(), b.clone(), a.clone()]).unwrap()
        );
        assert_eq!(
            TrialResult::aggregate(&[a.clone(), b.clone(), c.clone()]).unwrap(),
            TrialResult::aggregate(&[b, c, a]).unwrap()
        );
    }

    #[test]
    fn test_aggregate_identity() {
        let a = result_from(&[("RS", 1.0, vec![1, 2]), ("FS", 3.0, vec![8])]);
        assert_eq!(TrialResult::aggregate(&[a.clone()]).unwrap(), a);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(matches!(
            TrialResult::aggregate(&[]),
            Err(ScanError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_aggregate_key_mismatch() {
        let a = result_from(&[("RS", 1.0, vec![1]), ("FS", 1.0, vec![1])]);
        let b = result_from(&[("RS", 1.0, vec![1]), ("CH", 1.0, vec![1])]);
        assert!(matches!(
            TrialResult::aggregate(&[a.clone(), b]),
            Err(ScanError::AggregationMismatch(_))
        ));

        // A strict subset of keys is also a mismatch, whatever the order
        let c = result_from(&[("RS", 1.0, vec![1])]);
        assert!(matches!(
            TrialResult::aggregate(&[a.clone(), c.clone()]),
            Err(ScanError::AggregationMismatch(_))
        ));
        assert!(matches!(
            TrialResult::aggregate(&[c, a]),
            Err(ScanError::AggregationMismatch(_))
        ));
    }

    #[test]
    fn test_aggregate_length_mismatch() {
        let a = result_from(&[("RS", 1.0, vec![1, 2])]);
        let b = result_from(&[("RS", 1.0, vec![1])]);
        assert!(matches!(
            TrialResult::aggregate(&[a, b]),
            Err(ScanError::AggregationMismatch(_))
        ));
    }

    #[test]
    fn test_aggregate_overflow() {
        let a = result_from(&[("RS", 1.0, vec![u64::MAX])]);
        let b = result_from(&[("RS", 1.0, vec![1])]);
        assert!(matches!(
            TrialResult::aggregate(&[a, b]),
            Err(ScanError::AggregationMismatch(_))
        ));
    }

    #[test]
    fn test_serde() {
        let a = result_from(&[("RS", 1.0, vec![1, 2]), ("FS", 3.0, vec![8])]);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(
            json,
            r#"[{"key":["FS",3.0],"counts":[8]},{"key":["RS",1.0],"counts":[1,2]}]"#
        );
        let decoded: TrialResult = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, a);

        let duplicated = r#"[{"key":["RS",1.0],"counts":[1]},{"key":["RS",1.0],"counts":[2]}]"#;
        assert!(serde_json::from_str::<TrialResult>(duplicated).is_err());
    }
}
