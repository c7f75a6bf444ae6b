//! Conversion of spike trains into spike counts over fixed time windows.
use crate::error::ScanError;

/// The maximum number of windows of a binned spike train.
pub const MAX_BINS: usize = 1 << 24;

/// Count the spikes of a spike train over consecutive, non-overlapping windows.
///
/// The interval `[offset, total_duration)` is partitioned into windows `[offset + k * window, offset + (k + 1) * window)`;
/// a trailing window that would end after `total_duration` is dropped.
/// A spike at time `t` belongs to a window if `start <= t < start + window`.
/// The firing times do not need to be sorted.
///
/// # Examples
///
/// ```rust
/// use rusty_noise_scan::core::spike_train::bin;
///
/// let counts = bin(&[50.0, 150.0, 260.0, 1050.0], 100.0, 300.0, 0.0).unwrap();
/// assert_eq!(counts, vec![1, 1, 1]);
/// ```
pub fn bin(
    firing_times: &[f64],
    window: f64,
    total_duration: f64,
    offset: f64,
) -> Result<Vec<u64>, ScanError> {
    if !(window > 0.0) || !window.is_finite() {
        return Err(ScanError::InvalidParameter(format!(
            "The bin window must be positive and finite, got {}",
            window
        )));
    }
    if !(offset >= 0.0 && offset < total_duration) || !total_duration.is_finite() {
        return Err(ScanError::InvalidParameter(format!(
            "The offset must lie in [0, {}), got {}",
            total_duration, offset
        )));
    }
    if firing_times.iter().any(|t| !t.is_finite()) {
        return Err(ScanError::InvalidParameter(
            "Firing times must be finite".to_string(),
        ));
    }

    let mut firing_times = firing_times.to_vec();
    firing_times.sort_by(|a, b| a.total_cmp(b));

    let num_bins = num_bins(window, total_duration, offset)?;
    let counts = (0..num_bins)
        .map(|k| {
            let start = offset + k as f64 * window;
            let end = start + window;
            let first = firing_times.partition_point(|t| *t < start);
            let last = firing_times.partition_point(|t| *t < end);
            (last - first) as u64
        })
        .collect();

    Ok(counts)
}

/// The number of complete windows fitting in `[offset, total_duration)`.
///
/// Fails with [`ScanError::InvalidParameter`] if there would be more than [`MAX_BINS`] windows.
pub fn num_bins(window: f64, total_duration: f64, offset: f64) -> Result<usize, ScanError> {
    let ratio = ((total_duration - offset) / window).floor().max(0.0);
    if !(ratio.is_finite() && ratio <= MAX_BINS as f64) {
        return Err(ScanError::InvalidParameter(format!(
            "The window {} splits [{}, {}) into too many bins (at most {})",
            window, offset, total_duration, MAX_BINS
        )));
    }

    let mut num_bins = ratio as usize;
    // Guard against rounding in the division.
    while num_bins > 0 && offset + num_bins as f64 * window > total_duration {
        num_bins -= 1;
    }
    while let Some(next) = num_bins.checked_add(1).filter(|&next| next <= MAX_BINS) {
        if offset + next as f64 * window > total_duration {
            break;
        }
        num_bins = next;
    }
    Ok(num_bins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_drops_late_spikes() {
        let counts = bin(&[50.0, 150.0, 260.0, 1050.0], 100.0, 300.0, 0.0).unwrap();
        assert_eq!(counts, vec![1, 1, 1]);
    }

    #[test]
    fn test_bin_with_offset() {
        let counts = bin(&[], 250.0, 11000.0, 1000.0).unwrap();
        assert_eq!(counts.len(), 40);
        assert!(counts.iter().all(|&c| c == 0));

        // Spikes before the offset are ignored
        let counts = bin(&[10.0, 999.9, 1000.0, 1249.9, 1250.0], 250.0, 1500.0, 1000.0).unwrap();
        assert_eq!(counts, vec![2, 1]);
    }

    #[test]
    fn test_bin_half_open_windows() {
        let counts = bin(&[0.0, 100.0, 199.99, 200.0], 100.0, 200.0, 0.0).unwrap();
        assert_eq!(counts, vec![1, 2]);
    }

    #[test]
    fn test_bin_partial_window_dropped() {
        let counts = bin(&[10.0, 260.0, 290.0], 100.0, 299.0, 0.0).unwrap();
        assert_eq!(counts, vec![1, 0]);
    }

    #[test]
    fn test_bin_unsorted() {
        let counts = bin(&[260.0, 50.0, 55.0, 150.0], 100.0, 300.0, 0.0).unwrap();
        assert_eq!(counts, vec![2, 1, 1]);
    }

    #[test]
    fn test_bin_invalid_parameters() {
        assert!(matches!(
            bin(&[1.0], 0.0, 10.0, 0.0),
            Err(ScanError::InvalidParameter(_))
        ));
        assert!(matches!(
            bin(&[1.0], -5.0, 10.0, 0.0),
            Err(ScanError::InvalidParameter(_))
        ));
        assert!(matches!(
            bin(&[1.0], 1.0, 10.0, 10.0),
            Err(ScanError::InvalidParameter(_))
        ));
        assert!(matches!(
            bin(&[1.0], 1.0, 10.0, -1.0),
            Err(ScanError::InvalidParameter(_))
        ));
        assert!(matches!(
            bin(&[f64::NAN], 1.0, 10.0, 0.0),
            Err(ScanError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_num_bins() {
        assert_eq!(num_bins(100.0, 300.0, 0.0), Ok(3));
        assert_eq!(num_bins(250.0, 11000.0, 1000.0), Ok(40));
        assert_eq!(num_bins(0.5, 2.0, 0.0), Ok(4));
        assert_eq!(num_bins(750.0, 11000.0, 1000.0), Ok(13));
        assert_eq!(num_bins(100.0, 50.0, 0.0), Ok(0));
    }

    #[test]
    fn test_tiny_window() {
        assert!(matches!(
            num_bins(1e-300, 1.0, 0.0),
            Err(ScanError::InvalidParameter(_))
        ));
        assert!(matches!(
            bin(&[0.5], 1e-300, 1.0, 0.0),
            Err(ScanError::InvalidParameter(_))
        ));
        assert!(matches!(
            bin(&[0.5], 1e-6, 1000.0, 0.0),
            Err(ScanError::InvalidParameter(_))
        ));
        // Right at the limit
        let window = 1.0 / MAX_BINS as f64;
        assert_eq!(num_bins(window, 1.0, 0.0), Ok(MAX_BINS));
    }
}
