use alloc::vec::Vec;

use crate::reduction::Reduction;

/// Averages the two contiguous halves of `frame` into a single mono frame.
///
/// The host delivers loudness as two blocks of equal length (left history,
/// then right history). For an odd-length frame the trailing element belongs
/// to neither half and is dropped.
pub fn downmix(frame: &[f32]) -> Vec<f32> {
    let mut mono = Vec::with_capacity(frame.len() / 2);
    downmix_into(frame, &mut mono);
    mono
}

/// Allocation-free form of [`downmix`]: clears `mono` and refills it.
pub fn downmix_into(frame: &[f32], mono: &mut Vec<f32>) {
    let half = frame.len() / 2;
    let (left, right) = frame.split_at(half);

    mono.clear();
    mono.extend(
        left.iter()
            .zip(right.iter())
            .map(|(&l, &r)| (l + r) / 2.0),
    );
}

/// Splits `mono` into `channel_count` equal-width slices and keeps the
/// loudest sample of each.
///
/// Slice `i` spans `floor(i * w)..floor((i + 1) * w)` with
/// `w = len / channel_count`. When `channel_count` exceeds the frame length
/// some slices are empty; those buckets are `0.0`.
pub fn bucket(mono: &[f32], channel_count: usize) -> Vec<f32> {
    bucket_with(mono, channel_count, Reduction::Max)
}

/// [`bucket`] with a caller-chosen reduction.
pub fn bucket_with(mono: &[f32], channel_count: usize, reduction: Reduction) -> Vec<f32> {
    let mut buckets = Vec::with_capacity(channel_count);
    bucket_into(mono, channel_count, reduction, &mut buckets);
    buckets
}

/// Allocation-free form of [`bucket_with`]: clears `buckets` and refills it
/// with exactly `channel_count` values.
pub fn bucket_into(mono: &[f32], channel_count: usize, reduction: Reduction, buckets: &mut Vec<f32>) {
    buckets.clear();
    if channel_count == 0 {
        return;
    }

    // Boundaries are floor(i * w), computed in f64.
    let delta = mono.len() as f64 / channel_count as f64;
    for i in 0..channel_count {
        let start = ((i as f64 * delta) as usize).min(mono.len());
        let end = (((i + 1) as f64 * delta) as usize).clamp(start, mono.len());
        buckets.push(reduction.calculate(&mono[start..end]));
    }
}

/// Arithmetic mean of `values[from..to]`.
///
/// An empty or out-of-bounds range yields `0.0`.
pub fn range_mean(values: &[f32], from: usize, to: usize) -> f32 {
    values
        .get(from..to)
        .map(|range| Reduction::Average.calculate(range))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use approx::assert_abs_diff_eq;

    #[test]
    fn downmix_averages_halves() {
        let mono = downmix(&[0.2, 0.4, 0.6, 0.8]);
        assert_eq!(mono.len(), 2);
        assert_abs_diff_eq!(mono[0], 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(mono[1], 0.6, epsilon = 1e-6);
    }

    #[test]
    fn downmix_drops_odd_trailing_sample() {
        // Halves are [1.0, 0.0] and [0.0, 1.0]; the final 0.5 is dropped.
        assert_eq!(downmix(&[1.0, 0.0, 0.0, 1.0, 0.5]), vec![0.5, 0.5]);
        assert!(downmix(&[0.3]).is_empty());
        assert!(downmix(&[]).is_empty());
    }

    #[test]
    fn downmix_into_reuses_buffer() {
        let mut mono = vec![9.0; 16];
        downmix_into(&[1.0, 1.0, 0.0, 0.0], &mut mono);
        assert_eq!(mono, vec![0.5, 0.5]);
    }

    #[test]
    fn bucket_takes_slice_maximum() {
        assert_eq!(bucket(&[1.0, 0.0, 0.0, 1.0], 2), vec![1.0, 1.0]);
        assert_eq!(bucket(&[0.1, 0.5, 0.2, 0.3, 0.9, 0.4], 3), vec![0.5, 0.3, 0.9]);
    }

    #[test]
    fn bucket_truncates_fractional_boundaries() {
        // Width 2.5: slices are [0..2], [2..5], [5..7], [7..10].
        let mono = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];
        assert_eq!(bucket(&mono, 4), vec![0.2, 0.5, 0.7, 1.0]);
    }

    #[test]
    fn bucket_empty_slices_are_zero() {
        // Width 0.5: every other slice is empty.
        assert_eq!(bucket(&[0.4, 0.8], 4), vec![0.0, 0.4, 0.0, 0.8]);
        assert_eq!(bucket(&[], 3), vec![0.0, 0.0, 0.0]);
        assert!(bucket(&[1.0], 0).is_empty());
    }

    #[test]
    fn bucket_with_average() {
        let buckets = bucket_with(&[0.0, 1.0, 0.5, 0.5], 2, Reduction::Average);
        assert_eq!(buckets, vec![0.5, 0.5]);
    }

    #[test]
    fn range_mean_of_subrange() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(range_mean(&values, 1, 3), 2.5, epsilon = 1e-6);
        assert_abs_diff_eq!(range_mean(&values, 0, 4), 2.5, epsilon = 1e-6);
    }

    #[test]
    fn range_mean_degenerate_ranges() {
        let values = [1.0, 2.0];
        assert_eq!(range_mean(&values, 1, 1), 0.0);
        assert_eq!(range_mean(&values, 0, 5), 0.0);
    }
}
