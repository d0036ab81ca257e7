//! Evenly spaced sampling of points along a path

use crate::models::Coordinate;

/// Map a fraction of the route (0.0 = origin, 1.0 = destination) onto a path
/// index: `floor(len * fraction)`, clamped to the last valid index.
///
/// Returns `None` for an empty path.
#[must_use]
pub fn index_at_fraction(len: usize, fraction: f64) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    let index = (len as f64 * fraction).floor() as usize;
    Some(index.min(len - 1))
}

/// Path indices for `count` samples at fractions `i / (count - 1)`.
///
/// A single sample is taken at the origin. The result is non-decreasing and
/// every index lies in `[0, len - 1]`; it is empty when `len` or `count` is 0.
#[must_use]
pub fn sample_indices(len: usize, count: usize) -> Vec<usize> {
    if len == 0 || count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![0];
    }

    let steps = (count - 1) as f64;
    (0..count)
        .filter_map(|i| index_at_fraction(len, i as f64 / steps))
        .collect()
}

/// The coordinates at [`sample_indices`], repeats allowed on short paths
#[must_use]
pub fn sample_path(path: &[Coordinate], count: usize) -> Vec<Coordinate> {
    sample_indices(path.len(), count)
        .into_iter()
        .map(|index| path[index])
        .collect()
}

/// Coordinate at a fraction of the path, see [`index_at_fraction`]
#[must_use]
pub fn coordinate_at_fraction(path: &[Coordinate], fraction: f64) -> Option<Coordinate> {
    index_at_fraction(path.len(), fraction).map(|index| path[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn straight_path(len: usize) -> Vec<Coordinate> {
        (0..len)
            .map(|i| Coordinate::new(0.0, i as f64 * 0.01))
            .collect()
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 6)]
    #[case(3, 5)]
    #[case(5, 5)]
    #[case(10, 6)]
    #[case(101, 6)]
    #[case(1000, 1)]
    #[case(1000, 17)]
    fn test_sample_count_and_bounds(#[case] len: usize, #[case] count: usize) {
        let indices = sample_indices(len, count);
        assert_eq!(indices.len(), count);
        assert!(indices.iter().all(|&i| i < len));
        assert!(indices.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_endpoints_are_origin_and_destination() {
        let indices = sample_indices(100, 5);
        assert_eq!(indices, vec![0, 25, 50, 75, 99]);
    }

    #[test]
    fn test_single_sample_is_origin() {
        assert_eq!(sample_indices(42, 1), vec![0]);
    }

    #[test]
    fn test_short_path_repeats_points() {
        let path = straight_path(2);
        let samples = sample_path(&path, 6);
        assert_eq!(samples.len(), 6);
        assert_eq!(samples[0], path[0]);
        assert_eq!(samples[5], path[1]);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(sample_indices(0, 5).is_empty());
        assert!(sample_indices(10, 0).is_empty());
        assert!(sample_path(&[], 3).is_empty());
    }

    #[rstest]
    #[case(0.0, 0)]
    #[case(0.384, 38)]
    #[case(1.0, 99)]
    #[case(1.7, 99)]
    #[case(-0.2, 0)]
    fn test_index_at_fraction(#[case] fraction: f64, #[case] expected: usize) {
        assert_eq!(index_at_fraction(100, fraction), Some(expected));
    }

    #[test]
    fn test_index_at_fraction_nan_and_empty() {
        assert_eq!(index_at_fraction(10, f64::NAN), Some(0));
        assert_eq!(index_at_fraction(0, 0.5), None);
        assert!(coordinate_at_fraction(&[], 0.5).is_none());
    }
}
