//! Field value generators for creating predictable test grids.

/// Row-major values rising linearly from `min` at the first cell to `max`
/// at the last.
///
/// # Example
///
/// ```
/// use test_utils::gradient_values;
///
/// let values = gradient_values(3, 2, 0.0, 10.0);
/// assert_eq!(values.len(), 6);
/// assert_eq!(values[0], 0.0);
/// assert_eq!(values[5], 10.0);
/// ```
pub fn gradient_values(width: usize, height: usize, min: f32, max: f32) -> Vec<f32> {
    let count = width * height;
    let last = count.saturating_sub(1).max(1) as f32;
    (0..count)
        .map(|i| min + (max - min) * i as f32 / last)
        .collect()
}

/// [`gradient_values`] wrapped for dataset documents, with the cells of
/// `missing` left empty.
pub fn dataset_values(width: usize, height: usize, min: f32, max: f32, missing: &[usize]) -> Vec<Option<f32>> {
    gradient_values(width, height, min, max)
        .into_iter()
        .enumerate()
        .map(|(i, v)| (!missing.contains(&i)).then_some(v))
        .collect()
}

/// Directions turning clockwise by `step` degrees per cell, wrapping at 360.
pub fn direction_values(width: usize, height: usize, step: f32) -> Vec<f32> {
    (0..width * height)
        .map(|i| (i as f32 * step).rem_euclid(360.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_single_cell() {
        assert_eq!(gradient_values(1, 1, 5.0, 10.0), vec![5.0]);
    }

    #[test]
    fn test_dataset_values_missing() {
        let values = dataset_values(2, 2, 0.0, 3.0, &[1]);
        assert_eq!(values, vec![Some(0.0), None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_direction_wraps() {
        let values = direction_values(5, 1, 100.0);
        assert_eq!(values, vec![0.0, 100.0, 200.0, 300.0, 40.0]);
    }
}
