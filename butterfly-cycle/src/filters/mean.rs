use butterfly_common::Result;

use super::{check_input, SmoothingFilter};

/// Distance-windowed moving average.
///
/// Each sample is averaged with the neighbours on either side whose
/// cumulative distance from it stays below `window` metres. The nearest
/// neighbour is always taken when its own gap is shorter than the window.
/// Results are rounded to centimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanFilter {
    window: f64,
}

impl MeanFilter {
    pub fn new(window: f64) -> Self {
        Self { window }
    }

    pub fn window(&self) -> f64 {
        self.window
    }
}

impl SmoothingFilter for MeanFilter {
    fn smooth(&self, measurements: &[f64], distances: &[f64]) -> Result<Vec<f64>> {
        check_input(measurements, distances)?;
        let n = measurements.len();

        let smoothed = (0..n)
            .map(|i| {
                let mut sum = measurements[i];
                let mut count = 1usize;

                if i + 1 < n {
                    let mut j = i + 1;
                    let mut covered = distances[i];
                    while covered < self.window {
                        sum += measurements[j];
                        count += 1;
                        if j + 1 >= n {
                            break;
                        }
                        covered += distances[j];
                        j += 1;
                    }
                }

                if i > 0 {
                    let mut j = i - 1;
                    let mut covered = distances[i - 1];
                    while covered < self.window {
                        sum += measurements[j];
                        count += 1;
                        if j == 0 {
                            break;
                        }
                        covered += distances[j - 1];
                        j -= 1;
                    }
                }

                round2(sum / count as f64)
            })
            .collect();

        Ok(smoothed)
    }
}

#[inline]
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_golden_sequence() {
        let measurements = [2.0, 4.0, 6.0, 4.0, 2.0, 2.0, 2.0, 6.0, 8.0];
        let distances = [1.0, 2.0, 3.0, 1.0, 1.0, 3.0, 2.0, 2.0];
        let smoothed = MeanFilter::new(3.0)
            .smooth(&measurements, &distances)
            .unwrap();
        assert_eq!(
            smoothed,
            vec![3.0, 4.0, 5.0, 2.67, 2.67, 2.67, 4.0, 5.33, 7.0]
        );
    }

    #[test]
    fn test_wide_gaps_leave_samples_alone() {
        let smoothed = MeanFilter::new(5.0)
            .smooth(&[10.0, 20.0, 30.0], &[50.0, 50.0])
            .unwrap();
        assert_eq!(smoothed, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_window_covering_everything() {
        let smoothed = MeanFilter::new(1_000.0)
            .smooth(&[1.0, 2.0, 3.0, 6.0], &[1.0, 1.0, 1.0])
            .unwrap();
        assert!(smoothed.iter().all(|v| *v == 3.0));
    }

    #[test]
    fn test_length_mismatch() {
        assert!(MeanFilter::new(3.0).smooth(&[1.0, 2.0], &[]).is_err());
    }
}
