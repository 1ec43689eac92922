/// A single latency measurement taken from a probe's output.
///
/// The latency fields are in microseconds. `elapsed_seconds` is wall-clock time since the start
/// of the scenario that produced the sample, measured by the harness rather than read from the
/// probe output.
///
/// `min <= avg <= max` is what a well-behaved probe reports, but it is not enforced here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySample {
    pub elapsed_seconds: f64,
    pub min: u64,
    pub avg: u64,
    pub max: u64,
}

impl LatencySample {
    pub fn new(elapsed_seconds: f64, min: u64, avg: u64, max: u64) -> Self {
        Self {
            elapsed_seconds,
            min,
            avg,
            max,
        }
    }

    /// Spread between the largest and smallest latency in this sample.
    ///
    /// Negative only if the probe reported `max < min`. Saturates at the bounds of `i64`.
    pub fn latency_range(&self) -> i64 {
        let range = i128::from(self.max) - i128::from(self.min);
        range.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }

    /// Population standard deviation across the min, avg and max channels.
    pub fn std_dev(&self) -> f64 {
        let values = [self.min as f64, self.avg as f64, self.max as f64];
        let mean = values.iter().sum::<f64>() / 3.0;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
        variance.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_range_is_max_minus_min() {
        let sample = LatencySample::new(0.0, 10, 20, 30);
        assert_eq!(20, sample.latency_range());
    }

    #[test]
    fn latency_range_is_negative_on_malformed_sample() {
        let sample = LatencySample::new(0.0, 30, 20, 10);
        assert_eq!(-20, sample.latency_range());
    }

    #[test]
    fn latency_range_of_huge_values_saturates() {
        let sample = LatencySample::new(0.0, 1, 2, 1 << 63);
        assert_eq!(i64::MAX, sample.latency_range());

        let sample = LatencySample::new(0.0, u64::MAX, 2, 0);
        assert_eq!(i64::MIN, sample.latency_range());

        let sample = LatencySample::new(0.0, u64::MAX - 5, u64::MAX, u64::MAX);
        assert_eq!(5, sample.latency_range());
    }

    #[test]
    fn std_dev_is_population_std_dev() {
        let sample = LatencySample::new(0.0, 10, 20, 30);
        // sqrt(((10-20)^2 + 0 + (30-20)^2) / 3)
        let expected = (200.0_f64 / 3.0).sqrt();
        assert!((sample.std_dev() - expected).abs() < 1e-12);
    }

    #[test]
    fn std_dev_of_flat_sample_is_zero() {
        let sample = LatencySample::new(1.5, 7, 7, 7);
        assert_eq!(0.0, sample.std_dev());
    }
}
