//! Repetition aggregates

use serde::Serialize;
use std::time::Duration;

/// Summary of the successful repetitions at one size
///
/// `stddev` and `variance` use the sample (n - 1) estimator and are zero for
/// a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggregate {
    pub count: usize,
    pub mean: Duration,
    pub median: Duration,
    pub stddev: Duration,
    /// Seconds squared
    pub variance: f64,
    pub min: Duration,
    pub max: Duration,
}

impl Aggregate {
    /// `None` when there are no samples
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let count = sorted.len();

        let secs: Vec<f64> = sorted.iter().map(Duration::as_secs_f64).collect();
        let mean = secs.iter().sum::<f64>() / count as f64;
        let median = if count % 2 == 1 {
            secs[count / 2]
        } else {
            (secs[count / 2 - 1] + secs[count / 2]) / 2.0
        };
        let variance = if count > 1 {
            secs.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (count - 1) as f64
        } else {
            0.0
        };

        Some(Self {
            count,
            mean: Duration::from_secs_f64(mean),
            median: Duration::from_secs_f64(median),
            stddev: Duration::from_secs_f64(variance.sqrt()),
            variance,
            min: sorted[0],
            max: sorted[count - 1],
        })
    }

    /// Relative spread, `stddev / mean`
    pub fn coefficient_of_variation(&self) -> f64 {
        let mean = self.mean.as_secs_f64();
        if mean > 0.0 {
            self.stddev.as_secs_f64() / mean
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn close(a: Duration, b: Duration) -> bool {
        (a.as_secs_f64() - b.as_secs_f64()).abs() < 1e-9
    }

    #[test]
    fn empty_has_no_aggregate() {
        assert!(Aggregate::from_samples(&[]).is_none());
    }

    #[test]
    fn single_sample() {
        let agg = Aggregate::from_samples(&[ms(5)]).unwrap();
        assert_eq!(agg.count, 1);
        assert!(close(agg.mean, ms(5)));
        assert!(close(agg.median, ms(5)));
        assert_eq!(agg.stddev, Duration::ZERO);
        assert_eq!(agg.variance, 0.0);
        assert_eq!(agg.min, ms(5));
        assert_eq!(agg.max, ms(5));
        assert_eq!(agg.coefficient_of_variation(), 0.0);
    }

    #[test]
    fn odd_and_even_medians() {
        let odd = Aggregate::from_samples(&[ms(9), ms(1), ms(5)]).unwrap();
        assert!(close(odd.median, ms(5)));
        assert_eq!(odd.min, ms(1));
        assert_eq!(odd.max, ms(9));

        let even = Aggregate::from_samples(&[ms(4), ms(1), ms(3), ms(2)]).unwrap();
        assert!(close(even.median, Duration::from_micros(2500)));
    }

    #[test]
    fn sample_variance() {
        // 2, 4, 4, 4, 5, 5, 7, 9 ms: mean 5, sum of squares 32, n - 1 = 7
        let samples: Vec<_> = [2, 4, 4, 4, 5, 5, 7, 9].into_iter().map(ms).collect();
        let agg = Aggregate::from_samples(&samples).unwrap();
        assert!(close(agg.mean, ms(5)));
        let expected = 32.0 / 7.0 * 1e-6;
        assert!((agg.variance - expected).abs() < 1e-12);
        assert!((agg.stddev.as_secs_f64() - expected.sqrt()).abs() < 1e-9);
    }
}
