use serde::{Deserialize, Serialize};

/// Accumulates moments of a scalar observable without storing the samples.
///
/// The first `max_moment` raw moments are tracked, so the mean, the variance
/// and higher-order quantities needed by histogram reweighting can be
/// recovered at any time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Accumulator {
    count: f64,
    moments: Vec<f64>,
}

impl Accumulator {
    /// An accumulator tracking mean and variance only
    pub fn new() -> Accumulator {
        Accumulator::with_max_moment(2)
    }

    /// An accumulator tracking raw moments up to `max_moment`
    pub fn with_max_moment(max_moment: usize) -> Accumulator {
        assert!(max_moment >= 1);
        Accumulator { count: 0.0, moments: vec![0.0; max_moment] }
    }

    pub fn accumulate(&mut self, value: f64) {
        self.count += 1.0;
        let mut power = 1.0;
        for m in self.moments.iter_mut() {
            power *= value;
            *m += power;
        }
    }

    pub fn count(&self) -> f64 {
        self.count
    }

    /// The i-th raw moment, `<x^i>`; `moment(1)` is the mean
    pub fn moment(&self, order: usize) -> f64 {
        assert!(order >= 1 && order <= self.moments.len(), "moment order {} not tracked", order);
        if self.count == 0.0 {
            return 0.0;
        }
        self.moments[order - 1] / self.count
    }

    pub fn average(&self) -> f64 {
        self.moment(1)
    }

    /// Unnormalized sum of the i-th powers
    pub fn sum_of_powers(&self, order: usize) -> f64 {
        assert!(order >= 1 && order <= self.moments.len());
        self.moments[order - 1]
    }

    pub fn variance(&self) -> f64 {
        let avg = self.average();
        self.moment(2) - avg * avg
    }

    pub fn stdev(&self) -> f64 {
        self.variance().max(0.0).sqrt()
    }

    /// Standard deviation of the mean assuming uncorrelated samples
    pub fn stdev_of_mean(&self) -> f64 {
        if self.count < 2.0 {
            return 0.0;
        }
        (self.variance() / (self.count - 1.0)).max(0.0).sqrt()
    }

    pub fn reset(&mut self) {
        self.count = 0.0;
        for m in self.moments.iter_mut() {
            *m = 0.0;
        }
    }

    pub fn is_equal(&self, other: &Accumulator, tolerance: f64) -> bool {
        if (self.count - other.count).abs() > tolerance {
            return false;
        }
        if self.moments.len() != other.moments.len() {
            return false;
        }
        self.moments
            .iter()
            .zip(other.moments.iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Accumulator::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Accumulator;

    #[test]
    fn moments_of_a_short_series() {
        let mut acc = Accumulator::with_max_moment(3);
        for x in [1.0, 2.0, 3.0, 4.0] {
            acc.accumulate(x);
        }
        assert_eq!(acc.count(), 4.0);
        assert!((acc.average() - 2.5).abs() < 1e-14);
        assert!((acc.variance() - 1.25).abs() < 1e-14);
        assert!((acc.moment(3) - 25.0).abs() < 1e-14);
    }
}
