use serde::{Deserialize, Serialize};

/// A per-perturber step size with bounds and an adaptive update.
///
/// The tuner multiplies the value towards a target acceptance: too many
/// acceptances grow the step, too few shrink it, always clamped to
/// `[minimum, maximum]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tunable {
    value: f64,
    minimum: f64,
    maximum: f64,
    enabled: bool,
    target_acceptance: f64,
    percent_change: f64,
}

impl Tunable {
    pub fn new(value: f64) -> Tunable {
        Tunable {
            value,
            minimum: f64::MIN_POSITIVE,
            maximum: f64::MAX,
            enabled: true,
            target_acceptance: 0.25,
            percent_change: 0.05,
        }
    }

    /// A disabled tunable for perturbers without a step size
    pub fn disabled() -> Tunable {
        let mut t = Tunable::new(0.0);
        t.enabled = false;
        t
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value.clamp(self.minimum, self.maximum);
    }

    pub fn set_bounds(&mut self, minimum: f64, maximum: f64) {
        self.minimum = minimum;
        self.maximum = maximum;
        self.value = self.value.clamp(minimum, maximum);
    }

    pub fn target_acceptance(&self) -> f64 {
        self.target_acceptance
    }

    pub fn set_target_acceptance(&mut self, target: f64) {
        self.target_acceptance = target;
    }

    pub fn set_percent_change(&mut self, percent: f64) {
        assert!(percent > 0.0 && percent < 1.0, "percent change out of (0,1): {}", percent);
        self.percent_change = percent;
    }

    /// One multiplicative step towards the target acceptance ratio
    pub fn tune(&mut self, actual_acceptance: f64) {
        if !self.enabled {
            return;
        }
        let factor = if actual_acceptance > self.target_acceptance {
            1.0 + self.percent_change
        } else {
            1.0 - self.percent_change
        };
        self.set_value(self.value * factor);
    }

    pub fn is_equal(&self, other: &Tunable, tolerance: f64) -> bool {
        (self.value - other.value).abs() < tolerance && self.enabled == other.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::Tunable;

    #[test]
    fn tuning_respects_bounds() {
        let mut t = Tunable::new(1.0);
        t.set_bounds(0.5, 1.05);
        for _ in 0..100 {
            t.tune(1.0);
        }
        assert!((t.value() - 1.05).abs() < 1e-12);
        for _ in 0..100 {
            t.tune(0.0);
        }
        assert!((t.value() - 0.5).abs() < 1e-12);
    }
}
