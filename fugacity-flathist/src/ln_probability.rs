use serde::{Deserialize, Serialize};

/// A discretized log-probability over macrostate bins.
///
/// Kept normalized so that `$ \ln \sum_b e^{\ln\pi_b} = 0 $`; reweighting to
/// another thermodynamic state adds `$ \Delta(\beta\mu) M_b $` (or
/// `$ \Delta(-\beta) U_b $`) per bin and renormalizes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LnProbability {
    values: Vec<f64>,
}

impl LnProbability {
    pub fn new(size: usize) -> LnProbability {
        LnProbability { values: vec![0.0; size] }
    }

    pub fn from_values(values: Vec<f64>) -> LnProbability {
        LnProbability { values }
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn value(&self, bin: usize) -> f64 {
        self.values[bin]
    }

    pub fn values(&self) -> &Vec<f64> {
        &self.values
    }

    pub fn set(&mut self, bin: usize, value: f64) {
        self.values[bin] = value;
    }

    pub fn add(&mut self, bin: usize, delta: f64) {
        self.values[bin] += delta;
    }

    pub fn resize(&mut self, size: usize) {
        self.values.resize(size, 0.0);
    }

    /// `$ \ln \sum_b e^{v_b} $`, evaluated stably
    pub fn ln_sum(&self) -> f64 {
        let max = self.values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return max;
        }
        max + self.values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
    }

    /// Shifts all values so the probabilities sum to one
    pub fn normalize(&mut self) {
        let shift = self.ln_sum();
        for v in self.values.iter_mut() {
            *v -= shift;
        }
    }

    /// A normalized copy reweighted by `delta_conjugate * macrostate_value`
    /// per bin.
    pub fn reweighted(&self, delta_conjugate: f64, macrostate_values: &[f64]) -> LnProbability {
        assert_eq!(self.values.len(), macrostate_values.len());
        let mut out = self.clone();
        for (v, m) in out.values.iter_mut().zip(macrostate_values.iter()) {
            *v += delta_conjugate * m;
        }
        out.normalize();
        out
    }

    /// Interior local minima, candidates for phase boundaries
    pub fn local_minima(&self) -> Vec<usize> {
        let mut minima = Vec::new();
        for b in 1..self.values.len().saturating_sub(1) {
            if self.values[b] < self.values[b - 1] && self.values[b] <= self.values[b + 1] {
                minima.push(b);
            }
        }
        minima
    }

    pub fn is_equal(&self, other: &LnProbability, tolerance: f64) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::LnProbability;

    #[test]
    fn normalization_sums_to_one() {
        let mut lnpi = LnProbability::from_values(vec![-1.0, 0.0, 1.0]);
        lnpi.normalize();
        let total: f64 = lnpi.values().iter().map(|v| v.exp()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn reweighting_shifts_towards_larger_bins() {
        let mut lnpi = LnProbability::from_values(vec![0.0, 0.0, 0.0]);
        lnpi.normalize();
        let macrostates = [0.0, 1.0, 2.0];
        let up = lnpi.reweighted(1.0, &macrostates);
        assert!(up.value(2) > up.value(0));
    }

    #[test]
    fn minima_are_interior() {
        let lnpi = LnProbability::from_values(vec![-1.0, -5.0, -0.5, -6.0, -0.2]);
        assert_eq!(lnpi.local_minima(), vec![1, 3]);
    }
}
