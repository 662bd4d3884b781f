use serde::{Deserialize, Serialize};

use crate::ParticleType;

/// How a per-site-type parameter combines for an unlike pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MixingRule {
    /// `$ \sqrt{v_i v_j} $` (epsilon)
    Geometric,
    /// `$ (v_i + v_j)/2 $`, or zero when either value is zero (sigma, cutoff)
    ArithmeticOrZero,
    /// `$ v_i v_j $` (charge)
    Multiplicative,
}

impl MixingRule {
    fn mix(&self, a: f64, b: f64) -> f64 {
        match self {
            MixingRule::Geometric => (a * b).sqrt(),
            MixingRule::ArithmeticOrZero => {
                if a == 0.0 || b == 0.0 {
                    0.0
                } else {
                    0.5 * (a + b)
                }
            }
            MixingRule::Multiplicative => a * b,
        }
    }
}

/// One named parameter: a flat per-site-type vector plus the pairwise mixed
/// matrix. User overrides pin individual matrix entries against re-mixing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelParam {
    name: String,
    rule: MixingRule,
    values: Vec<f64>,
    mixed: Vec<Vec<f64>>,
    overridden: Vec<Vec<bool>>,
}

impl ModelParam {
    pub fn new(name: &str, rule: MixingRule) -> ModelParam {
        ModelParam { name: name.to_string(), rule, values: Vec::new(), mixed: Vec::new(), overridden: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Appends the value for a new site type and re-mixes
    pub fn add(&mut self, value: f64) {
        self.values.push(value);
        let n = self.values.len();
        for (i, row) in self.mixed.iter_mut().enumerate() {
            row.resize(n, 0.0);
            self.overridden[i].resize(n, false);
        }
        self.mixed.push(vec![0.0; n]);
        self.overridden.push(vec![false; n]);
        self.mix();
    }

    /// Recomputes every mixed entry that has not been explicitly overridden
    pub fn mix(&mut self) {
        for i in 0..self.values.len() {
            for j in 0..self.values.len() {
                if !self.overridden[i][j] {
                    self.mixed[i][j] = self.rule.mix(self.values[i], self.values[j]);
                }
            }
        }
    }

    pub fn value(&self, site_type: usize) -> f64 {
        self.values[site_type]
    }

    pub fn set(&mut self, site_type: usize, value: f64) {
        self.values[site_type] = value;
        self.mix();
    }

    #[inline(always)]
    pub fn mixed_value(&self, type1: usize, type2: usize) -> f64 {
        self.mixed[type1][type2]
    }

    pub fn mixed_values(&self) -> &Vec<Vec<f64>> {
        &self.mixed
    }

    /// Pins a pair entry to an explicit value; re-mixing no longer touches it
    pub fn set_mixed(&mut self, type1: usize, type2: usize, value: f64) {
        self.mixed[type1][type2] = value;
        self.mixed[type2][type1] = value;
        self.overridden[type1][type2] = true;
        self.overridden[type2][type1] = true;
    }

    pub fn max(&self) -> f64 {
        self.values.iter().cloned().fold(0.0, f64::max)
    }

    pub fn mixed_max(&self) -> f64 {
        self.mixed
            .iter()
            .flat_map(|row| row.iter().cloned())
            .fold(0.0, f64::max)
    }
}

/// Container for the canonical per-site-type parameters: epsilon, sigma,
/// cutoff and charge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    epsilon: ModelParam,
    sigma: ModelParam,
    cutoff: ModelParam,
    charge: ModelParam,
}

impl ModelParams {
    pub fn new() -> ModelParams {
        ModelParams {
            epsilon: ModelParam::new("epsilon", MixingRule::Geometric),
            sigma: ModelParam::new("sigma", MixingRule::ArithmeticOrZero),
            cutoff: ModelParam::new("cutoff", MixingRule::ArithmeticOrZero),
            charge: ModelParam::new("charge", MixingRule::Multiplicative),
        }
    }

    /// Registers the site types of a particle-type template, in file order
    pub fn add_particle_type(&mut self, ptype: &ParticleType) {
        let mut templates: Vec<_> = ptype.sites.iter().collect();
        templates.sort_by_key(|t| t.site_type);
        templates.dedup_by_key(|t| t.site_type);
        for t in templates {
            assert_eq!(
                t.site_type,
                self.size(),
                "site types must be added contiguously; got {} while holding {}",
                t.site_type,
                self.size()
            );
            self.epsilon.add(t.epsilon);
            self.sigma.add(t.sigma);
            self.cutoff.add(t.cutoff);
            self.charge.add(t.charge);
        }
    }

    pub fn size(&self) -> usize {
        self.epsilon.size()
    }

    pub fn epsilon(&self) -> &ModelParam {
        &self.epsilon
    }

    pub fn sigma(&self) -> &ModelParam {
        &self.sigma
    }

    pub fn cutoff(&self) -> &ModelParam {
        &self.cutoff
    }

    pub fn charge(&self) -> &ModelParam {
        &self.charge
    }

    /// The largest mixed cutoff; bounds cell sizes and domain checks
    pub fn max_cutoff(&self) -> f64 {
        self.cutoff.mixed_max()
    }

    fn param_mut(&mut self, name: &str) -> &mut ModelParam {
        match name {
            "epsilon" => &mut self.epsilon,
            "sigma" => &mut self.sigma,
            "cutoff" => &mut self.cutoff,
            "charge" => &mut self.charge,
            _ => panic!("unknown model parameter: {}", name),
        }
    }

    /// Replaces the per-type value of a named parameter
    pub fn set(&mut self, name: &str, site_type: usize, value: f64) {
        self.param_mut(name).set(site_type, value);
    }

    /// Overrides a single mixed entry of a named parameter
    pub fn set_mixed(&mut self, name: &str, type1: usize, type2: usize, value: f64) {
        self.param_mut(name).set_mixed(type1, type2, value);
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        ModelParams::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixing_rules() {
        let mut eps = ModelParam::new("epsilon", MixingRule::Geometric);
        eps.add(1.0);
        eps.add(4.0);
        assert!((eps.mixed_value(0, 1) - 2.0).abs() < 1e-14);

        let mut sig = ModelParam::new("sigma", MixingRule::ArithmeticOrZero);
        sig.add(1.0);
        sig.add(3.0);
        sig.add(0.0);
        assert!((sig.mixed_value(0, 1) - 2.0).abs() < 1e-14);
        assert_eq!(sig.mixed_value(0, 2), 0.0);
    }

    #[test]
    fn overrides_survive_remixing() {
        let mut eps = ModelParam::new("epsilon", MixingRule::Geometric);
        eps.add(1.0);
        eps.add(1.0);
        eps.set_mixed(0, 1, 5.0);
        eps.set(0, 9.0);
        assert_eq!(eps.mixed_value(0, 1), 5.0);
        assert_eq!(eps.mixed_value(1, 0), 5.0);
        assert_eq!(eps.mixed_value(0, 0), 9.0);
    }
}
