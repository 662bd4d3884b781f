use serde::{Deserialize, Serialize};

/// Thermodynamic state parameters: inverse temperature, per-type chemical
/// potentials and (for constant-pressure ensembles) the pressure.
///
/// `beta` is expressed in inverse energy units; `beta_mu(t)` is the product
/// used directly in grand-canonical acceptance factors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThermoParams {
    beta: f64,
    chemical_potentials: Vec<f64>,
    pressure: Option<f64>,
}

impl ThermoParams {
    pub fn new(beta: f64) -> ThermoParams {
        ThermoParams { beta, chemical_potentials: Vec::new(), pressure: None }
    }

    pub fn with_chemical_potential(mut self, mu: f64) -> ThermoParams {
        self.chemical_potentials.push(mu);
        self
    }

    pub fn with_pressure(mut self, pressure: f64) -> ThermoParams {
        self.pressure = Some(pressure);
        self
    }

    #[inline(always)]
    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn set_beta(&mut self, beta: f64) {
        self.beta = beta;
    }

    pub fn chemical_potential(&self, particle_type: usize) -> f64 {
        match self.chemical_potentials.get(particle_type) {
            Some(mu) => *mu,
            None => panic!("no chemical potential given for particle type {}", particle_type),
        }
    }

    pub fn beta_mu(&self, particle_type: usize) -> f64 {
        self.beta * self.chemical_potential(particle_type)
    }

    pub fn pressure(&self) -> f64 {
        match self.pressure {
            Some(p) => p,
            None => panic!("pressure requested but never set"),
        }
    }

    pub fn has_pressure(&self) -> bool {
        self.pressure.is_some()
    }
}
