use log::trace;
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use fugacity_configuration::{Domain, TrialState};
use fugacity_numerical::{
    position_in_cube, random_rotation, unit_sphere_surface, Euler, Matrix3, Rototranslation, Vec3,
    NEAR_ZERO,
};
use fugacity_system::{AngleModel, BondModel, DihedralModel, System};

use crate::{TrialSelection, Tunable};

/// Where an insertion places the new particle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AddRegion {
    /// uniform over the box
    Box,
    /// uniform inside the aggregation shell `[inner, outer]` of a randomly
    /// chosen existing particle (aggregation-volume bias)
    ShellAroundAnchor { inner: f64, outer: f64 },
}

/// Proposes new coordinates for a selection. Every variant restores the
/// pre-attempt state exactly on `revert`; `finalize` commits deferred
/// bookkeeping (burying removed particles).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Perturber {
    /// rigid displacement inside a cube of half-width `tunable`
    Translate { tunable: Tunable },
    /// rigid rotation by up to `tunable` degrees about the first mobile site
    Rotate { tunable: Tunable },
    /// rotation of the mobile segment about the anchor site (chain pivot)
    Pivot { tunable: Tunable },
    /// rotation of the mobile sites about the axis through two anchors
    Crankshaft { tunable: Tunable },
    /// re-draw the mobile site at a Boltzmann-sampled bond length
    DistanceBond,
    /// bond length plus a Boltzmann-sampled bending angle
    DistanceAngle,
    /// bond, angle, and a torsion spin about the anchor axis
    DihedralTorsion,
    /// joint rejection placement matching two angle distributions at a branch point
    Branch,
    /// slide the chain by one bond, regrowing the leading end
    Reptate,
    /// rescale the box and every molecule centre
    Volume {
        tunable: Tunable,
        /// step uniformly in V rather than ln V
        uniform: bool,
        #[serde(skip)]
        old_domain: Option<Domain>,
        #[serde(skip)]
        old_positions: Vec<(usize, Vec<Vec3>)>,
    },
    /// revive a ghost and place it; `orient` draws a fresh random
    /// orientation for every site (patchy particles)
    Add { region: AddRegion, orient: bool },
    /// mark the selection for deferred removal
    Remove,
    /// swap the molecule's type in place
    Morph { new_type: usize },
}

impl Perturber {
    pub fn tunable(&self) -> Option<&Tunable> {
        match self {
            Perturber::Translate { tunable }
            | Perturber::Rotate { tunable }
            | Perturber::Pivot { tunable }
            | Perturber::Crankshaft { tunable }
            | Perturber::Volume { tunable, .. } => Some(tunable),
            _ => None,
        }
    }

    pub fn tunable_mut(&mut self) -> Option<&mut Tunable> {
        match self {
            Perturber::Translate { tunable }
            | Perturber::Rotate { tunable }
            | Perturber::Pivot { tunable }
            | Perturber::Crankshaft { tunable }
            | Perturber::Volume { tunable, .. } => Some(tunable),
            _ => None,
        }
    }

    /// Resolves tunable bounds against the domain
    pub fn precompute(&mut self, system: &System) {
        let max_side = system.configuration(0).domain().max_side_length();
        match self {
            Perturber::Translate { tunable } => {
                tunable.set_bounds(2.0 * NEAR_ZERO, 0.5 * max_side);
            }
            Perturber::Rotate { tunable } | Perturber::Pivot { tunable } | Perturber::Crankshaft { tunable } => {
                tunable.set_bounds(2.0 * NEAR_ZERO, 180.0);
            }
            _ => {}
        }
    }

    /// Proposes a new configuration for the selection. Candidates are always
    /// regenerated from the selection's original coordinates, so repeated
    /// calls during Rosenbluth staging are independent.
    pub fn perturb(&mut self, system: &mut System, selection: &mut TrialSelection, rng: &mut SmallRng) {
        let dimension = system.dimension();
        let beta = system.beta();
        selection.excluded_energy = 0.0;
        match self {
            Perturber::Translate { tunable } => {
                let mut shift = Vec3::zero();
                position_in_cube(rng, dimension, 2.0 * tunable.value(), &mut shift);
                for i in 0..selection.mobile.num_particles() {
                    for k in 0..selection.mobile.site_indices(i).len() {
                        let new_pos = *selection.mobile.original_position(i, k) + shift;
                        *selection.mobile.position_mut(i, k) = new_pos;
                    }
                }
                selection.mobile.set_trial_state(TrialState::Move);
                self.write_positions(system, selection);
            }
            Perturber::Rotate { tunable } => {
                let pivot = *selection.mobile.original_position(0, 0);
                let rot = random_rotation(rng, dimension, tunable.value().to_radians());
                Self::rotate_mobile(selection, &pivot, &rot);
                selection.mobile.set_trial_state(TrialState::Move);
                self.write_positions(system, selection);
            }
            Perturber::Pivot { tunable } => {
                let pivot = *selection.anchor.original_position(0, 0);
                let rot = random_rotation(rng, dimension, tunable.value().to_radians());
                Self::rotate_mobile(selection, &pivot, &rot);
                selection.mobile.set_trial_state(TrialState::Move);
                self.write_positions(system, selection);
            }
            Perturber::Crankshaft { tunable } => {
                let begin = *selection.anchor.original_position(0, 0);
                let end = *selection.anchor.original_position(0, 1);
                let angle = rng.gen_range(-tunable.value()..tunable.value()).to_radians();
                let roto = Rototranslation::around_axis(&begin, &end, angle);
                for i in 0..selection.mobile.num_particles() {
                    for k in 0..selection.mobile.site_indices(i).len() {
                        let new_pos = roto.apply(selection.mobile.original_position(i, k));
                        *selection.mobile.position_mut(i, k) = new_pos;
                    }
                }
                selection.mobile.set_trial_state(TrialState::Move);
                self.write_positions(system, selection);
            }
            Perturber::DistanceBond => {
                let (length, bond_energy) = Self::draw_bond(system, selection, beta, dimension, rng);
                let mut direction = Vec3::zero();
                unit_sphere_surface(rng, dimension, &mut direction);
                let anchor = *selection.anchor.original_position(0, 0);
                *selection.mobile.position_mut(0, 0) = anchor + direction * length;
                selection.excluded_energy = bond_energy;
                selection.mobile.set_trial_state(TrialState::Move);
                self.write_positions(system, selection);
            }
            Perturber::DistanceAngle => {
                let (length, bond_energy) = Self::draw_bond(system, selection, beta, dimension, rng);
                let (theta, angle_energy) = Self::draw_angle(system, selection, beta, dimension, rng);
                let a1 = *selection.anchor.original_position(0, 0);
                let a2 = *selection.anchor.original_position(0, 1);
                let axis = (a2 - a1).normalized();
                let direction = Self::direction_at_angle(&axis, theta, dimension, rng);
                *selection.mobile.position_mut(0, 0) = a1 + direction * length;
                selection.excluded_energy = bond_energy + angle_energy;
                selection.mobile.set_trial_state(TrialState::Move);
                self.write_positions(system, selection);
            }
            Perturber::DihedralTorsion => {
                let (length, bond_energy) = Self::draw_bond(system, selection, beta, dimension, rng);
                let (theta, angle_energy) = Self::draw_angle(system, selection, beta, dimension, rng);
                let (phi, dihedral_energy) = Self::draw_dihedral(system, selection, beta, rng);
                let c = *selection.anchor.original_position(0, 0);
                let b = *selection.anchor.original_position(0, 1);
                let a = *selection.anchor.original_position(0, 2);
                let bc = (c - b).normalized();
                let n = (b - a).cross(&bc).normalized();
                let m = n.cross(&bc);
                let d = bc * (-length * theta.cos())
                    + m * (length * theta.sin() * phi.cos())
                    + n * (length * theta.sin() * phi.sin());
                *selection.mobile.position_mut(0, 0) = c + d;
                selection.excluded_energy = bond_energy + angle_energy + dihedral_energy;
                selection.mobile.set_trial_state(TrialState::Move);
                self.write_positions(system, selection);
            }
            Perturber::Branch => {
                let (pi, mobile_site) =
                    (selection.mobile.particle_index(0), selection.mobile.site_indices(0)[0]);
                let a1 = selection.anchor.site_indices(0)[0];
                let a2 = selection.anchor.site_indices(0)[1];
                let a3 = selection.anchor.site_indices(0)[2];
                let config = system.configuration(selection.config_index);
                let ptype = config.particle_type(config.particle(pi).type_index()).clone();
                let bond = ptype.bond_between(mobile_site, a1).expect("branch needs a bond to the branch point");
                let bt = ptype.bond_types[bond.bond_type].clone();
                let bond_model = BondModel::from_name(&bt.model);
                let angle2 = ptype.angle_at(mobile_site, a1, a2).expect("missing first branch angle");
                let angle3 = ptype.angle_at(mobile_site, a1, a3).expect("missing second branch angle");
                let at2 = ptype.angle_types[angle2.angle_type].clone();
                let at3 = ptype.angle_types[angle3.angle_type].clone();
                let model2 = AngleModel::from_name(&at2.model);
                let model3 = AngleModel::from_name(&at3.model);

                let p1 = *selection.anchor.original_position(0, 0);
                let p2 = *selection.anchor.original_position(0, 1);
                let p3 = *selection.anchor.original_position(0, 2);
                let length = bond_model.random_length(&bt, beta, dimension, rng);
                let bond_energy = bond_model.energy(length, &bt);
                // joint rejection on both branch angles
                let mut placed = Vec3::zero();
                let mut u2 = 0.0;
                let mut u3 = 0.0;
                for attempt in 0..1_000_000 {
                    let mut direction = Vec3::zero();
                    unit_sphere_surface(rng, dimension, &mut direction);
                    placed = p1 + direction * length;
                    let theta2 = p1.angle_at(&placed, &p2);
                    let theta3 = p1.angle_at(&placed, &p3);
                    u2 = model2.energy(theta2, &at2);
                    u3 = model3.energy(theta3, &at3);
                    if rng.gen_range(0.0..1.0) < (-beta * (u2 + u3)).exp() {
                        break;
                    }
                    assert!(attempt + 1 < 1_000_000, "branch placement never satisfied both angles");
                }
                *selection.mobile.position_mut(0, 0) = placed;
                selection.excluded_energy = bond_energy + u2 + u3;
                selection.mobile.set_trial_state(TrialState::Move);
                self.write_positions(system, selection);
            }
            Perturber::Reptate => {
                let forward = selection.mobile.property("forward").unwrap_or(1.0) > 0.5;
                let pi = selection.mobile.particle_index(0);
                let n = selection.mobile.site_indices(0).len();
                let config = system.configuration(selection.config_index);
                let ptype = config.particle_type(config.particle(pi).type_index()).clone();
                // the regrown bond reuses the terminal bond type
                let bond = if forward {
                    ptype.bond_between(n - 2, n - 1)
                } else {
                    ptype.bond_between(0, 1)
                }
                .expect("reptation requires a chain with terminal bonds");
                let bt = ptype.bond_types[bond.bond_type].clone();
                let model = BondModel::from_name(&bt.model);
                let length = model.random_length(&bt, beta, dimension, rng);
                let mut direction = Vec3::zero();
                unit_sphere_surface(rng, dimension, &mut direction);

                let old: Vec<Vec3> = (0..n).map(|k| *selection.mobile.original_position(0, k)).collect();
                if forward {
                    for k in 0..n - 1 {
                        *selection.mobile.position_mut(0, k) = old[k + 1];
                    }
                    *selection.mobile.position_mut(0, n - 1) = old[n - 1] + direction * length;
                } else {
                    for k in 1..n {
                        *selection.mobile.position_mut(0, k) = old[k - 1];
                    }
                    *selection.mobile.position_mut(0, 0) = old[0] + direction * length;
                }
                selection.excluded_energy = model.energy(length, &bt);
                selection.mobile.set_trial_state(TrialState::Move);
                self.write_positions(system, selection);
                self.slide_types(system, selection, forward);
            }
            Perturber::Volume { tunable, uniform, old_domain, old_positions } => {
                let config = system.configuration_mut(selection.config_index);
                *old_domain = Some(config.domain().clone());
                *old_positions = config
                    .physical_particles()
                    .map(|(i, p)| (i, p.sites().iter().map(|s| *s.position()).collect()))
                    .collect();
                let volume = config.domain().volume();
                let delta = rng.gen_range(-tunable.value()..tunable.value());
                let new_volume = if *uniform {
                    volume + delta
                } else {
                    (volume.ln() + delta).exp()
                };
                selection.mobile.set_property("volume_old", volume);
                if new_volume <= 0.0 {
                    selection.mobile.set_property("volume_new", volume);
                    return;
                }
                let factor = (new_volume / volume).powf(1.0 / dimension as f64);
                config.rescale_volume(factor);
                selection.mobile.set_property("volume_new", new_volume);
                selection.mobile.set_trial_state(TrialState::Move);
            }
            Perturber::Add { region, orient } => {
                let pi = selection.mobile.particle_index(0);
                let config = system.configuration_mut(selection.config_index);
                if !config.particle(pi).is_physical() {
                    config.revive(pi);
                }
                let center = match region {
                    AddRegion::Box => config.domain().random_position(rng),
                    AddRegion::ShellAroundAnchor { inner, outer } => {
                        let others: Vec<usize> = config
                            .physical_particles()
                            .map(|(i, _)| i)
                            .filter(|&i| i != pi)
                            .collect();
                        if others.is_empty() {
                            config.domain().random_position(rng)
                        } else {
                            let anchor = others[rng.gen_range(0..others.len())];
                            let anchor_pos = *config.particle(anchor).site(0).position();
                            Self::record_shell(config, selection, anchor, pi, *inner, *outer, dimension);
                            let d = dimension as f64;
                            let u = rng.gen_range(0.0..1.0);
                            let radius =
                                (u * (outer.powf(d) - inner.powf(d)) + inner.powf(d)).powf(1.0 / d);
                            let mut direction = Vec3::zero();
                            unit_sphere_surface(rng, dimension, &mut direction);
                            anchor_pos + direction * radius
                        }
                    }
                };
                let rot = random_rotation(rng, dimension, std::f64::consts::PI);
                let template = *selection.mobile.original_position(0, 0);
                for k in 0..selection.mobile.site_indices(0).len() {
                    let body = *selection.mobile.original_position(0, k) - template;
                    *selection.mobile.position_mut(0, k) = center + rot.apply(&body);
                    if *orient {
                        selection.mobile.set_euler(0, k, Some(Euler::from_rotation_matrix(&rot)));
                    } else if let Some(e) = selection.mobile.original_eulers()[0][k] {
                        let combined = rot * e.rotation_matrix();
                        selection.mobile.set_euler(0, k, Some(Euler::from_rotation_matrix(&combined)));
                    }
                }
                selection.mobile.set_trial_state(TrialState::Add);
                self.write_positions(system, selection);
            }
            Perturber::Remove => {
                selection.mobile.set_trial_state(TrialState::Remove);
            }
            Perturber::Morph { new_type } => {
                let pi = selection.mobile.particle_index(0);
                let config = system.configuration_mut(selection.config_index);
                let old_type = config.particle(pi).type_index();
                selection.mobile.set_property("old_type", old_type as f64);
                config.morph(pi, *new_type);
                selection.mobile.set_trial_state(TrialState::Move);
            }
        }
        trace!("perturbed {:?}", selection.mobile.trial_state());
    }

    /// Restores the pre-attempt state. Must be called exactly once on the
    /// reject path.
    pub fn revert(&mut self, system: &mut System, selection: &TrialSelection) {
        match self {
            Perturber::Volume { old_domain, old_positions, .. } => {
                let config = system.configuration_mut(selection.config_index);
                if let Some(domain) = old_domain.take() {
                    config.set_domain(domain);
                    for (pi, positions) in old_positions.drain(..) {
                        for (s, pos) in positions.into_iter().enumerate() {
                            config.set_position(pi, s, pos);
                        }
                    }
                    config.rebuild_cell_lists();
                }
            }
            Perturber::Add { .. } => {
                let pi = selection.mobile.particle_index(0);
                let config = system.configuration_mut(selection.config_index);
                if config.particle(pi).is_physical() {
                    config.bury(pi);
                } else {
                    config.requeue_ghost(pi);
                }
            }
            Perturber::Remove => {}
            Perturber::Morph { .. } => {
                let pi = selection.mobile.particle_index(0);
                let old_type = selection.mobile.property("old_type").expect("morph stores its old type") as usize;
                system.configuration_mut(selection.config_index).morph(pi, old_type);
            }
            Perturber::Reptate => {
                let forward = selection.mobile.property("forward").unwrap_or(1.0) > 0.5;
                self.slide_types(system, selection, !forward);
                system
                    .configuration_mut(selection.config_index)
                    .revert_positions(&selection.mobile);
            }
            _ => {
                system
                    .configuration_mut(selection.config_index)
                    .revert_positions(&selection.mobile);
            }
        }
    }

    /// Commits deferred bookkeeping. Must be called exactly once on the
    /// accept path.
    pub fn finalize(&mut self, system: &mut System, selection: &TrialSelection) {
        match self {
            Perturber::Remove => {
                let pi = selection.mobile.particle_index(0);
                system.configuration_mut(selection.config_index).bury(pi);
            }
            Perturber::Volume { old_domain, old_positions, .. } => {
                *old_domain = None;
                old_positions.clear();
            }
            _ => {}
        }
    }

    /// The intramolecular energy this perturber's generation distribution
    /// accounts for, evaluated at the selection's current (existing)
    /// geometry. Mirrors exactly the terms `perturb` folds into
    /// `excluded_energy`, so old and new Rosenbluth candidates are weighed
    /// on the same footing.
    pub fn existing_excluded_energy(&self, system: &System, selection: &TrialSelection) -> f64 {
        let config = system.configuration(selection.config_index);
        let domain = config.domain();
        match self {
            Perturber::DistanceBond | Perturber::DistanceAngle | Perturber::DihedralTorsion => {
                let pi = selection.mobile.particle_index(0);
                let mobile = selection.mobile.site_indices(0)[0];
                let ptype = config.particle_type(config.particle(pi).type_index());
                let position = |s: usize| *config.particle(pi).site(s).position();
                let anchors = selection.anchor.site_indices(0);

                let bond_type =
                    selection.mobile.property("bond_type").expect("selector must attach bond_type") as usize;
                let bt = &ptype.bond_types[bond_type];
                let (_, r2) = domain.separation(&position(mobile), &position(anchors[0]));
                let mut en = BondModel::from_name(&bt.model).energy(r2.sqrt(), bt);

                if matches!(self, Perturber::DistanceAngle | Perturber::DihedralTorsion) {
                    let angle_type = selection.mobile.property("angle_type").expect("selector must attach angle_type")
                        as usize;
                    let at = &ptype.angle_types[angle_type];
                    let vertex = position(anchors[0]);
                    let theta = vertex.angle_at(&position(mobile), &position(anchors[1]));
                    en += AngleModel::from_name(&at.model).energy(theta, at);
                }
                if matches!(self, Perturber::DihedralTorsion) {
                    let dihedral_type = selection
                        .mobile
                        .property("dihedral_type")
                        .expect("selector must attach dihedral_type") as usize;
                    let dt = &ptype.dihedral_types[dihedral_type];
                    let phi = fugacity_system::dihedral_angle(
                        &position(mobile),
                        &position(anchors[0]),
                        &position(anchors[1]),
                        &position(anchors[2]),
                    );
                    en += DihedralModel::from_name(&dt.model).energy(phi, dt);
                }
                en
            }
            Perturber::Branch => {
                let pi = selection.mobile.particle_index(0);
                let mobile = selection.mobile.site_indices(0)[0];
                let anchors = selection.anchor.site_indices(0);
                let ptype = config.particle_type(config.particle(pi).type_index());
                let position = |s: usize| *config.particle(pi).site(s).position();
                let bond = ptype.bond_between(mobile, anchors[0]).expect("branch bond");
                let bt = &ptype.bond_types[bond.bond_type];
                let (_, r2) = domain.separation(&position(mobile), &position(anchors[0]));
                let mut en = BondModel::from_name(&bt.model).energy(r2.sqrt(), bt);
                let vertex = position(anchors[0]);
                for &arm in &anchors[1..3] {
                    let angle = ptype.angle_at(mobile, anchors[0], arm).expect("branch angle");
                    let at = &ptype.angle_types[angle.angle_type];
                    let theta = vertex.angle_at(&position(mobile), &position(arm));
                    en += AngleModel::from_name(&at.model).energy(theta, at);
                }
                en
            }
            Perturber::Reptate => {
                // the reverse move regrows the trailing bond
                let forward = selection.mobile.property("forward").unwrap_or(1.0) > 0.5;
                let pi = selection.mobile.particle_index(0);
                let n = selection.mobile.site_indices(0).len();
                let ptype = config.particle_type(config.particle(pi).type_index());
                let (sa, sb) = if forward { (0, 1) } else { (n - 2, n - 1) };
                let bond = match ptype.bond_between(sa, sb) {
                    Some(b) => b,
                    None => return 0.0,
                };
                let bt = &ptype.bond_types[bond.bond_type];
                let (_, r2) = domain.separation(
                    config.particle(pi).site(sa).position(),
                    config.particle(pi).site(sb).position(),
                );
                BondModel::from_name(&bt.model).energy(r2.sqrt(), bt)
            }
            _ => 0.0,
        }
    }

    // ---------- helpers

    fn write_positions(&self, system: &mut System, selection: &TrialSelection) {
        system
            .configuration_mut(selection.config_index)
            .update_positions(&selection.mobile);
    }

    fn rotate_mobile(selection: &mut TrialSelection, pivot: &Vec3, rot: &Matrix3) {
        for i in 0..selection.mobile.num_particles() {
            for k in 0..selection.mobile.site_indices(i).len() {
                let body = *selection.mobile.original_position(i, k) - *pivot;
                *selection.mobile.position_mut(i, k) = *pivot + rot.apply(&body);
                if let Some(e) = selection.mobile.original_eulers()[i][k] {
                    let combined = *rot * e.rotation_matrix();
                    selection.mobile.set_euler(i, k, Some(Euler::from_rotation_matrix(&combined)));
                }
            }
        }
    }

    fn draw_bond(
        system: &System,
        selection: &TrialSelection,
        beta: f64,
        dimension: usize,
        rng: &mut SmallRng,
    ) -> (f64, f64) {
        let bond_type = selection.mobile.property("bond_type").expect("selector must attach bond_type") as usize;
        let pi = selection.mobile.particle_index(0);
        let config = system.configuration(selection.config_index);
        let ptype = config.particle_type(config.particle(pi).type_index());
        let bt = &ptype.bond_types[bond_type];
        let model = BondModel::from_name(&bt.model);
        let length = model.random_length(bt, beta, dimension, rng);
        (length, model.energy(length, bt))
    }

    fn draw_angle(
        system: &System,
        selection: &TrialSelection,
        beta: f64,
        dimension: usize,
        rng: &mut SmallRng,
    ) -> (f64, f64) {
        let angle_type = selection.mobile.property("angle_type").expect("selector must attach angle_type") as usize;
        let pi = selection.mobile.particle_index(0);
        let config = system.configuration(selection.config_index);
        let ptype = config.particle_type(config.particle(pi).type_index());
        let at = &ptype.angle_types[angle_type];
        let model = AngleModel::from_name(&at.model);
        let theta = model.random_angle(at, beta, dimension, rng);
        (theta, model.energy(theta, at))
    }

    fn draw_dihedral(
        system: &System,
        selection: &TrialSelection,
        beta: f64,
        rng: &mut SmallRng,
    ) -> (f64, f64) {
        let dihedral_type =
            selection.mobile.property("dihedral_type").expect("selector must attach dihedral_type") as usize;
        let pi = selection.mobile.particle_index(0);
        let config = system.configuration(selection.config_index);
        let ptype = config.particle_type(config.particle(pi).type_index());
        let dt = &ptype.dihedral_types[dihedral_type];
        let model = DihedralModel::from_name(&dt.model);
        let phi = model.random_dihedral(dt, beta, rng);
        (phi, model.energy(phi, dt))
    }

    /// A direction at polar angle `theta` from `axis`, spun uniformly about
    /// it in 3-D (mirrored randomly in 2-D).
    fn direction_at_angle(axis: &Vec3, theta: f64, dimension: usize, rng: &mut SmallRng) -> Vec3 {
        if dimension == 2 {
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            return Matrix3::about_z(sign * theta).apply(axis);
        }
        // orthonormal frame about the axis
        let helper = if axis.x.abs() < 0.9 { Vec3::new(1.0, 0.0, 0.0) } else { Vec3::new(0.0, 1.0, 0.0) };
        let e1 = axis.cross(&helper).normalized();
        let e2 = axis.cross(&e1);
        let spin = rng.gen_range(0.0..2.0 * std::f64::consts::PI);
        *axis * theta.cos() + (e1 * spin.cos() + e2 * spin.sin()) * theta.sin()
    }

    fn record_shell(
        config: &fugacity_configuration::Configuration,
        selection: &mut TrialSelection,
        anchor: usize,
        skip: usize,
        inner: f64,
        outer: f64,
        dimension: usize,
    ) {
        let anchor_pos = *config.particle(anchor).site(0).position();
        let mut num_in_shell = 0;
        for (i, p) in config.physical_particles() {
            if i == anchor || i == skip {
                continue;
            }
            let r2 = config.domain().distance_squared(p.site(0).position(), &anchor_pos);
            if r2 >= inner * inner && r2 <= outer * outer {
                num_in_shell += 1;
            }
        }
        let shell_volume = if dimension == 3 {
            4.0 / 3.0 * std::f64::consts::PI * (outer.powi(3) - inner.powi(3))
        } else {
            std::f64::consts::PI * (outer.powi(2) - inner.powi(2))
        };
        selection.mobile.set_property("num_in_shell", num_in_shell as f64);
        selection.mobile.set_property("anchor_particle", anchor as f64);
        selection.mobile.set_property("shell_volume", shell_volume);
    }

    /// Rotates site types one step along the chain (heteropolymer reptation)
    fn slide_types(&self, system: &mut System, selection: &TrialSelection, forward: bool) {
        let pi = selection.mobile.particle_index(0);
        let config = system.configuration_mut(selection.config_index);
        let n = config.particle(pi).num_sites();
        let types: Vec<usize> = (0..n).map(|s| config.particle(pi).site(s).site_type()).collect();
        if types.iter().all(|&t| t == types[0]) {
            return;
        }
        if forward {
            for s in 0..n {
                config.set_site_type(pi, s, types[(s + 1) % n]);
            }
        } else {
            for s in 0..n {
                config.set_site_type(pi, s, types[(s + n - 1) % n]);
            }
        }
    }
}
