//! Ready-made trials: each constructor wires a selector, a perturber and the
//! matching compute into a [`Trial`].

use fugacity_system::NeighborCriterion;

use crate::{AddRegion, Perturber, Trial, TrialCompute, TrialSelector, TrialStage, Tunable};

/// Rigid displacement of a random particle (of a type, or any)
pub fn translate_trial(particle_type: Option<usize>, max_move: f64) -> Trial {
    Trial::new("TrialTranslate", TrialCompute::Move).add_stage(TrialStage::new(
        TrialSelector::Particle { particle_type },
        Perturber::Translate { tunable: Tunable::new(max_move) },
    ))
}

/// Rigid rotation of a random particle about its first site
pub fn rotate_trial(particle_type: Option<usize>, max_degrees: f64) -> Trial {
    Trial::new("TrialRotate", TrialCompute::Move).add_stage(TrialStage::new(
        TrialSelector::Particle { particle_type },
        Perturber::Rotate { tunable: Tunable::new(max_degrees) },
    ))
}

/// Grand-canonical insertion
pub fn add_trial(particle_type: usize) -> Trial {
    Trial::new("TrialAdd", TrialCompute::Add).add_stage(
        TrialStage::new(
            TrialSelector::Ghost { particle_type },
            Perturber::Add { region: AddRegion::Box, orient: false },
        )
        .new_only(),
    )
}

/// Grand-canonical insertion with a fresh random orientation per site,
/// for anisotropic (patchy) models
pub fn add_trial_oriented(particle_type: usize) -> Trial {
    Trial::new("TrialAdd", TrialCompute::Add).add_stage(
        TrialStage::new(
            TrialSelector::Ghost { particle_type },
            Perturber::Add { region: AddRegion::Box, orient: true },
        )
        .new_only(),
    )
}

/// Grand-canonical deletion
pub fn remove_trial(particle_type: usize) -> Trial {
    Trial::new("TrialRemove", TrialCompute::Remove).add_stage(TrialStage::new(
        TrialSelector::Particle { particle_type: Some(particle_type) },
        Perturber::Remove,
    ))
}

/// The add/remove pair of a transfer move, splitting `weight` evenly
pub fn transfer_trials(particle_type: usize, weight: f64) -> (Trial, Trial) {
    (
        add_trial(particle_type).with_weight(weight / 2.0),
        remove_trial(particle_type).with_weight(weight / 2.0),
    )
}

/// Configurational-bias insertion with `num_steps` candidate placements;
/// pass a reference index for dual-cutoff staging.
pub fn grow_add_trial(particle_type: usize, num_steps: usize, reference: Option<usize>) -> Trial {
    let mut stage = TrialStage::new(
        TrialSelector::Ghost { particle_type },
        Perturber::Add { region: AddRegion::Box, orient: false },
    )
    .new_only()
    .with_num_steps(num_steps);
    if let Some(r) = reference {
        stage = stage.with_reference(r);
    }
    Trial::new("TrialGrowAdd", TrialCompute::Add).add_stage(stage)
}

/// Configurational-bias deletion matching [`grow_add_trial`]
pub fn grow_remove_trial(particle_type: usize, num_steps: usize, reference: Option<usize>) -> Trial {
    let mut stage = TrialStage::new(
        TrialSelector::Particle { particle_type: Some(particle_type) },
        Perturber::Remove,
    )
    .with_num_steps(num_steps);
    if let Some(r) = reference {
        stage = stage.with_reference(r);
    }
    Trial::new("TrialGrowRemove", TrialCompute::Remove).add_stage(stage)
}

/// Volume rescale; `uniform` steps in V, otherwise in ln V
pub fn volume_trial(max_change: f64, uniform: bool) -> Trial {
    Trial::new("TrialVolume", TrialCompute::Volume).add_stage(TrialStage::new(
        TrialSelector::Particle { particle_type: None },
        Perturber::Volume {
            tunable: Tunable::new(max_change),
            uniform,
            old_domain: None,
            old_positions: Vec::new(),
        },
    ))
}

/// Regrow one bonded site at a Boltzmann-sampled bond length
pub fn bond_regrow_trial(
    particle_type: usize,
    mobile_site: usize,
    anchor_site: usize,
    num_steps: usize,
) -> Trial {
    Trial::new("TrialGrowBond", TrialCompute::Move).add_stage(
        TrialStage::new(
            TrialSelector::Bond { particle_type, mobile_site, anchor_site },
            Perturber::DistanceBond,
        )
        .with_num_steps(num_steps),
    )
}

/// Regrow a site from its bond and bending angle
pub fn angle_regrow_trial(
    particle_type: usize,
    mobile_site: usize,
    anchor_site: usize,
    anchor_site2: usize,
    num_steps: usize,
) -> Trial {
    Trial::new("TrialGrowAngle", TrialCompute::Move).add_stage(
        TrialStage::new(
            TrialSelector::Angle { particle_type, mobile_site, anchor_site, anchor_site2 },
            Perturber::DistanceAngle,
        )
        .with_num_steps(num_steps),
    )
}

/// Regrow a site from bond, angle and torsion distributions
pub fn dihedral_regrow_trial(
    particle_type: usize,
    mobile_site: usize,
    anchor_site: usize,
    anchor_site2: usize,
    anchor_site3: usize,
    num_steps: usize,
) -> Trial {
    Trial::new("TrialGrowDihedral", TrialCompute::Move).add_stage(
        TrialStage::new(
            TrialSelector::Dihedral { particle_type, mobile_site, anchor_site, anchor_site2, anchor_site3 },
            Perturber::DihedralTorsion,
        )
        .with_num_steps(num_steps),
    )
}

/// Pivot the terminal segment of a chain about its anchor
pub fn pivot_trial(particle_type: usize, max_length: usize, max_degrees: f64) -> Trial {
    Trial::new("TrialPivot", TrialCompute::Move).add_stage(TrialStage::new(
        TrialSelector::EndSegment { particle_type, max_length },
        Perturber::Pivot { tunable: Tunable::new(max_degrees) },
    ))
}

/// Crankshaft rotation of the interior sites between two anchors
pub fn crankshaft_trial(
    particle_type: usize,
    mobile_site: usize,
    anchor_site: usize,
    anchor_site2: usize,
    max_degrees: f64,
) -> Trial {
    Trial::new("TrialCrankshaft", TrialCompute::Move).add_stage(TrialStage::new(
        TrialSelector::Angle { particle_type, mobile_site, anchor_site, anchor_site2 },
        Perturber::Crankshaft { tunable: Tunable::new(max_degrees) },
    ))
}

/// Slide a chain along its own contour by one bond
pub fn reptate_trial(particle_type: usize) -> Trial {
    Trial::new("TrialReptate", TrialCompute::Move)
        .add_stage(TrialStage::new(TrialSelector::Reptate { particle_type }, Perturber::Reptate))
}

/// Swap a molecule's type in place
pub fn morph_trial(particle_type: usize, new_type: usize) -> Trial {
    Trial::new("TrialMorph", TrialCompute::Move).add_stage(TrialStage::new(
        TrialSelector::Particle { particle_type: Some(particle_type) },
        Perturber::Morph { new_type },
    ))
}

/// Rigid translation of a bound cluster
pub fn cluster_translate_trial(criterion: NeighborCriterion, max_move: f64) -> Trial {
    Trial::new("TrialClusterTranslate", TrialCompute::Move).add_stage(TrialStage::new(
        TrialSelector::Cluster { criterion },
        Perturber::Translate { tunable: Tunable::new(max_move) },
    ))
}

/// Aggregation-volume-bias insertion/deletion pair
pub fn avb_transfer_trials(
    criterion: NeighborCriterion,
    particle_type: usize,
    weight: f64,
) -> (Trial, Trial) {
    let inner = criterion.minimum_distance;
    let outer = criterion.maximum_distance;
    let add = Trial::new("TrialAddAvb", TrialCompute::AvbAdd)
        .add_stage(
            TrialStage::new(
                TrialSelector::Ghost { particle_type },
                Perturber::Add { region: AddRegion::ShellAroundAnchor { inner, outer }, orient: false },
            )
            .new_only(),
        )
        .with_weight(weight / 2.0);
    let remove = Trial::new("TrialRemoveAvb", TrialCompute::AvbRemove)
        .add_stage(TrialStage::new(
            TrialSelector::AvbTarget { criterion, particle_type, inside: true },
            Perturber::Remove,
        ))
        .with_weight(weight / 2.0);
    (add, remove)
}

/// Particle transfer between two configurations (Gibbs ensemble)
pub fn gibbs_transfer_trial(particle_type: usize, from: usize, to: usize) -> Trial {
    Trial::new("TrialGibbsTransfer", TrialCompute::GibbsTransfer { from, to })
        .add_stage(
            TrialStage::new(
                TrialSelector::Particle { particle_type: Some(particle_type) },
                Perturber::Remove,
            )
            .in_configuration(from),
        )
        .add_stage(
            TrialStage::new(
                TrialSelector::Ghost { particle_type },
                Perturber::Add { region: AddRegion::Box, orient: false },
            )
            .new_only()
            .in_configuration(to),
        )
}
