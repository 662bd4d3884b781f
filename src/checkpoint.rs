use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use fugacity_flathist::{
    Bias, FlatHistogram, Macrostate, TransitionMatrix, WangLandau, WangLandauTransitionMatrix,
};
use fugacity_montecarlo::{Criterion, MayerSampling, Metropolis, MonteCarlo, TrialFactory};
use fugacity_system::System;

const CHECKPOINT_VERSION: u32 = 1;

/// Serializable stand-in for the criterion trait object, tagged by class
/// name so unknown classes fail deserialization with a clear error.
#[derive(Serialize, Deserialize)]
#[serde(tag = "class")]
enum CriterionState {
    Metropolis(Metropolis),
    MayerSampling(MayerSampling),
    FlatHistogram { macrostate: Macrostate, bias: BiasState, current_energy: f64 },
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "class")]
enum BiasState {
    WangLandau(WangLandau),
    TransitionMatrix(TransitionMatrix),
    WangLandauTransitionMatrix(WangLandauTransitionMatrix),
}

/// An opaque, versioned snapshot of a running simulation.
///
/// Steppers are not persisted; a restarted run re-declares them through its
/// directive script. The random stream is also not persisted, so restarts
/// are statistically continuous rather than draw-for-draw identical.
#[derive(Serialize, Deserialize)]
pub struct Checkpoint {
    version: u32,
    system: System,
    criterion: CriterionState,
    trials: TrialFactory,
}

impl Checkpoint {
    pub fn from_monte_carlo(mc: &MonteCarlo) -> Checkpoint {
        Checkpoint {
            version: CHECKPOINT_VERSION,
            system: mc.system().clone(),
            criterion: Self::criterion_state(mc.criterion()),
            trials: mc.trials().clone(),
        }
    }

    fn criterion_state(criterion: &dyn Criterion) -> CriterionState {
        if let Some(m) = criterion.as_any().downcast_ref::<Metropolis>() {
            return CriterionState::Metropolis(m.clone());
        }
        if let Some(m) = criterion.as_any().downcast_ref::<MayerSampling>() {
            return CriterionState::MayerSampling(m.clone());
        }
        if let Some(fh) = criterion.as_any().downcast_ref::<FlatHistogram>() {
            let bias = if let Some(b) = fh.bias().as_any().downcast_ref::<WangLandau>() {
                BiasState::WangLandau(b.clone())
            } else if let Some(b) = fh.bias().as_any().downcast_ref::<TransitionMatrix>() {
                BiasState::TransitionMatrix(b.clone())
            } else if let Some(b) = fh.bias().as_any().downcast_ref::<WangLandauTransitionMatrix>() {
                BiasState::WangLandauTransitionMatrix(b.clone())
            } else {
                panic!("Checkpoint: unknown bias `{}`", fh.bias().name());
            };
            return CriterionState::FlatHistogram {
                macrostate: fh.macrostate().clone(),
                bias,
                current_energy: fh.current_energy(),
            };
        }
        panic!("Checkpoint: unknown criterion `{}`", criterion.name());
    }

    fn into_criterion(state: CriterionState) -> Box<dyn Criterion> {
        match state {
            CriterionState::Metropolis(m) => Box::new(m),
            CriterionState::MayerSampling(m) => Box::new(m),
            CriterionState::FlatHistogram { macrostate, bias, current_energy } => {
                let bias: Box<dyn Bias> = match bias {
                    BiasState::WangLandau(b) => Box::new(b),
                    BiasState::TransitionMatrix(b) => Box::new(b),
                    BiasState::WangLandauTransitionMatrix(b) => Box::new(b),
                };
                let mut fh = FlatHistogram::new(macrostate, bias);
                fh.set_current_energy(current_energy);
                Box::new(fh)
            }
        }
    }

    /// Writes the checkpoint, rotating any previous file to `<name>.bak`
    pub fn write(&self, fname: &str) -> Result<()> {
        if Path::new(fname).exists() {
            std::fs::rename(fname, format!("{}.bak", fname))
                .with_context(|| format!("can't rotate checkpoint {}", fname))?;
        }
        let text = serde_json::to_string(self).context("can't serialize checkpoint")?;
        std::fs::write(fname, text).with_context(|| format!("can't write checkpoint {}", fname))?;
        Ok(())
    }

    /// Reads a checkpoint, rejecting version mismatches
    pub fn read(fname: &str) -> Result<Checkpoint> {
        let text = std::fs::read_to_string(fname)
            .with_context(|| format!("can't open checkpoint {}", fname))?;
        let checkpoint: Checkpoint =
            serde_json::from_str(&text).with_context(|| format!("can't parse checkpoint {}", fname))?;
        if checkpoint.version != CHECKPOINT_VERSION {
            bail!(
                "checkpoint {} has version {} but this build expects {}",
                fname,
                checkpoint.version,
                CHECKPOINT_VERSION
            );
        }
        Ok(checkpoint)
    }

    /// Rebuilds a driver from the snapshot
    pub fn into_monte_carlo(self) -> MonteCarlo {
        let mut mc = MonteCarlo::new(self.system);
        mc.set_criterion(Self::into_criterion(self.criterion));
        *mc.trials_mut() = self.trials;
        mc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fugacity_configuration::{Configuration, Domain};
    use fugacity_montecarlo::translate_trial;

    #[test]
    fn checkpoints_round_trip() {
        let system = System::new(Configuration::new(Domain::cubic(8.0)));
        let mut mc = MonteCarlo::new(system);
        let mut criterion = Metropolis::new();
        criterion.set_current_energy(-3.5);
        mc.set_criterion(Box::new(criterion));
        mc.trials_mut().add(translate_trial(None, 0.25));

        let fname = std::env::temp_dir().join("fugacity_checkpoint.json");
        let fname = fname.to_string_lossy().to_string();
        Checkpoint::from_monte_carlo(&mc).write(&fname).unwrap();
        let restored = Checkpoint::read(&fname).unwrap().into_monte_carlo();

        assert_eq!(restored.criterion().name(), "Metropolis");
        assert!((restored.criterion().current_energy() + 3.5).abs() < 1e-12);
        assert!(restored.trials().trial(0).is_equal(mc.trials().trial(0)));
        std::fs::remove_file(&fname).ok();
        std::fs::remove_file(format!("{}.bak", &fname)).ok();
    }
}
