use serde::{Deserialize, Serialize};

use crate::MonteCarlo;

/// A `Run` directive: how long to drive a [`MonteCarlo`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Run {
    NumAttempts(u64),
    UntilComplete,
    ForHours(f64),
}

impl Run {
    pub fn run(&self, mc: &mut MonteCarlo) {
        match self {
            Run::NumAttempts(num) => mc.run_num_attempts(*num),
            Run::UntilComplete => mc.run_until_complete(),
            Run::ForHours(hours) => mc.run_for_hours(*hours),
        }
    }
}
