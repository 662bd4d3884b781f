use log::info;
use rayon::prelude::*;

use fugacity_io::out_writer;
use fugacity_montecarlo::MonteCarlo;

use crate::{Bias, CollectionMatrix, FlatHistogram, TransitionMatrix, WangLandauTransitionMatrix};

/// Orchestrates several flat-histogram windows over disjoint macrostate
/// ranges: runs each for a wall-clock slice, periodically rebalances window
/// bounds by progress, and stitches the collection matrices into one global
/// log-probability.
///
/// Windows run concurrently; the bounds-adjust and the global write happen
/// at the barrier between slices (one writer, no ordering inside a slice).
pub struct CollectionMatrixSplice {
    windows: Vec<MonteCarlo>,
    min_window_size: usize,
    hours_per: f64,
    ln_prob_file: String,
}

fn flat_histogram(mc: &MonteCarlo) -> &FlatHistogram {
    mc.criterion()
        .as_any()
        .downcast_ref::<FlatHistogram>()
        .expect("every splice window carries a FlatHistogram criterion")
}

fn flat_histogram_mut(mc: &mut MonteCarlo) -> &mut FlatHistogram {
    mc.criterion_mut()
        .as_any_mut()
        .downcast_mut::<FlatHistogram>()
        .expect("every splice window carries a FlatHistogram criterion")
}

fn collection_of(bias: &dyn Bias) -> &CollectionMatrix {
    if let Some(tm) = bias.as_any().downcast_ref::<TransitionMatrix>() {
        return tm.collection();
    }
    if let Some(wltm) = bias.as_any().downcast_ref::<WangLandauTransitionMatrix>() {
        return wltm.transition_matrix().collection();
    }
    panic!("splicing requires a transition-matrix (or crossover) bias");
}

impl CollectionMatrixSplice {
    pub fn new(min_window_size: usize, hours_per: f64, ln_prob_file: &str) -> CollectionMatrixSplice {
        CollectionMatrixSplice {
            windows: Vec::new(),
            min_window_size,
            hours_per,
            ln_prob_file: ln_prob_file.to_string(),
        }
    }

    /// Registers a window; its macrostate soft bounds must already tile the
    /// global range with its neighbors.
    pub fn add(&mut self, mc: MonteCarlo) {
        if let Some(last) = self.windows.last() {
            let prev_max = flat_histogram(last).macrostate().soft_max();
            let next_min = flat_histogram(&mc).macrostate().soft_min();
            assert_eq!(
                prev_max + 1,
                next_min,
                "window bounds must be contiguous: {} then {}",
                prev_max,
                next_min
            );
        }
        self.windows.push(mc);
    }

    pub fn num_windows(&self) -> usize {
        self.windows.len()
    }

    pub fn window(&self, i: usize) -> &MonteCarlo {
        &self.windows[i]
    }

    pub fn window_mut(&mut self, i: usize) -> &mut MonteCarlo {
        &mut self.windows[i]
    }

    pub fn are_all_complete(&self) -> bool {
        self.windows.iter().all(|mc| mc.criterion().is_complete())
    }

    /// Runs every window concurrently for one wall-clock slice
    pub fn run_cycle(&mut self) {
        let hours = self.hours_per;
        self.windows.par_iter_mut().for_each(|mc| {
            mc.run_for_hours(hours);
        });
    }

    /// Donates one boundary bin from the faster window to its slower
    /// neighbor, respecting the minimum window size.
    pub fn adjust_bounds(&mut self) {
        for i in 0..self.windows.len().saturating_sub(1) {
            let left_iterations = flat_histogram(&self.windows[i]).bias().num_iterations();
            let right_iterations = flat_histogram(&self.windows[i + 1]).bias().num_iterations();
            let left_size = {
                let m = flat_histogram(&self.windows[i]).macrostate();
                m.soft_max() - m.soft_min() + 1
            };
            let right_size = {
                let m = flat_histogram(&self.windows[i + 1]).macrostate();
                m.soft_max() - m.soft_min() + 1
            };
            if left_iterations > right_iterations && left_size > self.min_window_size {
                // shrink the left window, extend the right one
                let boundary = flat_histogram(&self.windows[i]).macrostate().soft_max();
                let left = flat_histogram_mut(&mut self.windows[i]);
                let min = left.macrostate().soft_min();
                left.macrostate_mut().set_soft_bounds(min, boundary - 1);
                let right = flat_histogram_mut(&mut self.windows[i + 1]);
                let max = right.macrostate().soft_max();
                right.macrostate_mut().set_soft_bounds(boundary, max);
                info!("donated bin {} rightwards at window {}", boundary, i);
            } else if right_iterations > left_iterations && right_size > self.min_window_size {
                let boundary = flat_histogram(&self.windows[i + 1]).macrostate().soft_min();
                let right = flat_histogram_mut(&mut self.windows[i + 1]);
                let max = right.macrostate().soft_max();
                right.macrostate_mut().set_soft_bounds(boundary + 1, max);
                let left = flat_histogram_mut(&mut self.windows[i]);
                let min = left.macrostate().soft_min();
                left.macrostate_mut().set_soft_bounds(min, boundary);
                info!("donated bin {} leftwards at window {}", boundary, i + 1);
            }
        }
    }

    /// Assembles the global collection matrix: each bin takes its row from
    /// the window that owns it.
    pub fn collection_matrix(&self) -> CollectionMatrix {
        let num_bins = flat_histogram(&self.windows[0]).macrostate().num_bins();
        let mut global = CollectionMatrix::new(num_bins);
        for mc in &self.windows {
            let fh = flat_histogram(mc);
            let cm = collection_of(fh.bias());
            global.splice_rows(cm, fh.macrostate().soft_min(), fh.macrostate().soft_max());
        }
        global
    }

    /// Writes the spliced log-probability table
    pub fn write_ln_prob(&self) {
        if self.ln_prob_file.is_empty() {
            return;
        }
        let lnpi = self.collection_matrix().ln_prob();
        let mut out = out_writer(&self.ln_prob_file, false);
        use std::io::Write;
        writeln!(out, "state,ln_prob").ok();
        for bin in 0..lnpi.size() {
            writeln!(out, "{},{:.12}", bin, lnpi.value(bin)).ok();
        }
    }

    /// The main loop: slices, barrier, rebalance, write, until every window
    /// reports completion.
    pub fn run_until_all_are_complete(&mut self) {
        while !self.are_all_complete() {
            self.run_cycle();
            self.adjust_bounds();
            self.write_ln_prob();
        }
        self.write_ln_prob();
        info!("all {} windows complete", self.windows.len());
    }
}
