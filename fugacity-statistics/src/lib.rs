//! Statistical utilities shared across the fugacity workspace: evenly binned
//! histograms (the backbone of macrostate bookkeeping) and on-line moment
//! accumulators.

mod histograms;
mod accumulator;

pub use histograms::*;
pub use accumulator::*;
