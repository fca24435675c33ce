//! Analysis tasks over a fixed rod trajectory.
//!
//! Each task is a free function over an [`AnalysisContext`](super::context::AnalysisContext)
//! (or the bare trajectory when it needs nothing else) that derives one family
//! of quantities: elastic energies, persistence length, geometry, RMSD, or the
//! symmetry checks. Tasks never mutate the trajectory; caching is the
//! responsibility of [`RodAnalysis`](super::analysis::RodAnalysis).

pub mod bending;
pub mod geometry;
pub mod parameters;
pub mod persistence;
pub mod rmsd;
pub mod stretch;
pub mod symmetry;
pub mod twist;

#[cfg(test)]
pub(crate) mod fixtures;
