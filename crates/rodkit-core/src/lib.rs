//! # rodkit
//!
//! Trajectory data model and analysis engine for discretized elastic rods:
//! one-dimensional continua represented as a chain of nodes, each carrying a
//! position and a material-frame axis, recorded frame by frame by a
//! simulation engine.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`RodTrajectory`,
//!   `NodeArray`, `Channel`), the vector and elastic-energy mathematics, and
//!   the rod trajectory file codec.
//!
//! - **[`engine`]: The Logic Core.** `RodAnalysis`, which lazily derives and
//!   caches energies, persistence lengths, RMSD and symmetry checks over a
//!   borrowed trajectory, plus the resampling operations that edit one.
//!
//! - **[`workflows`]: The Public API.** Complete procedures such as the
//!   analysis report and its CSV tables.

pub mod core;
pub mod engine;
pub mod workflows;
