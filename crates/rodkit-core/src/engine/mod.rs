//! # Engine Module
//!
//! The stateful analysis layer: derives physical quantities from a loaded
//! [`RodTrajectory`](crate::core::models::trajectory::RodTrajectory) and edits
//! trajectories in place.
//!
//! ## Overview
//!
//! [`analysis::RodAnalysis`] borrows a trajectory and computes each derived
//! quantity on first request, keeping it in an explicit [`cache`]. The
//! computations themselves are free functions in [`tasks`] that read a shared
//! [`context`]. Operations that change frame or node counts live in
//! [`resample`] and need exclusive access to the trajectory.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Math backend, symmetry tolerances, alignment settings and temperature
//! - **Analysis** ([`analysis`]) - The lazily caching facade over every derived quantity
//! - **Tasks** ([`tasks`]) - Energies, persistence length, geometry, RMSD and symmetry checks
//! - **Collaborators** ([`collaborators`]) - Rigid alignment and node simplification behind traits
//! - **Resampling** ([`resample`]) - Thinning, subdivision, decimation and trajectory alignment
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - The engine's error type
//!
//! ## Key Capabilities
//!
//! - **Interchangeable math backends** chosen once per analysis
//! - **Per-frame parallelism** for energy grids behind the `parallel` feature
//! - **Explicit caching** where "not computed" is distinct from any value

pub mod analysis;
pub mod cache;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod grid;
pub mod progress;
pub mod resample;
pub mod tasks;
