//! Provides input/output for rod trajectory files.
//!
//! The [`traits::TrajectoryFile`] trait gives every format the same reader,
//! writer and path-based API; [`rodtraj`] implements the line-oriented rod
//! trajectory format written by the simulation engine.

pub mod rodtraj;
pub mod traits;
