//! # Core Module
//!
//! The stateless foundation of the library: the rod trajectory data model,
//! the numerical primitives of discrete elastic rod theory, and file I/O.
//!
//! ## Architecture
//!
//! - **Data Model** ([`models`]) - Per-frame, per-node channels and the [`RodTrajectory`](models::trajectory::RodTrajectory) that owns them
//! - **Mathematics** ([`math`]) - Vector primitives, parallel transport, and the stretch/bend/twist energy formulas
//! - **File I/O** ([`io`]) - Reading and writing the rod trajectory format with exact round-trip fidelity
//!
//! ## Scientific Foundation
//!
//! - **Discrete elastic rods**: a centerline of nodes joined by segments, each
//!   carrying a material frame whose rotation relative to its neighbour measures twist
//! - **Parallel transport** moves frames between adjacent tangents without
//!   introducing artificial twist
//! - **Quadratic elastic energies** for stretching, bending (through a per-node
//!   2x2 stiffness matrix) and twisting

pub mod io;
pub mod math;
pub mod models;
