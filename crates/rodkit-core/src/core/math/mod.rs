//! Numerical building blocks for discrete elastic rods.
//!
//! - [`vector`] - Stateless 3-vector operations: normalization, signed angles,
//!   parallel transport, Rodrigues rotation and Euler-angle extraction.
//! - [`rod`] - The stretch, twist and bend energy formulas behind the
//!   [`RodMath`](rod::RodMath) trait, with the double-precision reference backend.
//! - [`fast`] - A single-precision backend with the same numeric contracts.
//! - [`analytical`] - Closed-form predictions used to validate measurements.

pub mod analytical;
pub mod fast;
pub mod rod;
pub mod vector;
