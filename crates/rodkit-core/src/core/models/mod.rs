//! # Core Models Module
//!
//! Data structures describing a recorded rod trajectory.
//!
//! ## Key Components
//!
//! - [`channel`] - The seventeen per-node quantities recorded each frame, in file row order
//! - [`array`] - Dense `[frame][node][width]` storage shared by every channel
//! - [`trajectory`] - The rod itself: shape invariants, segment vectors and rigid edits
//!
//! ## Usage
//!
//! ```ignore
//! use rodkit::core::models::{channel::Channel, trajectory::RodTrajectory};
//!
//! let mut rod = RodTrajectory::zeroed(5, 1)?;
//! rod.set_node(Channel::CurrentR, 0, 4, &[4.0, 0.0, 0.0])?;
//! let p_i = rod.segments(Configuration::Current);
//! ```

pub mod array;
pub mod channel;
pub mod trajectory;
