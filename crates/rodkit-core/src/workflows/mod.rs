//! # Workflows Module
//!
//! End-to-end procedures over a loaded rod trajectory, the entry points used
//! by the command-line tool.
//!
//! ## Architecture
//!
//! - **Analysis Workflow** ([`analyze`]) - Energies, persistence length, RMSD and the
//!   optional deflection test, gathered into one serializable [`analyze::AnalysisReport`]
//! - **Tables** ([`tables`]) - CSV export of the report's per-frame and per-node series

pub mod analyze;
pub mod tables;
