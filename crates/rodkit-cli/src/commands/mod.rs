pub mod analyze;
pub mod info;
pub mod resample;
pub mod symmetry;

use crate::error::{CliError, Result};
use rodkit::core::io::rodtraj::{RodTrajFile, RodTrajMetadata};
use rodkit::core::io::traits::TrajectoryFile;
use rodkit::core::models::trajectory::RodTrajectory;
use rodkit::engine::collaborators::{Collaborators, RigidAligner};
use std::path::Path;
use tracing::info;

pub(crate) fn load_trajectory(path: &Path) -> Result<(RodTrajectory, RodTrajMetadata)> {
    info!("Loading rod trajectory from {:?}", path);
    RodTrajFile::read_from_path(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

pub(crate) fn resolve_aligner(name: &str) -> Result<Option<Box<dyn RigidAligner>>> {
    Collaborators::aligner_by_name(name).ok_or_else(|| {
        CliError::Argument(format!(
            "Unknown aligner '{}'. Expected one of: kabsch, icp, none.",
            name
        ))
    })
}
