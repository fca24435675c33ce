use super::{load_trajectory, resolve_aligner};
use crate::cli::ResampleArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::FrameProgress;
use rodkit::core::io::rodtraj::RodTrajFile;
use rodkit::core::io::traits::TrajectoryFile;
use rodkit::engine::collaborators::BlockAverageSimplifier;
use rodkit::engine::config::AlignmentConfig;
use rodkit::engine::progress::ProgressReporter;
use rodkit::engine::resample;
use tracing::info;

pub fn run(args: ResampleArgs) -> Result<()> {
    let (mut rod, metadata) = load_trajectory(&args.input)?;
    let before = (rod.num_frames(), rod.num_elements());

    let operation = args.operation;
    if let Some(target) = operation.thin {
        let interval = resample::thin(&mut rod, target)?;
        info!("Thinned with a stride of {} frames.", interval);
    } else if let Some(iterations) = operation.subdivide {
        resample::subdivide(&mut rod, iterations)?;
    } else if let Some(target) = operation.decimate {
        resample::decimate(&mut rod, Some(&BlockAverageSimplifier), target, args.margin)?;
    }

    if let Some(name) = &args.align {
        let aligner = resolve_aligner(name)?.ok_or_else(|| {
            CliError::Argument("--align needs an aligner, not 'none'.".to_string())
        })?;
        let progress = FrameProgress::new();
        let reporter = ProgressReporter::with_callback(progress.callback());
        resample::align_to_equilibrium(&mut rod, aligner.as_ref(), &AlignmentConfig::default(), &reporter)?;
    }

    RodTrajFile::write_to_path(&rod, &metadata, &args.output).map_err(|e| CliError::FileParsing {
        path: args.output.clone(),
        source: e.into(),
    })?;
    println!(
        "✓ Resampled {} frames x {} nodes into {} frames x {} nodes: {}",
        before.0,
        before.1,
        rod.num_frames(),
        rod.num_elements(),
        args.output.display()
    );
    Ok(())
}
