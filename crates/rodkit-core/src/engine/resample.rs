//! In-place edits that change a trajectory's frame or node count, or move its
//! current configuration. Each one takes the rod by exclusive reference, so no
//! [`RodAnalysis`](super::analysis::RodAnalysis) can be alive over it at the
//! same time.

use super::collaborators::{NodeSimplifier, RigidAligner};
use super::config::AlignmentConfig;
use super::error::AnalysisError;
use super::progress::{Progress, ProgressReporter};
use crate::core::models::array::NodeArray;
use crate::core::models::channel::Channel;
use crate::core::models::trajectory::{Configuration, RodTrajectory};
use tracing::{info, instrument};

/// Channels whose values are interpolated when a node is inserted. Every
/// other channel gets zeros at new nodes.
const INTERPOLATED: [Channel; 6] = [
    Channel::EquilR,
    Channel::EquilM,
    Channel::CurrentR,
    Channel::CurrentM,
    Channel::MaterialParams,
    Channel::BMatrix,
];

/// Keeps every `interval`-th frame, starting from frame 0, where `interval`
/// is the frame count divided by `target_frames` (at least 1).
///
/// The result has an even stride and so only approximately `target_frames`
/// frames.
///
/// # Errors
///
/// Returns [`AnalysisError::Precondition`] for a zero target.
#[instrument(skip_all, name = "thin_task", fields(target = target_frames))]
pub fn thin(rod: &mut RodTrajectory, target_frames: usize) -> Result<usize, AnalysisError> {
    if target_frames == 0 {
        return Err(AnalysisError::precondition(
            "positive target frame count",
            "cannot thin a trajectory to zero frames",
        ));
    }
    let interval = (rod.num_frames() / target_frames).max(1);
    let kept: Vec<usize> = (0..rod.num_frames()).step_by(interval).collect();

    let mut channels = Vec::with_capacity(Channel::COUNT);
    for array in rod.channels() {
        channels.push(array.select_frames(&kept)?);
    }
    rod.replace_channels(into_channel_array(channels)?)?;
    info!(interval, frames = rod.num_frames(), "Trajectory thinned.");
    Ok(interval)
}

/// Inserts a node halfway between every pair of neighbours, `iterations`
/// times over, taking `n` nodes to `2n - 1` each time.
///
/// Positions, material axes, material parameters and B matrices are
/// averaged from the two neighbours; perturbation energies and steric
/// channels are zero at the new nodes.
///
/// # Errors
///
/// Returns [`AnalysisError::Precondition`] if the rod has more than one
/// frame. Subdividing a trajectory would invent dynamics.
#[instrument(skip_all, name = "subdivide_task", fields(iterations = iterations))]
pub fn subdivide(rod: &mut RodTrajectory, iterations: usize) -> Result<(), AnalysisError> {
    if rod.num_frames() > 1 {
        return Err(AnalysisError::precondition(
            "single-frame rod",
            format!(
                "cannot subdivide a trajectory of {} frames",
                rod.num_frames()
            ),
        ));
    }
    for _ in 0..iterations {
        let channels: Vec<NodeArray> = Channel::ALL
            .iter()
            .map(|&channel| subdivided(rod.channel(channel), INTERPOLATED.contains(&channel)))
            .collect();
        rod.replace_channels(into_channel_array(channels)?)?;
    }
    info!(nodes = rod.num_elements(), "Rod subdivided.");
    Ok(())
}

fn subdivided(array: &NodeArray, interpolate: bool) -> NodeArray {
    let nodes = array.num_nodes();
    let width = array.width();
    let mut out = NodeArray::zeros(array.num_frames(), (2 * nodes).saturating_sub(1), width);
    for frame in 0..array.num_frames() {
        for node in 0..nodes {
            out.node_mut(frame, 2 * node)
                .copy_from_slice(array.node(frame, node));
            if interpolate && node + 1 < nodes {
                let next = array.node(frame, node + 1);
                for (c, (a, b)) in array.node(frame, node).iter().zip(next).enumerate() {
                    out.set(frame, 2 * node + 1, c, 0.5 * (a + b));
                }
            }
        }
    }
    out
}

/// Reduces the node count of every channel to about `target_length` with
/// the supplied simplifier.
///
/// # Errors
///
/// Returns [`AnalysisError::MissingCollaborator`] without a simplifier,
/// [`AnalysisError::CollaboratorFailed`] if it rejects the request, and a
/// shape error if it reshapes channels inconsistently.
#[instrument(skip_all, name = "decimate_task", fields(target = target_length, margin = margin))]
pub fn decimate(
    rod: &mut RodTrajectory,
    simplifier: Option<&dyn NodeSimplifier>,
    target_length: usize,
    margin: f64,
) -> Result<(), AnalysisError> {
    let simplifier = simplifier.ok_or(AnalysisError::MissingCollaborator {
        name: "node simplifier",
        hint: "supply one, e.g. BlockAverageSimplifier",
    })?;

    let mut channels = Vec::with_capacity(Channel::COUNT);
    for (channel, array) in Channel::ALL.iter().zip(rod.channels()) {
        let reduced = simplifier
            .simplify(array, target_length, margin)
            .map_err(|e| AnalysisError::CollaboratorFailed {
                name: simplifier.name(),
                message: format!("{}: {}", channel, e),
            })?;
        channels.push(reduced);
    }
    let before = rod.num_elements();
    rod.replace_channels(into_channel_array(channels)?)?;
    info!(
        simplifier = simplifier.name(),
        before,
        after = rod.num_elements(),
        "Rod decimated."
    );
    Ok(())
}

/// Rigidly moves every frame's current configuration onto its equilibrium
/// configuration. Material axes turn with the positions.
#[instrument(skip_all, name = "trajectory_alignment_task")]
pub fn align_to_equilibrium(
    rod: &mut RodTrajectory,
    aligner: &dyn RigidAligner,
    settings: &AlignmentConfig,
    reporter: &ProgressReporter,
) -> Result<(), AnalysisError> {
    let num_frames = rod.num_frames();
    info!(aligner = aligner.name(), frames = num_frames, "Aligning trajectory to equilibrium.");
    reporter.report(Progress::TaskStart {
        label: "Aligning frame",
        total_steps: num_frames as u64,
    });
    for frame in 0..num_frames {
        let source = rod.current_r().frame_vectors(frame);
        let target = rod.equil_r().frame_vectors(frame);
        let alignment = aligner
            .align(&source, &target, settings.max_iterations, settings.tolerance)
            .map_err(|e| AnalysisError::CollaboratorFailed {
                name: aligner.name(),
                message: format!("frame {}: {}", frame, e),
            })?;
        rod.apply_transform(Configuration::Current, frame, &alignment.transform);
        if frame % settings.progress_interval == 0 {
            info!(frame, "Aligning frame.");
        }
        reporter.report(Progress::TaskIncrement { steps: 1 });
    }
    reporter.report(Progress::TaskFinish);
    Ok(())
}

fn into_channel_array(
    channels: Vec<NodeArray>,
) -> Result<[NodeArray; Channel::COUNT], AnalysisError> {
    let found = channels.len();
    channels.try_into().map_err(|_| {
        AnalysisError::precondition(
            "one array per channel",
            format!("expected {} channel arrays, got {}", Channel::COUNT, found),
        )
    })
}
