use crate::core::models::array::NodeArray;
use crate::engine::collaborators::RigidAligner;
use crate::engine::context::AnalysisContext;
use crate::engine::error::AnalysisError;
use crate::engine::progress::Progress;
use tracing::{info, instrument};

/// Equilibrium positions rigidly fitted onto the current positions, frame by frame.
///
/// Each frame starts from the previous frame's fitted equilibrium, which keeps
/// the aligner from having to find the fit from scratch. Every
/// `reanchor_interval` frames it restarts from the raw equilibrium to stop
/// floating-point drift from accumulating.
#[instrument(skip_all, name = "equilibrium_alignment_task")]
pub fn aligned_equilibrium(
    context: &AnalysisContext,
    aligner: &dyn RigidAligner,
) -> Result<NodeArray, AnalysisError> {
    let settings = context.config.alignment;
    let rod = context.rod;
    let num_frames = context.num_frames();
    info!(
        aligner = aligner.name(),
        frames = num_frames,
        reanchor_interval = settings.reanchor_interval,
        "Aligning equilibrium configuration to every frame."
    );
    context.reporter.report(Progress::TaskStart {
        label: "Aligning frame",
        total_steps: num_frames as u64,
    });

    let mut aligned = NodeArray::with_capacity(rod.num_elements(), 3, num_frames);
    let mut previous: Vec<nalgebra::Vector3<f64>> = Vec::new();
    for frame in 0..num_frames {
        let source = if frame % settings.reanchor_interval == 0 {
            rod.equil_r().frame_vectors(frame)
        } else {
            std::mem::take(&mut previous)
        };
        let target = rod.current_r().frame_vectors(frame);
        let alignment = aligner
            .align(&source, &target, settings.max_iterations, settings.tolerance)
            .map_err(|e| AnalysisError::CollaboratorFailed {
                name: aligner.name(),
                message: format!("frame {}: {}", frame, e),
            })?;

        previous = source.iter().map(|p| alignment.apply(p)).collect();
        let flat: Vec<f64> = previous.iter().flat_map(|v| [v.x, v.y, v.z]).collect();
        aligned.push_frame(&flat)?;

        if frame % settings.progress_interval == 0 {
            info!(frame, "Aligning frame.");
        }
        context.reporter.report(Progress::TaskIncrement { steps: 1 });
    }
    context.reporter.report(Progress::TaskFinish);
    Ok(aligned)
}

/// Time-averaged RMSD of every node, `sqrt(mean_f |c - e|²)`.
pub fn node_rmsd(current: &NodeArray, reference: &NodeArray) -> Vec<f64> {
    let frames = current.num_frames();
    (0..current.num_nodes())
        .map(|node| {
            let sum: f64 = (0..frames)
                .map(|f| (current.vec3(f, node) - reference.vec3(f, node)).norm_squared())
                .sum();
            (sum / frames as f64).sqrt()
        })
        .collect()
}

/// Node-averaged RMSD of every frame, `sqrt(mean_n |c - e|²)`, optionally
/// stopping before `max_frame`.
pub fn time_rmsd(current: &NodeArray, reference: &NodeArray, max_frame: Option<usize>) -> Vec<f64> {
    let frames = max_frame.map_or(current.num_frames(), |m| m.min(current.num_frames()));
    let nodes = current.num_nodes();
    (0..frames)
        .map(|f| {
            let sum: f64 = (0..nodes)
                .map(|n| (current.vec3(f, n) - reference.vec3(f, n)).norm_squared())
                .sum();
            (sum / nodes as f64).sqrt()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::trajectory::Configuration;
    use crate::engine::collaborators::{CollaboratorError, IcpAligner, KabschAligner};
    use crate::engine::tasks::fixtures::{self, Harness};
    use nalgebra::Vector3;

    fn displaced(shift: Vector3<f64>) -> Harness {
        let equil = fixtures::line(4);
        let current: Vec<_> = equil.iter().map(|p| p + shift).collect();
        Harness::new(fixtures::rod_from(&[equil.clone(), equil], &[current.clone(), current]))
    }

    #[test]
    fn unaligned_rmsd_of_uniform_shift() {
        let harness = displaced(Vector3::new(0.0, 0.3, 0.4));
        let rod = &harness.rod;
        let per_node = node_rmsd(rod.current_r(), rod.equil_r());
        assert_eq!(per_node.len(), 4);
        assert!(per_node.iter().all(|r| (r - 0.5).abs() < 1e-12));
        let per_frame = time_rmsd(rod.current_r(), rod.equil_r(), None);
        assert_eq!(per_frame.len(), 2);
        assert!((per_frame[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn time_rmsd_honours_max_frame() {
        let harness = displaced(Vector3::x());
        let rod = &harness.rod;
        assert_eq!(time_rmsd(rod.current_r(), rod.equil_r(), Some(1)).len(), 1);
        assert_eq!(time_rmsd(rod.current_r(), rod.equil_r(), Some(10)).len(), 2);
    }

    #[test]
    fn alignment_removes_rigid_motion() {
        let harness = displaced(Vector3::new(0.0, 0.3, 0.4));
        let context = harness.context();
        let aligners: [&dyn RigidAligner; 2] = [&KabschAligner, &IcpAligner];
        for aligner in aligners {
            let aligned = aligned_equilibrium(&context, aligner).unwrap();
            let rmsd = node_rmsd(context.rod.positions(Configuration::Current), &aligned);
            assert!(rmsd.iter().all(|r| *r < 1e-6), "{}: {:?}", aligner.name(), rmsd);
        }
    }

    #[test]
    fn aligner_failure_names_the_frame() {
        struct Failing;
        impl RigidAligner for Failing {
            fn name(&self) -> &'static str {
                "failing"
            }
            fn align(
                &self,
                _: &[Vector3<f64>],
                _: &[Vector3<f64>],
                _: usize,
                _: f64,
            ) -> Result<crate::engine::collaborators::Alignment, CollaboratorError> {
                Err(CollaboratorError::SvdFailed)
            }
        }
        let harness = displaced(Vector3::x());
        let err = aligned_equilibrium(&harness.context(), &Failing).unwrap_err();
        match err {
            AnalysisError::CollaboratorFailed { name, message } => {
                assert_eq!(name, "failing");
                assert!(message.starts_with("frame 0"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
