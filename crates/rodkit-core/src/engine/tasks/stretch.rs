use super::parameters::{STRETCH_PARAMETER, constant_parameter};
use crate::engine::context::AnalysisContext;
use crate::engine::error::AnalysisError;
use crate::engine::grid::FrameGrid;
use crate::engine::progress::Progress;
use tracing::{info, instrument};

/// Stretch energy of every segment in every frame, shape `[frame][segment]`.
///
/// Uses the rod-wide stretch constant, so a non-uniform rod is rejected.
#[instrument(skip_all, name = "stretch_task")]
pub fn run(context: &AnalysisContext) -> Result<FrameGrid, AnalysisError> {
    let k = constant_parameter(context.rod, STRETCH_PARAMETER)?;
    let num_segments = context.rod.num_segments();
    info!(k, backend = context.math.name(), "Computing stretch energies.");

    context.reporter.report(Progress::TaskStart {
        label: "Stretch energy",
        total_steps: context.num_frames() as u64,
    });
    let grid = FrameGrid::try_from_rows(context.num_frames(), num_segments, |frame| {
        let row = (0..num_segments)
            .map(|i| {
                context
                    .math
                    .stretch_energy(
                        k,
                        &context.p_i.vec3(frame, i),
                        &context.equil_p_i.vec3(frame, i),
                    )
                    .map_err(AnalysisError::from)
            })
            .collect::<Result<Vec<_>, _>>();
        context.reporter.report(Progress::TaskIncrement { steps: 1 });
        row
    })?;
    context.reporter.report(Progress::TaskFinish);
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tasks::fixtures::{self, Harness};
    use nalgebra::Vector3;

    #[test]
    fn two_node_rod_stretched_by_ten_percent() {
        let equil = vec![vec![Vector3::zeros(), Vector3::x()]];
        let current = vec![vec![Vector3::zeros(), Vector3::new(1.1, 0.0, 0.0)]];
        let harness = Harness::new(fixtures::rod_from(&equil, &current));
        let grid = run(&harness.context()).unwrap();
        assert_eq!(grid.num_frames(), 1);
        assert_eq!(grid.num_columns(), 1);
        assert!((grid.get(0, 0) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn relaxed_rod_has_no_stretch_energy() {
        let harness = Harness::new(fixtures::straight_rod(5, 3));
        let grid = run(&harness.context()).unwrap();
        assert_eq!(grid.num_columns(), 4);
        assert!(grid.as_slice().iter().all(|&e| e.abs() < 1e-15));
    }

    #[test]
    fn compression_and_extension_are_both_positive() {
        let equil = vec![fixtures::line(3)];
        let current = vec![vec![
            Vector3::zeros(),
            Vector3::new(0.8, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
        ]];
        let harness = Harness::new(fixtures::rod_from(&equil, &current));
        let grid = run(&harness.context()).unwrap();
        assert!(grid.get(0, 0) > 0.0);
        assert!(grid.get(0, 1) > 0.0);
        assert!((grid.get(0, 0) - 0.5 * fixtures::K * 0.04).abs() < 1e-12);
    }
}
