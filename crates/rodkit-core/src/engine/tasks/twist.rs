use super::parameters::TWIST_PARAMETER;
use crate::core::math::rod::{TwistInput, twist_delta};
use crate::engine::context::AnalysisContext;
use crate::engine::error::AnalysisError;
use crate::engine::grid::FrameGrid;
use crate::engine::progress::Progress;
use serde::Serialize;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwistResponse {
    /// Twist energy between each pair of adjacent segments, `[frame][site]`.
    pub energy: FrameGrid,
    /// Signed twist angle of the current configuration at each site, when requested.
    pub amount: Option<FrameGrid>,
}

/// Twist energy between every pair of adjacent segments in every frame.
///
/// The twist constant is read per site from the material parameters of the
/// first segment of the pair. With `record_amount` the raw signed twist
/// angle is kept alongside.
#[instrument(skip_all, name = "twist_task")]
pub fn run(context: &AnalysisContext, record_amount: bool) -> Result<TwistResponse, AnalysisError> {
    info!(backend = context.math.name(), record_amount, "Computing twist energies.");
    let rod = context.rod;
    let sites = context.num_bend_sites();
    let num_frames = context.num_frames();

    context.reporter.report(Progress::TaskStart {
        label: "Twist energy",
        total_steps: num_frames as u64,
    });
    let rows = FrameGrid::try_from_rows(num_frames, 2 * sites, |frame| {
        let mut row = vec![0.0; 2 * sites];
        for site in 0..sites {
            let input = TwistInput {
                m_im1: rod.current_m().vec3(frame, site),
                m_im1_equil: rod.equil_m().vec3(frame, site),
                m_i: rod.current_m().vec3(frame, site + 1),
                m_i_equil: rod.equil_m().vec3(frame, site + 1),
                p_im1: context.p_i.vec3(frame, site),
                p_im1_equil: context.equil_p_i.vec3(frame, site),
                p_i: context.p_i.vec3(frame, site + 1),
                p_i_equil: context.equil_p_i.vec3(frame, site + 1),
                beta: rod.material_params().get(frame, site, TWIST_PARAMETER),
            };
            row[site] = context
                .math
                .twist_energy(&input)
                .map_err(|e| degenerate(frame, site, e))?;
            if record_amount {
                row[sites + site] = twist_delta(&input.m_im1, &input.m_i, &input.p_im1, &input.p_i)
                    .map_err(|e| degenerate(frame, site, e))?;
            }
        }
        context.reporter.report(Progress::TaskIncrement { steps: 1 });
        Ok(row)
    })?;
    context.reporter.report(Progress::TaskFinish);

    let energy = split_columns(&rows, 0, sites);
    let amount = record_amount.then(|| split_columns(&rows, sites, sites));
    Ok(TwistResponse { energy, amount })
}

fn degenerate(frame: usize, site: usize, source: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::precondition(
        "non-degenerate segments",
        format!("frame {} twist site {}: {}", frame, site, source),
    )
}

fn split_columns(grid: &FrameGrid, first: usize, count: usize) -> FrameGrid {
    let mut out = FrameGrid::zeros(grid.num_frames(), count);
    for frame in 0..grid.num_frames() {
        for column in 0..count {
            out.set(frame, column, grid.get(frame, first + column));
        }
    }
    out
}
