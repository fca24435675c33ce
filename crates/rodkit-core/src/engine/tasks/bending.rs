use super::parameters::constant_ei;
use crate::core::math::rod::{BendInput, b_matrix_from_flat, bend_quadratic, omega};
use crate::core::math::vector::{self, MathError};
use crate::core::models::array::NodeArray;
use crate::engine::context::AnalysisContext;
use crate::engine::error::AnalysisError;
use crate::engine::grid::FrameGrid;
use crate::engine::progress::Progress;
use nalgebra::{Vector2, Vector3};
use tracing::{info, instrument, warn};

/// Pointwise bending energy at every interior node, shape `[frame][site]`.
///
/// Each of the two segments meeting at the node contributes a curvature
/// measured in its own material frame and weighted by its own B matrix.
#[instrument(skip_all, name = "pointwise_bending_task")]
pub fn pointwise(context: &AnalysisContext) -> Result<FrameGrid, AnalysisError> {
    warn_if_not_isotropic(context);
    info!("Computing pointwise bending energies.");
    let rod = context.rod;
    let sites = context.num_bend_sites();

    run_per_frame(context, "Pointwise bending", sites, |frame, site| {
        let current = site_omegas(context.p_i, rod.current_m(), frame, site)?;
        let equil = site_omegas(context.equil_p_i, rod.equil_m(), frame, site)?;
        let b_left = b_matrix_from_flat(rod.b_matrix().node(frame, site));
        let b_right = b_matrix_from_flat(rod.b_matrix().node(frame, site + 1));

        let length = context.equil_p_i.vec3(frame, site).norm()
            + context.equil_p_i.vec3(frame, site + 1).norm();
        if length == 0.0 {
            return Err(MathError::DivisionByZero.into());
        }
        let inner = bend_quadratic(&(current.0 - equil.0), &b_left)
            + bend_quadratic(&(current.1 - equil.1), &b_right);
        Ok(0.5 * inner / length)
    })
}

/// Bending energy in the mutual material frame of each interior node, shape
/// `[frame][site]`. `rotate` turns the current mutual axis about the mutual
/// tangent before evaluation.
#[instrument(skip_all, name = "mutual_bending_task")]
pub fn mutual(context: &AnalysisContext, rotate: Option<f64>) -> Result<FrameGrid, AnalysisError> {
    warn_if_not_isotropic(context);
    info!(backend = context.math.name(), ?rotate, "Computing mutual-frame bending energies.");
    let rod = context.rod;
    let sites = context.num_bend_sites();

    run_per_frame(context, "Mutual bending", sites, |frame, site| {
        let input = BendInput {
            p_im1: context.p_i.vec3(frame, site),
            p_i: context.p_i.vec3(frame, site + 1),
            p_im1_equil: context.equil_p_i.vec3(frame, site),
            p_i_equil: context.equil_p_i.vec3(frame, site + 1),
            m_im1: rod.current_m().vec3(frame, site),
            m_i: rod.current_m().vec3(frame, site + 1),
            m_im1_equil: rod.equil_m().vec3(frame, site),
            m_i_equil: rod.equil_m().vec3(frame, site + 1),
            b: b_matrix_from_flat(rod.b_matrix().node(frame, site + 1)),
            rotate,
        };
        Ok(context.math.bend_energy(&input)?)
    })
}

fn run_per_frame<F>(
    context: &AnalysisContext,
    label: &'static str,
    sites: usize,
    energy: F,
) -> Result<FrameGrid, AnalysisError>
where
    F: Fn(usize, usize) -> Result<f64, AnalysisError> + Sync + Send,
{
    context.reporter.report(Progress::TaskStart {
        label,
        total_steps: context.num_frames() as u64,
    });
    let grid = FrameGrid::try_from_rows(context.num_frames(), sites, |frame| {
        let row = (0..sites)
            .map(|site| {
                energy(frame, site).map_err(|e| match e {
                    AnalysisError::Math(source) => AnalysisError::precondition(
                        "non-degenerate segments",
                        format!("frame {} bend site {}: {}", frame, site, source),
                    ),
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>();
        context.reporter.report(Progress::TaskIncrement { steps: 1 });
        row
    })?;
    context.reporter.report(Progress::TaskFinish);
    Ok(grid)
}

/// Curvature of the bend between segments `site` and `site + 1`, projected
/// once onto each segment's own `{n, m}` frame.
fn site_omegas(
    p: &NodeArray,
    m: &NodeArray,
    frame: usize,
    site: usize,
) -> Result<(Vector2<f64>, Vector2<f64>), AnalysisError> {
    let p_im1 = p.vec3(frame, site);
    let p_i = p.vec3(frame, site + 1);
    let (n_im1, m_im1) = own_frame(&m.vec3(frame, site), &p_im1)?;
    let (n_i, m_i) = own_frame(&m.vec3(frame, site + 1), &p_i)?;
    Ok((
        omega(&p_i, &p_im1, &n_im1, &m_im1)?,
        omega(&p_i, &p_im1, &n_i, &m_i)?,
    ))
}

fn own_frame(
    m: &Vector3<f64>,
    p: &Vector3<f64>,
) -> Result<(Vector3<f64>, Vector3<f64>), MathError> {
    let m = vector::normalize(m)?;
    let n = m.cross(&vector::normalize(p)?);
    Ok((n, m))
}

fn warn_if_not_isotropic(context: &AnalysisContext) {
    if let Err(e) = constant_ei(context.rod) {
        warn!(reason = %e, "EI is not constant; bending energies are unsuitable for an equipartition test.");
    }
}
