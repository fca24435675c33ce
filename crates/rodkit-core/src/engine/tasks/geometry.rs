use crate::core::math::vector;
use crate::core::models::trajectory::{Configuration, RodTrajectory};
use crate::engine::context::AnalysisContext;
use crate::engine::error::AnalysisError;
use crate::engine::grid::FrameGrid;
use serde::Serialize;

/// How [`absolute_length`] measures a stretch of rod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthMeasure {
    /// Sum of segment lengths along the path.
    Contour,
    /// Separation of the two end nodes projected on one coordinate axis.
    Axis(usize),
}

/// Frame-to-frame node motion. The last frame has no successor and stays zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDisplacements {
    pub x: FrameGrid,
    pub y: FrameGrid,
    /// Cosine between a node's material axis and its value one frame later.
    pub twist: FrameGrid,
}

pub fn delta_r(rod: &RodTrajectory) -> Result<NodeDisplacements, AnalysisError> {
    let (frames, nodes) = (rod.num_frames(), rod.num_elements());
    let mut x = FrameGrid::zeros(frames, nodes);
    let mut y = FrameGrid::zeros(frames, nodes);
    let mut twist = FrameGrid::zeros(frames, nodes);
    let r = rod.current_r();
    let m = rod.current_m();

    for frame in 0..frames.saturating_sub(1) {
        for node in 0..nodes {
            let step = r.vec3(frame + 1, node) - r.vec3(frame, node);
            x.set(frame, node, step.x);
            y.set(frame, node, step.y);
            let cos = vector::normalize(&m.vec3(frame, node))?
                .dot(&vector::normalize(&m.vec3(frame + 1, node))?);
            twist.set(frame, node, cos);
        }
    }
    Ok(NodeDisplacements { x, y, twist })
}

/// Integration length `L_i` of every interior node: half the summed lengths
/// of its two equilibrium segments.
pub fn integration_lengths(context: &AnalysisContext) -> FrameGrid {
    let sites = context.num_bend_sites();
    let mut grid = FrameGrid::zeros(context.num_frames(), sites);
    for frame in 0..context.num_frames() {
        for site in 0..sites {
            let l = 0.5
                * (context.equil_p_i.vec3(frame, site + 1).norm()
                    + context.equil_p_i.vec3(frame, site).norm());
            grid.set(frame, site, l);
        }
    }
    grid
}

/// Length of the rod between nodes `start` and `end` on one frame.
///
/// # Errors
///
/// Returns [`AnalysisError::Precondition`] if the node range, frame or axis
/// is out of bounds.
pub fn absolute_length(
    context: &AnalysisContext,
    start: usize,
    end: usize,
    frame: usize,
    configuration: Configuration,
    measure: LengthMeasure,
) -> Result<f64, AnalysisError> {
    if frame >= context.num_frames() {
        return Err(AnalysisError::precondition(
            "frame in range",
            format!("frame {} of {}", frame, context.num_frames()),
        ));
    }
    if start > end || end >= context.num_nodes() {
        return Err(AnalysisError::precondition(
            "node range in bounds",
            format!("nodes {}..{} on a rod of {}", start, end, context.num_nodes()),
        ));
    }
    match measure {
        LengthMeasure::Contour => {
            let p = match configuration {
                Configuration::Current => context.p_i,
                Configuration::Equilibrium => context.equil_p_i,
            };
            Ok((start..end).map(|i| p.vec3(frame, i).norm()).sum())
        }
        LengthMeasure::Axis(axis) => {
            if axis >= 3 {
                return Err(AnalysisError::precondition(
                    "spatial axis",
                    format!("axis index {} is not one of x, y, z", axis),
                ));
            }
            let r = context.rod.positions(configuration);
            Ok((r.get(frame, start, axis) - r.get(frame, end, axis)).abs())
        }
    }
}

/// End-to-end length of the current configuration on the first frame.
pub fn starting_length(rod: &RodTrajectory) -> f64 {
    let r = rod.current_r();
    vector::distance(&r.vec3(0, 0), &r.vec3(0, rod.num_elements() - 1))
}
