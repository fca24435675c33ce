use crate::core::math::rod::b_matrix_from_flat;
use crate::core::models::trajectory::RodTrajectory;
use crate::engine::error::AnalysisError;
use nalgebra::Matrix2;

/// Index of the stretch constant `k` within a node's material parameters.
pub const STRETCH_PARAMETER: usize = 0;
/// Index of the twist constant `β` within a node's material parameters.
pub const TWIST_PARAMETER: usize = 1;

/// The single bending stiffness EI of an isotropic, uniform rod.
///
/// Reads frame 0 only. Every node's B matrix must be diagonal with equal
/// diagonal entries, and equal to its neighbour's.
pub fn constant_ei(rod: &RodTrajectory) -> Result<f64, AnalysisError> {
    let b = rod.b_matrix();
    for node in 0..rod.num_elements() {
        let flat = b.node(0, node);
        if flat[1] != 0.0 || flat[2] != 0.0 {
            return Err(AnalysisError::precondition(
                "diagonal B matrix",
                format!("node {} has off-diagonal terms {:?}", node, [flat[1], flat[2]]),
            ));
        }
        if flat[0] != flat[3] {
            return Err(AnalysisError::precondition(
                "uniform B matrix",
                format!("node {} is anisotropic ({} vs {})", node, flat[0], flat[3]),
            ));
        }
        if node + 1 < rod.num_elements() && flat[3] != b.get(0, node + 1, 0) {
            return Err(AnalysisError::precondition(
                "uniform B matrix",
                format!(
                    "node {} has EI {} but node {} has {}",
                    node,
                    flat[3],
                    node + 1,
                    b.get(0, node + 1, 0)
                ),
            ));
        }
    }
    Ok(b.get(0, 0, 0))
}

/// A material parameter that is identical on every node of every frame.
pub fn constant_parameter(rod: &RodTrajectory, index: usize) -> Result<f64, AnalysisError> {
    let params = rod.material_params();
    if index >= params.width() {
        return Err(AnalysisError::precondition(
            "uniform material parameter",
            format!(
                "parameter index {} is out of range for width {}",
                index,
                params.width()
            ),
        ));
    }
    let value = params.get(0, 0, index);
    for frame in 0..rod.num_frames() {
        for node in 0..rod.num_elements() {
            let found = params.get(frame, node, index);
            if found != value {
                return Err(AnalysisError::precondition(
                    "uniform material parameter",
                    format!(
                        "parameter {} is {} at frame {} node {}, expected {}",
                        index, found, frame, node, value
                    ),
                ));
            }
        }
    }
    Ok(value)
}

/// Both eigenvalues of every node's B matrix on frame 0, largest first.
pub fn b_eigenvalues(rod: &RodTrajectory) -> Result<Vec<[f64; 2]>, AnalysisError> {
    let b = rod.b_matrix();
    (0..rod.num_elements())
        .map(|node| {
            eigenvalues_2x2(&b_matrix_from_flat(b.node(0, node))).ok_or_else(|| {
                AnalysisError::precondition(
                    "real B eigenvalues",
                    format!("B matrix of node {} has complex eigenvalues", node),
                )
            })
        })
        .collect()
}

fn eigenvalues_2x2(m: &Matrix2<f64>) -> Option<[f64; 2]> {
    let (a, b) = if m[(0, 1)] == m[(1, 0)] {
        let eigen = m.symmetric_eigen();
        (eigen.eigenvalues[0], eigen.eigenvalues[1])
    } else {
        let half_trace = m.trace() / 2.0;
        let discriminant = half_trace * half_trace - m.determinant();
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        (half_trace + root, half_trace - root)
    };
    Some(if a >= b { [a, b] } else { [b, a] })
}
