use nalgebra::{Matrix3, Vector3};
use std::f64::consts::FRAC_PI_2;
use thiserror::Error;

const ANTIPARALLEL_EPSILON: f64 = 1e-12;
const GIMBAL_EPSILON: f64 = 1e-12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MathError {
    #[error("Division by zero: cannot normalize a zero-length vector")]
    DivisionByZero,
    #[error("Parallel transport is undefined between antiparallel tangents (a·b = {dot})")]
    AntiparallelTransport { dot: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerAngles {
    pub phi: f64,
    pub theta: f64,
    pub psi: f64,
}

#[inline]
pub fn length(v: &Vector3<f64>) -> f64 {
    v.norm()
}

#[inline]
pub fn distance(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (a - b).norm()
}

pub fn normalize(v: &Vector3<f64>) -> Result<Vector3<f64>, MathError> {
    let norm = v.norm();
    if norm == 0.0 {
        return Err(MathError::DivisionByZero);
    }
    Ok(v / norm)
}

pub fn cos_theta(a: &Vector3<f64>, b: &Vector3<f64>) -> Result<f64, MathError> {
    let denominator = a.norm() * b.norm();
    if denominator == 0.0 {
        return Err(MathError::DivisionByZero);
    }
    Ok(a.dot(b) / denominator)
}

/// Unsigned angle between two material axes that already share a basis.
pub fn twist_angle(m_i: &Vector3<f64>, m_j: &Vector3<f64>) -> Result<f64, MathError> {
    let dot = normalize(m_i)?.dot(&normalize(m_j)?);
    Ok(dot.clamp(-1.0, 1.0).acos())
}

/// Right-hand signed angle from `m1` to `m2` measured about `axis`.
///
/// Computed as `atan2((m2 × m1) · axis, m1 · m2)`; the twist energy relies on
/// exactly this sign convention.
#[inline]
pub fn signed_angle(m1: &Vector3<f64>, m2: &Vector3<f64>, axis: &Vector3<f64>) -> f64 {
    m2.cross(m1).dot(axis).atan2(m1.dot(m2))
}

/// Minimal rotation taking unit vector `a` onto unit vector `b`.
///
/// `R = I + [v]ₓ + [v]ₓ² / (1 + c)` with `v = a × b` and `c = a · b`.
///
/// # Errors
///
/// Returns [`MathError::AntiparallelTransport`] when `1 + c` vanishes.
pub fn rotation_between(a: &Vector3<f64>, b: &Vector3<f64>) -> Result<Matrix3<f64>, MathError> {
    let c = a.dot(b);
    if 1.0 + c < ANTIPARALLEL_EPSILON {
        return Err(MathError::AntiparallelTransport { dot: c });
    }
    let vx = a.cross(b).cross_matrix();
    Ok(Matrix3::identity() + vx + (vx * vx) * (1.0 / (1.0 + c)))
}

/// Transports `v` from the basis of tangent `from` into the basis of tangent `to`.
pub fn parallel_transport(
    v: &Vector3<f64>,
    from: &Vector3<f64>,
    to: &Vector3<f64>,
) -> Result<Vector3<f64>, MathError> {
    Ok(rotation_between(from, to)? * v)
}

/// Rodrigues' rotation of `v` about `axis` (normalized first) by `theta` radians.
pub fn rodrigues(v: &Vector3<f64>, axis: &Vector3<f64>, theta: f64) -> Result<Vector3<f64>, MathError> {
    let k = normalize(axis)?;
    let (sin_theta, cos_theta) = theta.sin_cos();
    Ok(v * cos_theta + k.cross(v) * sin_theta + k * k.dot(v) * (1.0 - cos_theta))
}

/// Removes the component of `m` along the tangent of `p`.
pub fn perpendicularize(m: &Vector3<f64>, p: &Vector3<f64>) -> Result<Vector3<f64>, MathError> {
    let t = normalize(p)?;
    Ok(m - t * m.dot(&t))
}

/// Rotates a material axis along with its segment moving from `p` to `p_prime`,
/// then re-orthogonalises and normalizes it against the new segment.
pub fn update_material_axis(
    m: &Vector3<f64>,
    p: &Vector3<f64>,
    p_prime: &Vector3<f64>,
) -> Result<Vector3<f64>, MathError> {
    let rotated = parallel_transport(m, &normalize(p)?, &normalize(p_prime)?)?;
    normalize(&perpendicularize(&rotated, p_prime)?)
}

#[inline]
pub fn element_midpoint(p: &Vector3<f64>, r: &Vector3<f64>) -> Vector3<f64> {
    r + p * 0.5
}

/// Extracts `(phi, theta, psi)` from a row-major flattened 3x3 rotation matrix.
///
/// At gimbal lock (`|rm[6]| == 1`) the decomposition is not unique and `phi`
/// cannot be recovered from the matrix, so the caller supplies it as
/// `reference_phi` (typically the previous frame's value).
pub fn euler_angles_from_rotation_matrix(rm: &[f64; 9], reference_phi: f64) -> EulerAngles {
    if (rm[6].abs() - 1.0).abs() > GIMBAL_EPSILON {
        let theta = -rm[6].asin();
        let cos_theta = theta.cos();
        let psi = (rm[7] / cos_theta).atan2(rm[8] / cos_theta);
        let phi = (rm[3] / cos_theta).atan2(rm[0] / cos_theta);
        return EulerAngles { phi, theta, psi };
    }

    let phi = reference_phi;
    if rm[6] < 0.0 {
        EulerAngles {
            phi,
            theta: FRAC_PI_2,
            psi: phi + rm[1].atan2(rm[2]),
        }
    } else {
        EulerAngles {
            phi,
            theta: -FRAC_PI_2,
            psi: -phi + (-rm[1]).atan2(-rm[2]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const TOLERANCE: f64 = 1e-9;

    fn vec_approx_equal(a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
        (a - b).norm() < TOLERANCE
    }

    #[test]
    fn normalize_returns_unit_vector() {
        let v = normalize(&Vector3::new(3.0, 0.0, 4.0)).unwrap();
        assert!((v.norm() - 1.0).abs() < TOLERANCE);
        assert!(vec_approx_equal(&v, &Vector3::new(0.6, 0.0, 0.8)));
    }

    #[test]
    fn normalize_zero_vector_fails_with_division_by_zero() {
        assert_eq!(normalize(&Vector3::zeros()), Err(MathError::DivisionByZero));
    }

    #[test]
    fn cos_theta_of_perpendicular_vectors_is_zero() {
        let c = cos_theta(&Vector3::x(), &Vector3::new(0.0, 2.0, 0.0)).unwrap();
        assert!(c.abs() < TOLERANCE);
    }

    #[test]
    fn signed_angle_follows_right_hand_rule_about_axis() {
        let angle = signed_angle(&Vector3::y(), &Vector3::z(), &Vector3::x());
        assert!((angle + FRAC_PI_2).abs() < TOLERANCE);
        let reversed = signed_angle(&Vector3::z(), &Vector3::y(), &Vector3::x());
        assert!((reversed - FRAC_PI_2).abs() < TOLERANCE);
    }

    #[test]
    fn parallel_transport_maps_from_tangent_onto_to_tangent() {
        let from = Vector3::x();
        let to = Vector3::y();
        let moved = parallel_transport(&from, &from, &to).unwrap();
        assert!(vec_approx_equal(&moved, &to));
    }

    #[test]
    fn parallel_transport_leaves_rotation_axis_untouched() {
        let axis = Vector3::z();
        let moved = parallel_transport(&axis, &Vector3::x(), &Vector3::y()).unwrap();
        assert!(vec_approx_equal(&moved, &axis));
    }

    #[test]
    fn parallel_transport_between_identical_tangents_is_identity() {
        let v = Vector3::new(0.3, -0.2, 0.9);
        let t = normalize(&Vector3::new(1.0, 1.0, 0.0)).unwrap();
        assert!(vec_approx_equal(&parallel_transport(&v, &t, &t).unwrap(), &v));
    }

    #[test]
    fn parallel_transport_rejects_antiparallel_tangents() {
        let result = parallel_transport(&Vector3::y(), &Vector3::x(), &-Vector3::x());
        assert!(matches!(result, Err(MathError::AntiparallelTransport { .. })));
    }

    #[test]
    fn rodrigues_half_turn_about_x_flips_y() {
        let rotated = rodrigues(&Vector3::y(), &Vector3::x(), PI).unwrap();
        assert!(vec_approx_equal(&rotated, &-Vector3::y()));
    }

    #[test]
    fn rodrigues_normalizes_axis_before_rotating() {
        let rotated = rodrigues(&Vector3::x(), &Vector3::new(0.0, 0.0, 5.0), FRAC_PI_2).unwrap();
        assert!(vec_approx_equal(&rotated, &Vector3::y()));
    }

    #[test]
    fn perpendicularize_removes_tangent_component() {
        let m = Vector3::new(1.0, 1.0, 0.0);
        let out = perpendicularize(&m, &Vector3::new(2.0, 0.0, 0.0)).unwrap();
        assert!(vec_approx_equal(&out, &Vector3::y()));
    }

    #[test]
    fn update_material_axis_follows_segment_rotation() {
        let m = Vector3::y();
        let updated = update_material_axis(&m, &Vector3::x(), &Vector3::new(0.0, 0.0, 3.0)).unwrap();
        assert!(vec_approx_equal(&updated, &Vector3::y()));
        assert!(updated.dot(&Vector3::z()).abs() < TOLERANCE);
    }

    #[test]
    fn twist_angle_is_unsigned() {
        let angle = twist_angle(&Vector3::y(), &-Vector3::z()).unwrap();
        assert!((angle - FRAC_PI_2).abs() < TOLERANCE);
    }

    #[test]
    fn euler_angles_recover_rotation_about_z() {
        let a = 0.4_f64;
        let rm = [a.cos(), -a.sin(), 0.0, a.sin(), a.cos(), 0.0, 0.0, 0.0, 1.0];
        let angles = euler_angles_from_rotation_matrix(&rm, 0.0);
        assert!((angles.phi - a).abs() < TOLERANCE);
        assert!(angles.theta.abs() < TOLERANCE);
        assert!(angles.psi.abs() < TOLERANCE);
    }

    #[test]
    fn euler_angles_at_gimbal_lock_use_reference_phi() {
        let rm = [0.0, 0.0, 1.0, 0.0, 1.0, 0.0, -1.0, 0.0, 0.0];
        let angles = euler_angles_from_rotation_matrix(&rm, 0.25);
        assert_eq!(angles.phi, 0.25);
        assert!((angles.theta - FRAC_PI_2).abs() < TOLERANCE);
        assert!((angles.psi - (0.25 + 0.0_f64.atan2(1.0))).abs() < TOLERANCE);
    }

    #[test]
    fn element_midpoint_is_half_way_along_segment() {
        let mid = element_midpoint(&Vector3::new(2.0, 0.0, 0.0), &Vector3::new(1.0, 1.0, 1.0));
        assert!(vec_approx_equal(&mid, &Vector3::new(2.0, 1.0, 1.0)));
    }
}
