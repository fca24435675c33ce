use super::vector::{self, MathError};
use nalgebra::{Matrix2, Vector2, Vector3};
use std::f64::consts::PI;

/// Inputs to the twist energy between segments `i - 1` and `i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwistInput {
    pub m_im1: Vector3<f64>,
    pub m_im1_equil: Vector3<f64>,
    pub m_i: Vector3<f64>,
    pub m_i_equil: Vector3<f64>,
    pub p_im1: Vector3<f64>,
    pub p_im1_equil: Vector3<f64>,
    pub p_i: Vector3<f64>,
    pub p_i_equil: Vector3<f64>,
    pub beta: f64,
}

/// Inputs to the mutual-parallel-transport bend energy at the node shared by
/// segments `i - 1` and `i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BendInput {
    pub p_im1: Vector3<f64>,
    pub p_i: Vector3<f64>,
    pub p_im1_equil: Vector3<f64>,
    pub p_i_equil: Vector3<f64>,
    pub m_im1: Vector3<f64>,
    pub m_i: Vector3<f64>,
    pub m_im1_equil: Vector3<f64>,
    pub m_i_equil: Vector3<f64>,
    pub b: Matrix2<f64>,
    /// Extra rotation (radians) applied to the current mutual material axis
    /// about the mutual tangent before evaluation.
    pub rotate: Option<f64>,
}

/// The three elastic energy formulas shared by every math backend.
///
/// Implementations must agree with each other to within floating-point
/// tolerance; the analysis engine selects one at construction time.
pub trait RodMath: Send + Sync {
    fn name(&self) -> &'static str;

    fn stretch_energy(
        &self,
        k: f64,
        p_i: &Vector3<f64>,
        p_i_equil: &Vector3<f64>,
    ) -> Result<f64, MathError>;

    fn twist_energy(&self, input: &TwistInput) -> Result<f64, MathError>;

    fn bend_energy(&self, input: &BendInput) -> Result<f64, MathError>;
}

/// Wraps an angle difference into `[-π, π)` before it is squared.
#[inline]
pub fn wrap_angle(delta: f64) -> f64 {
    (delta + PI).rem_euclid(2.0 * PI) - PI
}

/// Discrete curvature binormal between segments `p_im1` and `p_i`.
///
/// `kb = 2 (p_{i-1} × p_i) / (|p_i| |p_{i-1}| + p_i · p_{i-1})`
pub fn kb(p_i: &Vector3<f64>, p_im1: &Vector3<f64>) -> Result<Vector3<f64>, MathError> {
    let denominator = p_i.norm() * p_im1.norm() + p_i.dot(p_im1);
    if denominator == 0.0 {
        return Err(MathError::DivisionByZero);
    }
    Ok((p_im1 * 2.0).cross(p_i) / denominator)
}

/// Bend generalized coordinate `(kb · n, -kb · m)` for a node frame `{n, m}`.
pub fn omega(
    p_i: &Vector3<f64>,
    p_im1: &Vector3<f64>,
    n: &Vector3<f64>,
    m: &Vector3<f64>,
) -> Result<Vector2<f64>, MathError> {
    let kb = kb(p_i, p_im1)?;
    Ok(Vector2::new(kb.dot(n), -kb.dot(m)))
}

/// `Δωᵀ · B · Δω`
#[inline]
pub fn bend_quadratic(delta_omega: &Vector2<f64>, b: &Matrix2<f64>) -> f64 {
    delta_omega.dot(&(b * delta_omega))
}

/// Builds the 2x2 bending modulus from its row-major flattened form.
#[inline]
pub fn b_matrix_from_flat(flat: &[f64]) -> Matrix2<f64> {
    Matrix2::new(flat[0], flat[1], flat[2], flat[3])
}

/// Twist energy from already-measured twist angles.
///
/// `β / (2 L_i) · wrap(Δθ - Δθ̃)²`
#[inline]
pub fn twist_energy_from_angles(beta: f64, l_i: f64, delta_theta: f64, delta_theta_equil: f64) -> f64 {
    beta / (2.0 * l_i) * wrap_angle(delta_theta - delta_theta_equil).powi(2)
}

/// Signed twist between two adjacent material axes, measured after transporting
/// the `i - 1` axis into the frame of segment `i`.
pub fn twist_delta(
    m_im1: &Vector3<f64>,
    m_i: &Vector3<f64>,
    p_im1: &Vector3<f64>,
    p_i: &Vector3<f64>,
) -> Result<f64, MathError> {
    let t_i = vector::normalize(p_i)?;
    let transported =
        vector::parallel_transport(&vector::normalize(m_im1)?, &vector::normalize(p_im1)?, &t_i)?;
    Ok(vector::signed_angle(&transported, &vector::normalize(m_i)?, &t_i))
}

/// Length weight of the first segment, `|a| / (|a| + |b|)`.
pub fn segment_weight(a: &Vector3<f64>, b: &Vector3<f64>) -> Result<f64, MathError> {
    let total = a.norm() + b.norm();
    if total == 0.0 {
        return Err(MathError::DivisionByZero);
    }
    Ok(a.norm() / total)
}

/// Material frame shared by two adjacent segments: the mutual tangent and the
/// mutual material axis obtained by transporting both axes onto it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutualFrame {
    pub tangent: Vector3<f64>,
    pub axis: Vector3<f64>,
}

impl MutualFrame {
    pub fn build(
        p_im1: &Vector3<f64>,
        p_i: &Vector3<f64>,
        m_im1: &Vector3<f64>,
        m_i: &Vector3<f64>,
    ) -> Result<Self, MathError> {
        let weight = segment_weight(p_im1, p_i)?;
        let t_im1 = vector::normalize(p_im1)?;
        let t_i = vector::normalize(p_i)?;
        let tangent = vector::normalize(&(t_im1 / weight + t_i / (1.0 - weight)))?;

        let m_i_mutual = vector::parallel_transport(&vector::normalize(m_i)?, &t_i, &tangent)?;
        let m_im1_mutual = vector::parallel_transport(&vector::normalize(m_im1)?, &t_im1, &tangent)?;

        let combined = (m_im1_mutual / weight + m_i_mutual / (1.0 - weight))
            / (m_i_mutual.norm() + m_im1_mutual.norm());
        Ok(Self {
            tangent,
            axis: vector::normalize(&combined)?,
        })
    }

    pub fn rotated(self, angle: f64) -> Result<Self, MathError> {
        Ok(Self {
            tangent: self.tangent,
            axis: vector::rodrigues(&self.axis, &self.tangent, angle)?,
        })
    }

    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        self.axis.cross(&self.tangent)
    }
}

/// Double-precision implementation of the energy formulas.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceRodMath;

impl RodMath for ReferenceRodMath {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn stretch_energy(
        &self,
        k: f64,
        p_i: &Vector3<f64>,
        p_i_equil: &Vector3<f64>,
    ) -> Result<f64, MathError> {
        let equil_length = p_i_equil.norm();
        if equil_length == 0.0 {
            return Err(MathError::DivisionByZero);
        }
        let diff = p_i.norm() - equil_length;
        Ok(0.5 * k * diff * diff / equil_length)
    }

    fn twist_energy(&self, input: &TwistInput) -> Result<f64, MathError> {
        let delta_theta = twist_delta(&input.m_im1, &input.m_i, &input.p_im1, &input.p_i)?;
        let delta_theta_equil = twist_delta(
            &input.m_im1_equil,
            &input.m_i_equil,
            &input.p_im1_equil,
            &input.p_i_equil,
        )?;
        let l_i = (input.p_im1_equil.norm() + input.p_i_equil.norm()) / 2.0;
        if l_i == 0.0 {
            return Err(MathError::DivisionByZero);
        }
        Ok(twist_energy_from_angles(input.beta, l_i, delta_theta, delta_theta_equil))
    }

    fn bend_energy(&self, input: &BendInput) -> Result<f64, MathError> {
        let mut frame = MutualFrame::build(&input.p_im1, &input.p_i, &input.m_im1, &input.m_i)?;
        if let Some(angle) = input.rotate {
            frame = frame.rotated(angle)?;
        }
        let omega_current = omega(&input.p_i, &input.p_im1, &frame.normal(), &frame.axis)?;

        let equil_frame = MutualFrame::build(
            &input.p_im1_equil,
            &input.p_i_equil,
            &input.m_im1_equil,
            &input.m_i_equil,
        )?;
        let omega_equil = omega(
            &input.p_i_equil,
            &input.p_im1_equil,
            &equil_frame.normal(),
            &equil_frame.axis,
        )?;

        let l_i = (input.p_i_equil.norm() + input.p_im1_equil.norm()) / 2.0;
        if l_i == 0.0 {
            return Err(MathError::DivisionByZero);
        }
        Ok(0.5 * bend_quadratic(&(omega_current - omega_equil), &input.b) / l_i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn straight_twist_input(beta: f64, twist: f64) -> TwistInput {
        let m_i = Vector3::new(0.0, twist.cos(), twist.sin());
        TwistInput {
            m_im1: Vector3::y(),
            m_im1_equil: Vector3::y(),
            m_i,
            m_i_equil: Vector3::y(),
            p_im1: Vector3::x(),
            p_im1_equil: Vector3::x(),
            p_i: Vector3::x(),
            p_i_equil: Vector3::x(),
            beta,
        }
    }

    fn bent_input(angle: f64) -> BendInput {
        BendInput {
            p_im1: Vector3::x(),
            p_i: Vector3::new(angle.cos(), angle.sin(), 0.0),
            p_im1_equil: Vector3::x(),
            p_i_equil: Vector3::x(),
            m_im1: Vector3::z(),
            m_i: Vector3::z(),
            m_im1_equil: Vector3::z(),
            m_i_equil: Vector3::z(),
            b: Matrix2::new(2.0, 0.0, 0.0, 2.0),
            rotate: None,
        }
    }

    #[test]
    fn stretch_energy_matches_hookean_normalized_form() {
        let energy = ReferenceRodMath
            .stretch_energy(2.0, &Vector3::new(1.1, 0.0, 0.0), &Vector3::new(1.0, 0.0, 0.0))
            .unwrap();
        assert!((energy - 0.01).abs() < TOLERANCE);
    }

    #[test]
    fn stretch_energy_with_zero_equilibrium_length_fails() {
        let result = ReferenceRodMath.stretch_energy(1.0, &Vector3::x(), &Vector3::zeros());
        assert_eq!(result, Err(MathError::DivisionByZero));
    }

    #[test]
    fn kb_of_collinear_segments_is_zero() {
        let kb = kb(&Vector3::new(2.0, 0.0, 0.0), &Vector3::x()).unwrap();
        assert!(kb.norm() < TOLERANCE);
    }

    #[test]
    fn kb_magnitude_is_twice_tangent_of_half_angle() {
        let angle = 0.6_f64;
        let p_i = Vector3::new(angle.cos(), angle.sin(), 0.0);
        let kb = kb(&p_i, &Vector3::x()).unwrap();
        assert!((kb.norm() - 2.0 * (angle / 2.0).tan()).abs() < TOLERANCE);
        assert!(kb.z > 0.0);
    }

    #[test]
    fn omega_projects_kb_onto_normal_and_material_axis() {
        let angle = 0.3_f64;
        let p_i = Vector3::new(angle.cos(), angle.sin(), 0.0);
        let w = omega(&p_i, &Vector3::x(), &Vector3::z(), &Vector3::y()).unwrap();
        let expected = 2.0 * (angle / 2.0).tan();
        assert!((w.x - expected).abs() < TOLERANCE);
        assert!(w.y.abs() < TOLERANCE);
    }

    #[test]
    fn wrap_angle_maps_into_principal_interval() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < TOLERANCE);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < TOLERANCE);
        assert!((wrap_angle(0.25) - 0.25).abs() < TOLERANCE);
    }

    #[test]
    fn twist_energy_is_invariant_under_full_turns() {
        let base = twist_energy_from_angles(3.0, 1.0, 0.7, 0.1);
        for k in -3..=3 {
            let shifted = twist_energy_from_angles(3.0, 1.0, 0.7 + 2.0 * PI * k as f64, 0.1);
            assert!((shifted - base).abs() < 1e-9, "k = {k}");
        }
    }

    #[test]
    fn twist_energy_across_pi_boundary_uses_short_way_round() {
        let energy = twist_energy_from_angles(2.0, 1.0, PI - 0.05, -PI + 0.05);
        assert!((energy - 0.1_f64.powi(2)).abs() < 1e-9);
    }

    #[test]
    fn twist_energy_of_uniformly_twisted_pair() {
        let twist = 0.2;
        let energy = ReferenceRodMath.twist_energy(&straight_twist_input(4.0, twist)).unwrap();
        assert!((energy - 4.0 / 2.0 * twist * twist).abs() < TOLERANCE);
    }

    #[test]
    fn twist_energy_is_zero_at_equilibrium() {
        let energy = ReferenceRodMath.twist_energy(&straight_twist_input(4.0, 0.0)).unwrap();
        assert!(energy.abs() < TOLERANCE);
    }

    #[test]
    fn bend_energy_is_zero_at_equilibrium_and_positive_when_bent() {
        let rest = ReferenceRodMath.bend_energy(&bent_input(0.0)).unwrap();
        assert!(rest.abs() < TOLERANCE);
        let bent = ReferenceRodMath.bend_energy(&bent_input(0.4)).unwrap();
        assert!(bent > 0.0);
    }

    #[test]
    fn bend_energy_of_in_plane_bend_matches_closed_form() {
        let angle = 0.4_f64;
        let energy = ReferenceRodMath.bend_energy(&bent_input(angle)).unwrap();
        let curvature = 2.0 * (angle / 2.0).tan();
        assert!((energy - 0.5 * 2.0 * curvature * curvature / 1.0).abs() < 1e-9);
    }

    #[test]
    fn mutual_frame_of_straight_rod_keeps_axis() {
        let frame = MutualFrame::build(&Vector3::x(), &Vector3::x(), &Vector3::y(), &Vector3::y()).unwrap();
        assert!((frame.tangent - Vector3::x()).norm() < TOLERANCE);
        assert!((frame.axis - Vector3::y()).norm() < TOLERANCE);
        assert!((frame.normal() - -Vector3::z()).norm() < TOLERANCE);
    }

    #[test]
    fn isotropic_bend_energy_is_unchanged_by_mutual_frame_rotation() {
        let mut input = bent_input(0.4);
        let plain = ReferenceRodMath.bend_energy(&input).unwrap();
        input.rotate = Some(0.7);
        let rotated = ReferenceRodMath.bend_energy(&input).unwrap();
        assert!((plain - rotated).abs() < 1e-9);
    }
}
