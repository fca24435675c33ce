//! Single-precision energy kernels working on flat `[f32; 3]` arrays.
//!
//! These mirror the simulation engine's own kernels: no matrix types, no heap
//! allocation, inputs narrowed to `f32` once on entry and the result widened on
//! exit. Results agree with [`ReferenceRodMath`](super::rod::ReferenceRodMath)
//! to single-precision tolerance.

use super::rod::{BendInput, RodMath, TwistInput};
use super::vector::MathError;
use nalgebra::Vector3;
use std::f32::consts::PI;

type V3 = [f32; 3];

const ANTIPARALLEL_EPSILON: f32 = 1e-6;

#[inline]
fn narrow(v: &Vector3<f64>) -> V3 {
    [v.x as f32, v.y as f32, v.z as f32]
}

#[inline]
fn dot(a: &V3, b: &V3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn cross(a: &V3, b: &V3) -> V3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
fn absolute(v: &V3) -> f32 {
    dot(v, v).sqrt()
}

#[inline]
fn scale(v: &V3, s: f32) -> V3 {
    [v[0] * s, v[1] * s, v[2] * s]
}

#[inline]
fn add(a: &V3, b: &V3) -> V3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn normalize(v: &V3) -> Result<V3, MathError> {
    let norm = absolute(v);
    if norm == 0.0 {
        return Err(MathError::DivisionByZero);
    }
    Ok(scale(v, 1.0 / norm))
}

// Row-major 3x3 rotation taking unit `a` onto unit `b`.
fn rotation_matrix(a: &V3, b: &V3) -> Result<[f32; 9], MathError> {
    let c = dot(a, b);
    if 1.0 + c < ANTIPARALLEL_EPSILON {
        return Err(MathError::AntiparallelTransport { dot: c as f64 });
    }
    let v = cross(a, b);
    let vx = [0.0, -v[2], v[1], v[2], 0.0, -v[0], -v[1], v[0], 0.0];
    let vx_squared = [
        -(v[1] * v[1]) - (v[2] * v[2]),
        v[0] * v[1],
        v[0] * v[2],
        v[0] * v[1],
        -(v[0] * v[0]) - (v[2] * v[2]),
        v[1] * v[2],
        v[0] * v[2],
        v[1] * v[2],
        -(v[0] * v[0]) - (v[1] * v[1]),
    ];
    let factor = 1.0 / (1.0 + c);
    let identity = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
    let mut rm = [0.0; 9];
    for i in 0..9 {
        rm[i] = identity[i] + vx[i] + vx_squared[i] * factor;
    }
    Ok(rm)
}

#[inline]
fn apply_rotation_matrix(v: &V3, rm: &[f32; 9]) -> V3 {
    [
        v[0] * rm[0] + v[1] * rm[1] + v[2] * rm[2],
        v[0] * rm[3] + v[1] * rm[4] + v[2] * rm[5],
        v[0] * rm[6] + v[1] * rm[7] + v[2] * rm[8],
    ]
}

fn parallel_transport(m: &V3, from: &V3, to: &V3) -> Result<V3, MathError> {
    Ok(apply_rotation_matrix(m, &rotation_matrix(from, to)?))
}

fn rodrigues(v: &V3, k: &V3, theta: f32) -> Result<V3, MathError> {
    let k = normalize(k)?;
    let (sin_theta, cos_theta) = theta.sin_cos();
    let k_cross_v = cross(&k, v);
    let right = (1.0 - cos_theta) * dot(&k, v);
    Ok([
        cos_theta * v[0] + sin_theta * k_cross_v[0] + right * k[0],
        cos_theta * v[1] + sin_theta * k_cross_v[1] + right * k[1],
        cos_theta * v[2] + sin_theta * k_cross_v[2] + right * k[2],
    ])
}

#[inline]
fn signed_angle(m1: &V3, m2: &V3, l: &V3) -> f32 {
    dot(&cross(m2, m1), l).atan2(dot(m1, m2))
}

fn l_i(a: &V3, b: &V3) -> Result<f32, MathError> {
    let l = (absolute(a) + absolute(b)) / 2.0;
    if l == 0.0 {
        return Err(MathError::DivisionByZero);
    }
    Ok(l)
}

fn kb_i(p_im1: &V3, p_i: &V3) -> Result<V3, MathError> {
    let top = cross(&add(p_im1, p_im1), p_i);
    let bottom = absolute(p_im1) * absolute(p_i) + dot(p_im1, p_i);
    if bottom == 0.0 {
        return Err(MathError::DivisionByZero);
    }
    Ok(scale(&top, 1.0 / bottom))
}

#[inline]
fn omega_j_i(kb: &V3, n: &V3, m: &V3) -> [f32; 2] {
    [dot(kb, n), -dot(kb, m)]
}

fn twist_delta(m_im1: &V3, m_i: &V3, p_im1: &V3, p_i: &V3) -> Result<f32, MathError> {
    let p_i_norm = normalize(p_i)?;
    let m_prime = normalize(&parallel_transport(&normalize(m_im1)?, &normalize(p_im1)?, &p_i_norm)?)?;
    Ok(signed_angle(&m_prime, &normalize(m_i)?, &p_i_norm))
}

fn mutual_frame(p_im1: &V3, p_i: &V3, m_im1: &V3, m_i: &V3) -> Result<(V3, V3), MathError> {
    let weight = absolute(p_im1) / (absolute(p_im1) + absolute(p_i));
    let p_im1_norm = normalize(p_im1)?;
    let p_i_norm = normalize(p_i)?;
    let mutual_l = normalize(&add(
        &scale(&p_im1_norm, 1.0 / weight),
        &scale(&p_i_norm, 1.0 / (1.0 - weight)),
    ))?;

    let m_im1_transported = parallel_transport(&normalize(m_im1)?, &p_im1_norm, &mutual_l)?;
    let m_i_transported = parallel_transport(&normalize(m_i)?, &p_i_norm, &mutual_l)?;
    let total = absolute(&m_i_transported) + absolute(&m_im1_transported);
    let m_mutual = normalize(&scale(
        &add(
            &scale(&m_im1_transported, 1.0 / weight),
            &scale(&m_i_transported, 1.0 / (1.0 - weight)),
        ),
        1.0 / total,
    ))?;
    Ok((mutual_l, m_mutual))
}

/// Accelerated single-precision backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct FastRodMath;

impl RodMath for FastRodMath {
    fn name(&self) -> &'static str {
        "fast"
    }

    fn stretch_energy(
        &self,
        k: f64,
        p_i: &Vector3<f64>,
        p_i_equil: &Vector3<f64>,
    ) -> Result<f64, MathError> {
        let p_i = narrow(p_i);
        let p_i_equil = narrow(p_i_equil);
        let equil_length = absolute(&p_i_equil);
        if equil_length == 0.0 {
            return Err(MathError::DivisionByZero);
        }
        let diff = absolute(&p_i) - equil_length;
        Ok(((diff * diff * 0.5 * k as f32) / equil_length) as f64)
    }

    fn twist_energy(&self, input: &TwistInput) -> Result<f64, MathError> {
        let p_im1 = narrow(&input.p_im1);
        let p_i = narrow(&input.p_i);
        let p_im1_equil = narrow(&input.p_im1_equil);
        let p_i_equil = narrow(&input.p_i_equil);

        let l_i = l_i(&p_im1_equil, &p_i_equil)?;
        let delta_theta = twist_delta(&narrow(&input.m_im1), &narrow(&input.m_i), &p_im1, &p_i)?;
        let delta_theta_equil = twist_delta(
            &narrow(&input.m_im1_equil),
            &narrow(&input.m_i_equil),
            &p_im1_equil,
            &p_i_equil,
        )?;

        let wrapped = (delta_theta - delta_theta_equil + PI).rem_euclid(2.0 * PI) - PI;
        Ok((input.beta as f32 / (l_i * 2.0) * wrapped * wrapped) as f64)
    }

    fn bend_energy(&self, input: &BendInput) -> Result<f64, MathError> {
        let p_im1 = narrow(&input.p_im1);
        let p_i = narrow(&input.p_i);
        let p_im1_equil = narrow(&input.p_im1_equil);
        let p_i_equil = narrow(&input.p_i_equil);
        let b = [
            input.b[(0, 0)] as f32,
            input.b[(0, 1)] as f32,
            input.b[(1, 0)] as f32,
            input.b[(1, 1)] as f32,
        ];

        let kb = kb_i(&p_im1, &p_i)?;
        let kb_equil = kb_i(&p_im1_equil, &p_i_equil)?;

        let (mutual_l, mut m_mutual) =
            mutual_frame(&p_im1, &p_i, &narrow(&input.m_im1), &narrow(&input.m_i))?;
        if let Some(angle) = input.rotate {
            m_mutual = rodrigues(&m_mutual, &mutual_l, angle as f32)?;
        }
        let (equil_mutual_l, m_mutual_equil) = mutual_frame(
            &p_im1_equil,
            &p_i_equil,
            &narrow(&input.m_im1_equil),
            &narrow(&input.m_i_equil),
        )?;

        let n_mutual = cross(&m_mutual, &mutual_l);
        let n_mutual_equil = cross(&m_mutual_equil, &equil_mutual_l);

        let omega = omega_j_i(&kb, &n_mutual, &m_mutual);
        let omega_equil = omega_j_i(&kb_equil, &n_mutual_equil, &m_mutual_equil);
        let d = [omega[0] - omega_equil[0], omega[1] - omega_equil[1]];
        let quadratic = d[0] * (d[0] * b[0] + d[1] * b[2]) + d[1] * (d[0] * b[1] + d[1] * b[3]);

        Ok((quadratic * (0.5 / l_i(&p_i_equil, &p_im1_equil)?)) as f64)
    }
}
