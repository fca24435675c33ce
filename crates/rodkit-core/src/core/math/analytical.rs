//! Closed-form reference values used to validate measured rod properties.

/// Boltzmann constant in J/K.
pub const BOLTZMANN: f64 = 1.38064852e-23;

/// Cantilever tip deflection `P L³ / (3 E I)`.
pub fn analytical_deflection(force: f64, length: f64, flexural_rigidity: f64) -> f64 {
    force * length.powi(3) / (3.0 * flexural_rigidity)
}

/// Worm-like-chain persistence length `E I / (k_B T)`.
pub fn analytical_persistence_length(flexural_rigidity: f64, temperature: f64) -> f64 {
    flexural_rigidity / (BOLTZMANN * temperature)
}

/// Equipartition energy per quadratic degree of freedom, `k_B T / 2`.
pub fn half_kbt(temperature: f64) -> f64 {
    0.5 * BOLTZMANN * temperature
}

/// Relative closeness test: `|b - a| <= tolerance * (|a| + |b|)`.
///
/// Two exact zeros compare equal.
#[inline]
pub fn approximately_equal(a: f64, b: f64, tolerance: f64) -> bool {
    (b - a).abs() <= tolerance * (a.abs() + b.abs())
}
