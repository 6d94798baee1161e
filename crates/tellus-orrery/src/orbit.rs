//! Lp-norm orbit computation.
//!
//! Pure and stateless; all inputs are pre-validated by the generator (the
//! shape exponent is clamped before an [`Orbit`] is ever constructed), so
//! nothing here can fail.

use glam::{DQuat, DVec3};

/// Gravitational constant in m³·kg⁻¹·s⁻².
pub const GRAVITATIONAL_CONSTANT: f64 = 6.674e-11;

/// Describes the shape and timing of one body's orbit around its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orbit {
    /// Semi-major-axis-like scalar in meters.
    pub radius: f64,
    /// Lp-norm shape exponent; `2` is a circle. Always `> 0`.
    pub p: f64,
    /// Orbital period in seconds. `0` encodes "does not orbit": the body is
    /// a stationary anchor pinned to its parent's position.
    pub period: f64,
    /// Unit normal of the orbital plane.
    pub normal: DVec3,
    /// Whether the plane was aligned with the parent's equator rather than
    /// tilted by the body's own seed.
    pub aligned: bool,
}

impl Orbit {
    /// An orbit that never moves the body away from its parent.
    #[must_use]
    pub fn stationary() -> Self {
        Self {
            radius: 0.0,
            p: 2.0,
            period: 0.0,
            normal: DVec3::Y,
            aligned: true,
        }
    }
}

/// The Lp-norm radius factor at angle `theta`.
///
/// `(|cos θ|^p + |sin θ|^p)^(-1/p)`: equal to 1 everywhere for `p = 2`,
/// bulging toward a square as `p → ∞` and pinching toward a star for
/// `p < 1`.
#[must_use]
pub fn lp_factor(theta: f64, p: f64) -> f64 {
    (theta.cos().abs().powf(p) + theta.sin().abs().powf(p)).powf(-1.0 / p)
}

/// Position on an orbit at time `t`, in the parent's frame of reference
/// translated to `parent_position`.
///
/// For `period == 0` the body never moves: the parent's position is
/// returned for all `t`.
#[must_use]
pub fn point_on_orbit(orbit: &Orbit, parent_position: DVec3, t: f64) -> DVec3 {
    if orbit.period == 0.0 {
        return parent_position;
    }

    let theta = -std::f64::consts::TAU * t / orbit.period;
    let local = DVec3::new(theta.cos(), 0.0, theta.sin()) * orbit.radius * lp_factor(theta, orbit.p);

    let rotation = DQuat::from_rotation_arc(DVec3::Y, orbit.normal);
    parent_position + rotation * local
}

/// Closest approach of an Lp orbit to its parent.
#[must_use]
pub fn periapsis(radius: f64, p: f64) -> f64 {
    radius * lp_factor(std::f64::consts::FRAC_PI_4, p)
}

/// Keplerian period for a circular orbit of the given radius around a
/// parent of the given mass. Returns `0` for a massless parent; root and
/// anchor bodies never move.
#[must_use]
pub fn orbital_period(radius: f64, parent_mass: f64) -> f64 {
    if parent_mass == 0.0 {
        return 0.0;
    }
    std::f64::consts::TAU * (radius.powi(3) / (GRAVITATIONAL_CONSTANT * parent_mass)).sqrt()
}
