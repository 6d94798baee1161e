//! Seeded deterministic star-system generation and orbit math.
//!
//! A whole system derives from one integer seed: star, planets, rings, moons
//! and every orbit. Re-deriving the same seed always yields bit-identical
//! parameters, and moons are realized lazily: the n-th moon of a planet is
//! the same body whether or not any other moon was generated first.
//!
//! Orbits use a generalized Lp-norm shape: `p = 2` is a circle, large `p`
//! tends toward a square, `p < 1` toward a star shape.
//!
//! # Example
//!
//! ```
//! use tellus_orrery::StarSystem;
//!
//! let system = StarSystem::generate(42);
//! let planet = system.planets()[0];
//! let position = system.body_position(planet, 3600.0);
//! assert_eq!(position, system.body_position(planet, 3600.0));
//! ```

mod body;
mod orbit;
mod rng;
mod system;

pub use body::{Body, BodyId, BodyKind, Properties};
pub use orbit::{GRAVITATIONAL_CONSTANT, Orbit, lp_factor, orbital_period, periapsis, point_on_orbit};
pub use rng::{GenStep, SeedStream};
pub use system::StarSystem;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Earth mass in kilograms.
pub const EARTH_MASS: f64 = 5.972e24;

/// Solar mass in kilograms.
pub const SOLAR_MASS: f64 = 1.989e30;
