//! Celestial body models.

use glam::DVec3;

use crate::orbit::{Orbit, orbital_period};
use crate::rng::{GenStep, SeedStream};
use crate::{EARTH_MASS, EARTH_RADIUS, SOLAR_MASS};

/// Mean solar radius in meters.
const SOLAR_RADIUS: f64 = 6.957e8;

/// Identifier of a body within its [`StarSystem`](crate::StarSystem) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub(crate) usize);

impl BodyId {
    /// Index of the body in the system arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// The kind of a celestial body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyKind {
    /// A star; the anchor of a system.
    Star,
    /// A rocky planet or moon with a solid terrain surface.
    Telluric,
    /// A gas giant.
    Gas,
    /// A fractal curiosity.
    Mandelbulb,
    /// A black hole.
    BlackHole,
}

/// Kind-specific physical properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Properties {
    /// Star properties.
    Star {
        /// Photosphere temperature in kelvin. Mutable post-generation for
        /// live editing; everything else is fixed until teardown.
        temperature: f64,
    },
    /// Telluric properties.
    Telluric {
        /// Surface pressure in bar.
        pressure: f64,
        /// Fraction of the surface covered by water.
        water_fraction: f64,
        /// Terrain roughness in `[0, 1]`.
        roughness: f64,
        /// Seed for the terrain height field.
        terrain_seed: u32,
    },
    /// Gas giant properties.
    Gas {
        /// Cloud-top pressure in bar.
        pressure: f64,
    },
    /// Mandelbulb properties.
    Mandelbulb {
        /// Fractal power.
        power: f64,
    },
    /// Black hole properties.
    BlackHole {
        /// Outer radius of the accretion disk in meters.
        accretion_radius: f64,
    },
}

/// One celestial body in a system arena.
///
/// The parent link is a non-owning back-reference; children are owned by
/// the arena and listed here by id. `depth` is always `parent.depth + 1`,
/// with the root star at depth 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Arena id of this body.
    pub id: BodyId,
    /// Body kind.
    pub kind: BodyKind,
    /// Seed every parameter of this body derives from.
    pub seed: u64,
    /// Distance from the system root (root = 0).
    pub depth: u32,
    /// Non-owning parent reference; `None` only for the root.
    pub parent: Option<BodyId>,
    /// Realized children, in realization order.
    pub children: Vec<BodyId>,
    /// Mean radius in meters.
    pub radius: f64,
    /// Mass in kilograms.
    pub mass: f64,
    /// Axial tilt in radians.
    pub axial_tilt: f64,
    /// Sidereal rotation period in seconds.
    pub rotation_period: f64,
    /// Whether the body carries a ring system.
    pub rings: bool,
    /// Number of moons this body will realize lazily.
    pub planned_moons: u32,
    /// Realized moons by index; `None` until first requested.
    pub(crate) moon_slots: Vec<Option<BodyId>>,
    /// Orbit around the parent.
    pub orbit: Orbit,
    /// Kind-specific properties.
    pub properties: Properties,
}

/// Placement of a body being generated: where it sits in the arena and
/// around what it orbits.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    pub id: BodyId,
    pub depth: u32,
    pub parent: Option<BodyId>,
    /// Position among the parent's orbiting children (0-based).
    pub orbit_index: u32,
    /// Parent mass in kilograms; 0 for the root slot.
    pub parent_mass: f64,
    /// Parent radius in meters; 0 for the root slot.
    pub parent_radius: f64,
    /// True when the body is a satellite of a planet rather than a planet
    /// of a star.
    pub satellite: bool,
}

/// Generate one body of the given kind from its seed.
///
/// Each kind samples a fixed sequence of named steps; the per-step keying
/// in [`SeedStream`] keeps values stable when new steps are added.
pub(crate) fn generate_body(kind: BodyKind, seed: u64, slot: Slot) -> Body {
    let stream = SeedStream::new(seed);

    let (radius, mass) = sample_bulk(kind, &stream, slot.satellite);
    let axial_tilt = stream.in_range(GenStep::AxialTilt, 0.0, 0.5);
    let rotation_period = stream.in_range(GenStep::RotationPeriod, 3_600.0 * 6.0, 3_600.0 * 96.0);
    let rings = match kind {
        BodyKind::Gas => stream.unit(GenStep::Rings) < 0.5,
        BodyKind::Telluric if !slot.satellite => stream.unit(GenStep::Rings) < 0.1,
        _ => false,
    };
    let planned_moons = match kind {
        BodyKind::Telluric if !slot.satellite => (stream.unit(GenStep::MoonCount) * 4.0) as u32,
        BodyKind::Gas => (stream.unit(GenStep::MoonCount) * 7.0) as u32,
        _ => 0,
    };

    let orbit = sample_orbit(&stream, &slot, radius);
    let properties = sample_properties(kind, &stream);

    Body {
        id: slot.id,
        kind,
        seed,
        depth: slot.depth,
        parent: slot.parent,
        children: Vec::new(),
        radius,
        mass,
        axial_tilt,
        rotation_period,
        rings,
        planned_moons,
        moon_slots: vec![None; planned_moons as usize],
        orbit,
        properties,
    }
}

fn sample_bulk(kind: BodyKind, stream: &SeedStream, satellite: bool) -> (f64, f64) {
    match kind {
        BodyKind::Star => {
            let radius = stream.in_range(GenStep::Radius, 0.4, 3.0) * SOLAR_RADIUS;
            let mass = stream.in_range(GenStep::Mass, 0.2, 8.0) * SOLAR_MASS;
            (radius, mass)
        }
        BodyKind::Telluric => {
            // Satellites draw from a narrower band than primaries.
            let radius = if satellite {
                stream.in_range(GenStep::Radius, 0.1, 0.4) * EARTH_RADIUS
            } else {
                stream.in_range(GenStep::Radius, 0.3, 1.1) * EARTH_RADIUS
            };
            let relative = radius / EARTH_RADIUS;
            (radius, EARTH_MASS * relative.powi(3))
        }
        BodyKind::Gas => {
            let radius = stream.in_range(GenStep::Radius, 3.0, 12.0) * EARTH_RADIUS;
            let relative = radius / EARTH_RADIUS;
            // Gas giants are far less dense than rock.
            (radius, EARTH_MASS * relative.powi(3) * 0.2)
        }
        BodyKind::Mandelbulb => {
            let radius = stream.in_range(GenStep::Radius, 0.5, 1.5) * EARTH_RADIUS;
            let relative = radius / EARTH_RADIUS;
            (radius, EARTH_MASS * relative.powi(3))
        }
        BodyKind::BlackHole => {
            let radius = stream.in_range(GenStep::Radius, 1.0e4, 5.0e4);
            let mass = stream.in_range(GenStep::Mass, 3.0, 30.0) * SOLAR_MASS;
            (radius, mass)
        }
    }
}

fn sample_orbit(stream: &SeedStream, slot: &Slot, body_radius: f64) -> Orbit {
    if slot.parent.is_none() {
        return Orbit::stationary();
    }

    // Successive children are spaced outward geometrically; satellites hug
    // their parent far closer than planets hug their star.
    let spacing = if slot.satellite { 4.0 } else { 24.0 };
    let base = (slot.parent_radius + body_radius) * spacing;
    let lane = f64::from(slot.orbit_index + 1);
    let radius = base * lane * stream.in_range(GenStep::OrbitRadius, 0.85, 1.25);

    // Shape exponent clamped to the range every consumer can assume.
    let p = stream.in_range(GenStep::OrbitShape, 0.5, 3.0).clamp(0.5, 3.0);

    let aligned = stream.unit(GenStep::OrbitAlignment) < 0.7;
    let tilt = if aligned {
        stream.in_range(GenStep::OrbitTilt, 0.0, 0.05)
    } else {
        stream.in_range(GenStep::OrbitTilt, 0.05, 0.5)
    };
    let azimuth = stream.in_range(GenStep::OrbitPlane, 0.0, std::f64::consts::TAU);
    let normal = DVec3::new(
        tilt.sin() * azimuth.cos(),
        tilt.cos(),
        tilt.sin() * azimuth.sin(),
    );

    Orbit {
        radius,
        p,
        period: orbital_period(radius, slot.parent_mass),
        normal,
        aligned,
    }
}

fn sample_properties(kind: BodyKind, stream: &SeedStream) -> Properties {
    match kind {
        BodyKind::Star => Properties::Star {
            temperature: stream.in_range(GenStep::Temperature, 2_500.0, 12_000.0),
        },
        BodyKind::Telluric => Properties::Telluric {
            pressure: stream.in_range(GenStep::Pressure, 0.0, 3.0),
            water_fraction: stream.unit(GenStep::WaterAmount),
            roughness: stream.unit(GenStep::Roughness),
            terrain_seed: (stream.unit(GenStep::TerrainSeed) * f64::from(u32::MAX)) as u32,
        },
        BodyKind::Gas => Properties::Gas {
            pressure: stream.in_range(GenStep::Pressure, 10.0, 1_000.0),
        },
        BodyKind::Mandelbulb => Properties::Mandelbulb {
            power: stream.in_range(GenStep::FractalPower, 4.0, 12.0),
        },
        BodyKind::BlackHole => Properties::BlackHole {
            accretion_radius: stream.in_range(GenStep::AccretionRadius, 5.0, 20.0) * 1.0e4,
        },
    }
}
