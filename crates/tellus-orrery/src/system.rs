//! Star-system arena and generation.

use glam::DVec3;

use crate::body::{Body, BodyId, BodyKind, Properties, Slot, generate_body};
use crate::orbit::point_on_orbit;
use crate::rng::{GenStep, SeedStream};

/// A procedurally generated star system.
///
/// Bodies live in an arena; ids are stable for the life of the system.
/// The root star and its planets are generated eagerly from the system
/// seed, moons lazily on first request. The whole system tears down at
/// once; individual bodies are never destroyed.
#[derive(Debug, Clone)]
pub struct StarSystem {
    seed: u64,
    bodies: Vec<Body>,
}

impl StarSystem {
    /// Generate the system for a seed: one root star plus its planets.
    #[must_use]
    pub fn generate(seed: u64) -> Self {
        let stream = SeedStream::new(seed);

        let mut system = Self {
            seed,
            bodies: Vec::new(),
        };

        let root = system.insert(BodyKind::Star, seed, None, 0, false);

        let planet_count = 1 + (stream.unit(GenStep::PlanetCount) * 7.0) as u32;
        for index in 0..planet_count {
            let kind = planet_kind(stream.unit_indexed(GenStep::PlanetKind, index));
            system.insert(kind, stream.planet_seed(index), Some(root), index, false);
        }

        debug_assert!(system.bodies.len() >= 2);
        system
    }

    /// The seed the system derives from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Id of the root star.
    #[must_use]
    pub fn root(&self) -> BodyId {
        BodyId(0)
    }

    /// Ids of the root star's planets.
    #[must_use]
    pub fn planets(&self) -> &[BodyId] {
        &self.bodies[0].children
    }

    /// Number of realized bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the system holds no bodies (never true after generation).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Borrow a body.
    #[must_use]
    pub fn body(&self, id: BodyId) -> &Body {
        &self.bodies[id.0]
    }

    /// Iterate over every realized body.
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter()
    }

    /// Realize the `index`-th moon of a body.
    ///
    /// Deterministic and order-independent: the n-th moon is the same body
    /// whether or not any other moon was generated first, across runs.
    /// Returns the already-realized id on repeat calls.
    ///
    /// # Panics
    ///
    /// Requesting an index at or beyond the body's planned moon count is a
    /// caller bug and panics.
    pub fn nth_moon(&mut self, parent: BodyId, index: u32) -> BodyId {
        let body = &self.bodies[parent.0];
        assert!(
            index < body.planned_moons,
            "moon index {index} out of planned range {} for body {parent:?}",
            body.planned_moons
        );

        if let Some(existing) = body.moon_slots[index as usize] {
            return existing;
        }

        let seed = SeedStream::new(body.seed).moon_seed(index);
        let id = self.insert(BodyKind::Telluric, seed, Some(parent), index, true);
        self.bodies[parent.0].moon_slots[index as usize] = Some(id);
        id
    }

    /// Absolute position of a body at time `t`, walking the parent chain.
    /// The root star sits at the origin.
    #[must_use]
    pub fn body_position(&self, id: BodyId, t: f64) -> DVec3 {
        let body = &self.bodies[id.0];
        match body.parent {
            None => DVec3::ZERO,
            Some(parent) => point_on_orbit(&body.orbit, self.body_position(parent, t), t),
        }
    }

    /// Live-edit a star's photosphere temperature.
    ///
    /// # Panics
    ///
    /// Panics when `id` is not a star; only star temperature is exposed
    /// for live editing.
    pub fn set_star_temperature(&mut self, id: BodyId, kelvin: f64) {
        match &mut self.bodies[id.0].properties {
            Properties::Star { temperature } => *temperature = kelvin,
            other => panic!("cannot set temperature of non-star body: {other:?}"),
        }
    }

    fn insert(
        &mut self,
        kind: BodyKind,
        seed: u64,
        parent: Option<BodyId>,
        orbit_index: u32,
        satellite: bool,
    ) -> BodyId {
        let id = BodyId(self.bodies.len());
        let (depth, parent_mass, parent_radius) = match parent {
            None => (0, 0.0, 0.0),
            Some(p) => {
                let parent_body = &self.bodies[p.0];
                (parent_body.depth + 1, parent_body.mass, parent_body.radius)
            }
        };

        let body = generate_body(
            kind,
            seed,
            Slot {
                id,
                depth,
                parent,
                orbit_index,
                parent_mass,
                parent_radius,
                satellite,
            },
        );
        self.bodies.push(body);

        if let Some(p) = parent {
            self.bodies[p.0].children.push(id);
        }
        id
    }
}

/// Map a uniform sample to a planet kind.
fn planet_kind(sample: f64) -> BodyKind {
    if sample < 0.55 {
        BodyKind::Telluric
    } else if sample < 0.90 {
        BodyKind::Gas
    } else if sample < 0.95 {
        BodyKind::Mandelbulb
    } else {
        BodyKind::BlackHole
    }
}
