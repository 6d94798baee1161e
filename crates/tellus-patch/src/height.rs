//! Seeded height-field sampling.

use glam::DVec3;
use noise::{NoiseFn, Perlin};

/// Fractional-Brownian-motion height-field parameters.
///
/// Two equal profiles sample bit-identical heights; the permutation table
/// behind the noise is derived from `seed` alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainProfile {
    /// Seed for the noise permutation.
    pub seed: u32,
    /// Peak-to-mean height in meters. Zero disables displacement entirely.
    pub amplitude: f64,
    /// Base spatial frequency, in cycles per planet radius.
    pub frequency: f64,
    /// Number of octaves summed.
    pub octaves: u32,
    /// Amplitude falloff per octave.
    pub persistence: f64,
    /// Frequency gain per octave.
    pub lacunarity: f64,
}

impl Default for TerrainProfile {
    fn default() -> Self {
        Self {
            seed: 0,
            amplitude: 10_000.0,
            frequency: 2.0,
            octaves: 6,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

impl TerrainProfile {
    /// Create the sampler for this profile.
    ///
    /// Building the sampler initializes the noise permutation once; reuse it
    /// for every vertex of a patch.
    #[must_use]
    pub fn sampler(&self) -> HeightSampler {
        HeightSampler {
            perlin: Perlin::new(self.seed),
            profile: *self,
        }
    }
}

/// A ready-to-sample height field for one [`TerrainProfile`].
#[derive(Debug, Clone)]
pub struct HeightSampler {
    perlin: Perlin,
    profile: TerrainProfile,
}

impl HeightSampler {
    /// Height in meters above the reference sphere, sampled along a unit
    /// direction from the planet center.
    #[must_use]
    pub fn sample(&self, direction: DVec3) -> f64 {
        if self.profile.amplitude == 0.0 || self.profile.octaves == 0 {
            return 0.0;
        }

        let mut frequency = self.profile.frequency;
        let mut amplitude = 1.0;
        let mut sum = 0.0;
        let mut weight = 0.0;

        for _ in 0..self.profile.octaves {
            let p = direction * frequency;
            sum += amplitude * self.perlin.get([p.x, p.y, p.z]);
            weight += amplitude;
            amplitude *= self.profile.persistence;
            frequency *= self.profile.lacunarity;
        }

        self.profile.amplitude * sum / weight
    }
}
