//! Terrain LOD settings.

use crate::error::{Error, Result};
use crate::path::PatchPath;

/// Tunables for one planet surface's LOD behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSettings {
    /// Grid cells per patch side.
    pub resolution: u32,
    /// Maximum quadtree depth; bounds total chunk count near the surface.
    pub max_depth: u32,
    /// A leaf splits when the observer is closer than
    /// `side_length · split_factor`.
    pub split_factor: f64,
    /// A branch merges when the observer is farther than
    /// `side_length · merge_factor`. Must exceed `split_factor` strictly,
    /// so a chunk hovering at one threshold cannot thrash.
    pub merge_factor: f64,
    /// Chunks at this depth and beyond get a collision shape. Fine chunks
    /// are numerous; keeping collision off the coarse levels bounds its
    /// cost.
    pub collision_depth: u32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            resolution: 32,
            max_depth: 12,
            split_factor: 1.5,
            merge_factor: 2.0,
            collision_depth: 8,
        }
    }
}

impl TerrainSettings {
    /// Validate the settings, returning them unchanged when sound.
    pub fn validated(self) -> Result<Self> {
        if self.resolution < 2 {
            return Err(Error::InvalidSettings {
                field: "resolution",
                detail: format!("must be at least 2, got {}", self.resolution),
            });
        }
        if self.max_depth == 0 || self.max_depth > PatchPath::MAX_DEPTH {
            return Err(Error::InvalidSettings {
                field: "max_depth",
                detail: format!(
                    "must be in 1..={}, got {}",
                    PatchPath::MAX_DEPTH,
                    self.max_depth
                ),
            });
        }
        if self.split_factor <= 0.0 {
            return Err(Error::InvalidSettings {
                field: "split_factor",
                detail: format!("must be positive, got {}", self.split_factor),
            });
        }
        if self.merge_factor <= self.split_factor {
            return Err(Error::InvalidSettings {
                field: "merge_factor",
                detail: format!(
                    "must exceed split_factor {} for hysteresis, got {}",
                    self.split_factor, self.merge_factor
                ),
            });
        }
        Ok(self)
    }
}
