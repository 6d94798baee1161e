//! Cube-sphere terrain patch geometry generation.
//!
//! This crate builds the vertex buffers for one quadtree cell ("patch") of a
//! planet's cube-sphere surface. It is deliberately pure and synchronous: a
//! [`PatchParams`] value carries everything a build needs (face, region,
//! resolution, radius, terrain profile), and [`build_patch`] returns a
//! self-contained [`PatchGeometry`]. Worker threads in the terrain core call
//! this with no shared state and no locking.
//!
//! # Design principles
//!
//! - **Self-contained jobs**: params in, buffers out, nothing else
//! - **Deterministic**: equal params yield bit-identical geometry
//! - **Precision split**: an `f64` anchor point per patch, `f32` vertex data
//!   relative to it, so planets of realistic radius don't jitter

mod builder;
mod face;
mod height;

pub use builder::build_patch;
pub use face::{Face, cube_to_sphere};
pub use height::{HeightSampler, TerrainProfile};

use glam::{DVec3, Vec3};

/// A square region of a cube face in `[-1, 1]²` face coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    /// Center of the region along the face's U tangent.
    pub center_u: f64,
    /// Center of the region along the face's V tangent.
    pub center_v: f64,
    /// Half the side length of the region.
    pub half: f64,
}

impl UvRect {
    /// The full face, `[-1, 1]²`.
    pub const FULL: Self = Self {
        center_u: 0.0,
        center_v: 0.0,
        half: 1.0,
    };
}

/// Self-contained parameters for building one patch.
///
/// This is the payload posted to a build worker; it must stay `Send` and
/// carry no references back to coordinator state.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchParams {
    /// Which cube face the patch lies on.
    pub face: Face,
    /// The patch's region of the face.
    pub rect: UvRect,
    /// Grid cells per side; the vertex grid is `(resolution + 1)²`.
    pub resolution: u32,
    /// Planet radius in meters.
    pub radius: f64,
    /// Height-field parameters.
    pub terrain: TerrainProfile,
}

/// Geometry buffers for one built patch.
///
/// Vertex positions are relative to [`center`](Self::center) so they fit in
/// `f32` without precision loss at planetary radii.
#[derive(Debug, Clone)]
pub struct PatchGeometry {
    /// World-space anchor the positions are relative to (on the displaced
    /// sphere surface at the patch center).
    pub center: DVec3,
    /// Radius of a sphere around [`center`](Self::center) containing every
    /// vertex.
    pub bounding_radius: f64,
    /// Vertex positions relative to the anchor.
    pub positions: Vec<Vec3>,
    /// Smooth per-vertex normals, unit length.
    pub normals: Vec<Vec3>,
    /// Triangle-list indices into the vertex buffers.
    pub indices: Vec<u32>,
}

impl PatchGeometry {
    /// Number of vertices in the patch.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles in the patch.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
