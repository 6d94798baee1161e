//! Cube faces and the cube-to-sphere mapping.

use glam::DVec3;

/// One of the six faces of the unit cube, identified by its outward normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    /// +X face.
    PosX,
    /// -X face.
    NegX,
    /// +Y face.
    PosY,
    /// -Y face.
    NegY,
    /// +Z face.
    PosZ,
    /// -Z face.
    NegZ,
}

impl Face {
    /// All six faces, in index order.
    pub const ALL: [Face; 6] = [
        Face::PosX,
        Face::NegX,
        Face::PosY,
        Face::NegY,
        Face::PosZ,
        Face::NegZ,
    ];

    /// Stable index of this face in `0..6`.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Face::PosX => 0,
            Face::NegX => 1,
            Face::PosY => 2,
            Face::NegY => 3,
            Face::PosZ => 4,
            Face::NegZ => 5,
        }
    }

    /// Outward face normal.
    #[must_use]
    pub fn normal(self) -> DVec3 {
        match self {
            Face::PosX => DVec3::X,
            Face::NegX => DVec3::NEG_X,
            Face::PosY => DVec3::Y,
            Face::NegY => DVec3::NEG_Y,
            Face::PosZ => DVec3::Z,
            Face::NegZ => DVec3::NEG_Z,
        }
    }

    /// Tangent along the face's U axis.
    ///
    /// The axes are chosen so that `tangent_u × tangent_v == normal` on
    /// every face; grid triangles wound `(origin, +u, +v)` therefore face
    /// outward.
    #[must_use]
    pub fn tangent_u(self) -> DVec3 {
        match self {
            Face::PosX => DVec3::NEG_Z,
            Face::NegX => DVec3::Z,
            Face::PosY => DVec3::X,
            Face::NegY => DVec3::X,
            Face::PosZ => DVec3::X,
            Face::NegZ => DVec3::NEG_X,
        }
    }

    /// Tangent along the face's V axis.
    #[must_use]
    pub fn tangent_v(self) -> DVec3 {
        match self {
            Face::PosX => DVec3::Y,
            Face::NegX => DVec3::Y,
            Face::PosY => DVec3::NEG_Z,
            Face::NegY => DVec3::Z,
            Face::PosZ => DVec3::Y,
            Face::NegZ => DVec3::Y,
        }
    }

    /// Point on the unit cube for face coordinates `(u, v)` in `[-1, 1]`.
    #[must_use]
    pub fn direction(self, u: f64, v: f64) -> DVec3 {
        self.normal() + self.tangent_u() * u + self.tangent_v() * v
    }
}

/// Project a point on the unit cube onto the unit sphere.
#[must_use]
pub fn cube_to_sphere(point: DVec3) -> DVec3 {
    point.normalize()
}
