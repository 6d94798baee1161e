//! View-frustum culling.

use glam::{DMat4, DVec3};

/// A view frustum for culling chunks by their bounding spheres.
///
/// Built from a view-projection matrix by plane extraction; each plane is
/// stored as `(normal, distance)` with the normal pointing inward.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    planes: [(DVec3, f64); 6],
}

impl Frustum {
    /// Create a frustum from a view-projection matrix.
    #[must_use]
    pub fn from_matrix(vp: DMat4) -> Self {
        let m = vp.to_cols_array_2d();

        // Left, right, bottom, top, near, far planes.
        let planes = [
            Self::normalize_plane(
                m[0][3] + m[0][0],
                m[1][3] + m[1][0],
                m[2][3] + m[2][0],
                m[3][3] + m[3][0],
            ),
            Self::normalize_plane(
                m[0][3] - m[0][0],
                m[1][3] - m[1][0],
                m[2][3] - m[2][0],
                m[3][3] - m[3][0],
            ),
            Self::normalize_plane(
                m[0][3] + m[0][1],
                m[1][3] + m[1][1],
                m[2][3] + m[2][1],
                m[3][3] + m[3][1],
            ),
            Self::normalize_plane(
                m[0][3] - m[0][1],
                m[1][3] - m[1][1],
                m[2][3] - m[2][1],
                m[3][3] - m[3][1],
            ),
            Self::normalize_plane(
                m[0][3] + m[0][2],
                m[1][3] + m[1][2],
                m[2][3] + m[2][2],
                m[3][3] + m[3][2],
            ),
            Self::normalize_plane(
                m[0][3] - m[0][2],
                m[1][3] - m[1][2],
                m[2][3] - m[2][2],
                m[3][3] - m[3][2],
            ),
        ];

        Self { planes }
    }

    fn normalize_plane(a: f64, b: f64, c: f64, d: f64) -> (DVec3, f64) {
        let normal = DVec3::new(a, b, c);
        let length = normal.length();
        if length > 0.0 {
            (normal / length, d / length)
        } else {
            (DVec3::ZERO, 0.0)
        }
    }

    /// Test whether a sphere intersects the frustum.
    #[must_use]
    pub fn intersects_sphere(&self, center: DVec3, radius: f64) -> bool {
        for &(normal, distance) in &self.planes {
            // Entirely behind one plane means outside the frustum.
            if normal.dot(center) + distance < -radius {
                return false;
            }
        }
        true
    }
}
