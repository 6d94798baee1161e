//! Patch mesh construction.

use glam::{DVec3, Vec3};

use crate::face::cube_to_sphere;
use crate::{PatchGeometry, PatchParams};

/// Build the geometry for one patch.
///
/// The vertex grid is `(resolution + 1)²` points over the patch's uv rect,
/// each mapped uv → cube face → unit sphere → displaced by the terrain
/// height, then recentered about the patch's anchor point. Normals are
/// accumulated from triangle faces and normalized, so neighboring triangles
/// shade smoothly.
///
/// Deterministic: equal params produce bit-identical buffers.
#[must_use]
pub fn build_patch(params: &PatchParams) -> PatchGeometry {
    let res = params.resolution as usize;
    let side = res + 1;
    let sampler = params.terrain.sampler();

    let center_dir = cube_to_sphere(params.face.direction(params.rect.center_u, params.rect.center_v));
    let center = center_dir * (params.radius + sampler.sample(center_dir));

    // Absolute positions first, in f64; recentered to f32 afterwards.
    let mut absolute = Vec::with_capacity(side * side);
    for iv in 0..side {
        let v = params.rect.center_v
            + params.rect.half * (2.0 * iv as f64 / res as f64 - 1.0);
        for iu in 0..side {
            let u = params.rect.center_u
                + params.rect.half * (2.0 * iu as f64 / res as f64 - 1.0);
            let dir = cube_to_sphere(params.face.direction(u, v));
            absolute.push(dir * (params.radius + sampler.sample(dir)));
        }
    }

    let mut bounding_radius = 0.0f64;
    let positions: Vec<Vec3> = absolute
        .iter()
        .map(|p| {
            let rel = *p - center;
            bounding_radius = bounding_radius.max(rel.length());
            rel.as_vec3()
        })
        .collect();

    let mut indices = Vec::with_capacity(res * res * 6);
    for iv in 0..res {
        for iu in 0..res {
            let i0 = (iv * side + iu) as u32;
            let i1 = i0 + 1;
            let i2 = i0 + side as u32;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i1, i2, i1, i3, i2]);
        }
    }

    let normals = smooth_normals(&positions, &indices);

    PatchGeometry {
        center,
        bounding_radius,
        positions,
        normals,
        indices,
    }
}

/// Area-weighted smooth normals from a triangle list.
fn smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut accum = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let n = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        accum[a] += n;
        accum[b] += n;
        accum[c] += n;
    }

    accum
        .into_iter()
        .map(|n| n.normalize_or(Vec3::Y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Face, TerrainProfile, UvRect};
    use proptest::prelude::*;

    fn flat_params(resolution: u32) -> PatchParams {
        PatchParams {
            face: Face::PosY,
            rect: UvRect::FULL,
            resolution,
            radius: 1000.0,
            terrain: TerrainProfile {
                amplitude: 0.0,
                ..TerrainProfile::default()
            },
        }
    }

    #[test]
    fn test_buffer_sizes() {
        let geometry = build_patch(&flat_params(4));
        assert_eq!(geometry.vertex_count(), 25);
        assert_eq!(geometry.triangle_count(), 32);
        assert_eq!(geometry.normals.len(), 25);
    }

    #[test]
    fn test_flat_patch_lies_on_sphere() {
        let params = flat_params(8);
        let geometry = build_patch(&params);
        for rel in &geometry.positions {
            let absolute = geometry.center + rel.as_dvec3();
            assert!(
                (absolute.length() - params.radius).abs() < 1e-3,
                "vertex off the sphere: |p| = {}",
                absolute.length()
            );
        }
    }

    #[test]
    fn test_determinism() {
        let params = PatchParams {
            face: Face::NegZ,
            rect: UvRect {
                center_u: 0.25,
                center_v: -0.5,
                half: 0.25,
            },
            resolution: 16,
            radius: 6_371_000.0,
            terrain: TerrainProfile::default(),
        };
        let a = build_patch(&params);
        let b = build_patch(&params);
        assert_eq!(a.center, b.center);
        assert_eq!(a.positions, b.positions);
        assert_eq!(a.normals, b.normals);
        assert_eq!(a.indices, b.indices);
    }

    #[test]
    fn test_normals_point_outward() {
        let geometry = build_patch(&flat_params(8));
        let outward = geometry.center.normalize().as_vec3();
        for n in &geometry.normals {
            assert!(
                n.dot(outward) > 0.5,
                "normal {n:?} does not face outward from the sphere"
            );
        }
    }

    #[test]
    fn test_bounding_radius_contains_all_vertices() {
        let params = PatchParams {
            face: Face::PosX,
            rect: UvRect::FULL,
            resolution: 12,
            radius: 6_371_000.0,
            terrain: TerrainProfile::default(),
        };
        let geometry = build_patch(&params);
        for rel in &geometry.positions {
            assert!(f64::from(rel.length()) <= geometry.bounding_radius + 1.0);
        }
    }

    proptest! {
        #[test]
        fn prop_indices_in_range(resolution in 1u32..24) {
            let geometry = build_patch(&flat_params(resolution));
            let verts = geometry.vertex_count() as u32;
            for &i in &geometry.indices {
                prop_assert!(i < verts);
            }
        }

        #[test]
        fn prop_counts_follow_resolution(resolution in 1u32..24) {
            let geometry = build_patch(&flat_params(resolution));
            let n = resolution as usize;
            prop_assert_eq!(geometry.vertex_count(), (n + 1) * (n + 1));
            prop_assert_eq!(geometry.triangle_count(), 2 * n * n);
        }

        #[test]
        fn prop_normals_unit_length(resolution in 1u32..16) {
            let geometry = build_patch(&flat_params(resolution));
            for n in &geometry.normals {
                prop_assert!((n.length() - 1.0).abs() < 1e-4);
            }
        }
    }
}
