//! The rendering boundary.
//!
//! The terrain core never talks to a scene graph directly; everything it
//! needs from the render/physics engine is behind the [`Renderer`] trait.
//!
//! # Implementations
//!
//! - [`NullRenderer`]: does nothing; for benchmarks and headless runs
//! - [`TrackingRenderer`]: records every mesh's state so tests and tools
//!   can observe what the pipeline did

use std::collections::HashMap;

use tellus_patch::PatchGeometry;

/// The mesh-consuming side of the render/physics engine.
///
/// Handles are owned by the terrain core: a mesh handle is created empty,
/// populated exactly once when its build completes, toggled as LOD and
/// culling decide, and disposed when its chunk retires. Collision handles
/// are only requested for chunks beyond the collision depth threshold.
pub trait Renderer {
    /// Handle to a mesh placed in the scene.
    type MeshHandle;
    /// Handle to a collision shape derived from a mesh.
    type CollisionHandle;

    /// Create an empty, disabled mesh.
    fn create_mesh(&mut self, label: &str) -> Self::MeshHandle;

    /// Upload geometry buffers into a mesh.
    fn apply_geometry(&mut self, mesh: &mut Self::MeshHandle, geometry: &PatchGeometry);

    /// Show or hide a mesh.
    fn set_enabled(&mut self, mesh: &mut Self::MeshHandle, enabled: bool);

    /// Release a mesh and its scene resources.
    fn dispose_mesh(&mut self, mesh: Self::MeshHandle);

    /// Build a collision shape for a populated mesh.
    fn build_collision(
        &mut self,
        mesh: &Self::MeshHandle,
        geometry: &PatchGeometry,
    ) -> Self::CollisionHandle;

    /// Release a collision shape.
    fn dispose_collision(&mut self, collision: Self::CollisionHandle);
}

/// A renderer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl NullRenderer {
    /// Create a no-op renderer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for NullRenderer {
    type MeshHandle = ();
    type CollisionHandle = ();

    fn create_mesh(&mut self, _label: &str) -> Self::MeshHandle {}

    fn apply_geometry(&mut self, _mesh: &mut Self::MeshHandle, _geometry: &PatchGeometry) {}

    fn set_enabled(&mut self, _mesh: &mut Self::MeshHandle, _enabled: bool) {}

    fn dispose_mesh(&mut self, _mesh: Self::MeshHandle) {}

    fn build_collision(
        &mut self,
        _mesh: &Self::MeshHandle,
        _geometry: &PatchGeometry,
    ) -> Self::CollisionHandle {
    }

    fn dispose_collision(&mut self, _collision: Self::CollisionHandle) {}
}

/// Recorded state of one mesh in a [`TrackingRenderer`].
#[derive(Debug, Clone, Default)]
pub struct MeshRecord {
    /// Label the mesh was created with.
    pub label: String,
    /// Whether the mesh is currently shown.
    pub enabled: bool,
    /// Whether geometry was uploaded.
    pub has_geometry: bool,
    /// Vertex count of the uploaded geometry.
    pub vertex_count: usize,
    /// Whether a collision shape was built.
    pub has_collision: bool,
    /// Whether the mesh was disposed. Records outlive disposal so tests
    /// can assert on the full lifecycle.
    pub disposed: bool,
}

/// A renderer that records what happened to every mesh.
#[derive(Debug, Default)]
pub struct TrackingRenderer {
    records: HashMap<u64, MeshRecord>,
    next_id: u64,
}

impl TrackingRenderer {
    /// Create an empty tracking renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The record for a mesh handle.
    #[must_use]
    pub fn record(&self, mesh: u64) -> &MeshRecord {
        &self.records[&mesh]
    }

    /// Number of meshes created over the renderer's lifetime.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.records.len()
    }

    /// Number of meshes currently visible (enabled, populated, not
    /// disposed).
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.enabled && r.has_geometry && !r.disposed)
            .count()
    }

    /// Number of meshes not yet disposed.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.records.values().filter(|r| !r.disposed).count()
    }

    /// Iterate over all records with their handles.
    pub fn records(&self) -> impl Iterator<Item = (u64, &MeshRecord)> {
        self.records.iter().map(|(&id, r)| (id, r))
    }
}

impl Renderer for TrackingRenderer {
    type MeshHandle = u64;
    type CollisionHandle = u64;

    fn create_mesh(&mut self, label: &str) -> Self::MeshHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.records.insert(
            id,
            MeshRecord {
                label: label.to_string(),
                ..MeshRecord::default()
            },
        );
        id
    }

    fn apply_geometry(&mut self, mesh: &mut Self::MeshHandle, geometry: &PatchGeometry) {
        let record = self.records.get_mut(mesh).expect("unknown mesh handle");
        record.has_geometry = true;
        record.vertex_count = geometry.vertex_count();
    }

    fn set_enabled(&mut self, mesh: &mut Self::MeshHandle, enabled: bool) {
        self.records.get_mut(mesh).expect("unknown mesh handle").enabled = enabled;
    }

    fn dispose_mesh(&mut self, mesh: Self::MeshHandle) {
        let record = self.records.get_mut(&mesh).expect("unknown mesh handle");
        record.disposed = true;
        record.enabled = false;
    }

    fn build_collision(
        &mut self,
        mesh: &Self::MeshHandle,
        _geometry: &PatchGeometry,
    ) -> Self::CollisionHandle {
        self.records.get_mut(mesh).expect("unknown mesh handle").has_collision = true;
        *mesh
    }

    fn dispose_collision(&mut self, collision: Self::CollisionHandle) {
        if let Some(record) = self.records.get_mut(&collision) {
            record.has_collision = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tellus_patch::{Face, PatchParams, TerrainProfile, UvRect, build_patch};

    fn small_geometry() -> PatchGeometry {
        build_patch(&PatchParams {
            face: Face::PosX,
            rect: UvRect::FULL,
            resolution: 2,
            radius: 100.0,
            terrain: TerrainProfile {
                amplitude: 0.0,
                ..TerrainProfile::default()
            },
        })
    }

    #[test]
    fn test_null_renderer_is_usable() {
        let mut renderer = NullRenderer::new();
        let mut mesh = renderer.create_mesh("patch");
        renderer.apply_geometry(&mut mesh, &small_geometry());
        renderer.set_enabled(&mut mesh, true);
        renderer.dispose_mesh(mesh);
    }

    #[test]
    fn test_tracking_renderer_lifecycle() {
        let mut renderer = TrackingRenderer::new();
        let mut mesh = renderer.create_mesh("PosX:root");
        assert_eq!(renderer.created_count(), 1);
        assert_eq!(renderer.visible_count(), 0);

        renderer.apply_geometry(&mut mesh, &small_geometry());
        renderer.set_enabled(&mut mesh, true);
        assert_eq!(renderer.visible_count(), 1);
        assert_eq!(renderer.record(mesh).vertex_count, 9);
        assert_eq!(renderer.record(mesh).label, "PosX:root");

        renderer.dispose_mesh(mesh);
        assert_eq!(renderer.visible_count(), 0);
        assert_eq!(renderer.live_count(), 0);
        assert!(renderer.record(mesh).disposed);
    }

    #[test]
    fn test_tracking_renderer_collision() {
        let mut renderer = TrackingRenderer::new();
        let mut mesh = renderer.create_mesh("c");
        renderer.apply_geometry(&mut mesh, &small_geometry());
        let collision = renderer.build_collision(&mesh, &small_geometry());
        assert!(renderer.record(mesh).has_collision);
        renderer.dispose_collision(collision);
        assert!(!renderer.record(mesh).has_collision);
    }
}
