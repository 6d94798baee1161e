//! A planet's terrain surface: six chunk trees around one body.

use glam::DVec3;
use tracing::info;

use crate::culling::Frustum;
use crate::error::Result;
use crate::forge::ChunkForge;
use crate::renderer::Renderer;
use crate::settings::TerrainSettings;
use crate::tree::{ChunkTree, TreeContext};
use tellus_patch::{Face, TerrainProfile};

/// The terrain of one planet: a cube-sphere of six chunk quadtrees.
///
/// The surface owns no chunks itself (they live in the forge's store,
/// tagged with this surface's id) and no threads; it only decides
/// what should exist and leaves the heavy lifting to the forge.
pub struct PlanetTerrain {
    surface: crate::chunk::SurfaceId,
    radius: f64,
    position: DVec3,
    settings: TerrainSettings,
    profile: TerrainProfile,
    trees: Vec<ChunkTree>,
}

impl PlanetTerrain {
    /// Create the surface with six root chunks and submit their builds.
    pub fn new<R: Renderer>(
        radius: f64,
        profile: TerrainProfile,
        settings: TerrainSettings,
        forge: &mut ChunkForge<R>,
        renderer: &mut R,
    ) -> Result<Self> {
        let settings = settings.validated()?;
        let surface = forge.allocate_surface();
        info!(surface = ?surface, radius, "creating planet terrain");

        let mut terrain = Self {
            surface,
            radius,
            position: DVec3::ZERO,
            settings,
            profile,
            trees: Vec::with_capacity(6),
        };
        terrain.build_trees(forge, renderer);
        Ok(terrain)
    }

    /// Planet radius in meters.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// World position of the planet center.
    #[must_use]
    pub fn position(&self) -> DVec3 {
        self.position
    }

    /// Move the planet (following its orbit).
    pub fn set_position(&mut self, position: DVec3) {
        self.position = position;
    }

    /// Drive every face's split/merge pass against the observer.
    ///
    /// The observer position is in world space; chunks and thresholds live
    /// in the planet's local frame.
    pub fn update<R: Renderer>(
        &mut self,
        observer_world: DVec3,
        forge: &mut ChunkForge<R>,
        renderer: &mut R,
    ) {
        let ctx = TreeContext {
            surface: self.surface,
            radius: self.radius,
            settings: &self.settings,
            profile: &self.profile,
            observer: observer_world - self.position,
        };
        for tree in &mut self.trees {
            tree.update(&ctx, forge, renderer);
        }
    }

    /// Sphere-test every live chunk of this surface against the frustums
    /// and push the combined visibility (`enabled && !culled`) to the
    /// renderer.
    ///
    /// Culling only narrows what the LOD lifecycle already shows; it can
    /// never reveal an unbuilt chunk.
    pub fn compute_culling<R: Renderer>(
        &self,
        frustums: &[Frustum],
        forge: &mut ChunkForge<R>,
        renderer: &mut R,
    ) {
        let position = self.position;
        for chunk in forge.store_mut().iter_surface_mut(self.surface) {
            let center = position + chunk.center;
            let visible = frustums
                .iter()
                .any(|f| f.intersects_sphere(center, chunk.bounding_radius));
            chunk.culled = !visible;
            renderer.set_enabled(&mut chunk.mesh, chunk.enabled && !chunk.culled);
        }
    }

    /// Throw every chunk away and regenerate from the roots, e.g. after a
    /// terrain-parameter edit.
    pub fn reset<R: Renderer>(&mut self, forge: &mut ChunkForge<R>, renderer: &mut R) {
        info!(surface = ?self.surface, "resetting planet terrain");
        forge.remove_surface(self.surface, renderer);
        self.trees.clear();
        self.build_trees(forge, renderer);
    }

    /// Replace the terrain profile and regenerate.
    pub fn set_profile<R: Renderer>(
        &mut self,
        profile: TerrainProfile,
        forge: &mut ChunkForge<R>,
        renderer: &mut R,
    ) {
        self.profile = profile;
        self.reset(forge, renderer);
    }

    /// Tear the surface down, disposing every chunk.
    pub fn dispose<R: Renderer>(self, forge: &mut ChunkForge<R>, renderer: &mut R) {
        info!(surface = ?self.surface, "disposing planet terrain");
        forge.remove_surface(self.surface, renderer);
    }

    fn build_trees<R: Renderer>(&mut self, forge: &mut ChunkForge<R>, renderer: &mut R) {
        let ctx = TreeContext {
            surface: self.surface,
            radius: self.radius,
            settings: &self.settings,
            profile: &self.profile,
            observer: DVec3::ZERO,
        };
        self.trees = Face::ALL
            .iter()
            .map(|&face| ChunkTree::new(face, &ctx, forge, renderer))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkId;
    use crate::pool::InlineBackend;
    use crate::renderer::TrackingRenderer;
    use glam::DMat4;

    const RADIUS: f64 = 1000.0;

    fn flat_profile() -> TerrainProfile {
        TerrainProfile {
            amplitude: 0.0,
            ..TerrainProfile::default()
        }
    }

    fn small_settings() -> TerrainSettings {
        TerrainSettings {
            resolution: 2,
            max_depth: 3,
            split_factor: 1.5,
            merge_factor: 2.0,
            collision_depth: 2,
        }
    }

    struct Rig {
        forge: ChunkForge<TrackingRenderer>,
        backend: InlineBackend,
        renderer: TrackingRenderer,
        terrain: PlanetTerrain,
    }

    impl Rig {
        fn new() -> Self {
            let backend = InlineBackend::new(8);
            let mut forge = ChunkForge::with_backend(Box::new(backend.clone()));
            let mut renderer = TrackingRenderer::new();
            let terrain = PlanetTerrain::new(
                RADIUS,
                flat_profile(),
                small_settings(),
                &mut forge,
                &mut renderer,
            )
            .unwrap();
            Self {
                forge,
                backend,
                renderer,
                terrain,
            }
        }

        fn settle(&mut self) {
            for _ in 0..256 {
                self.backend.complete_all();
                self.forge.update(&mut self.renderer);
            }
        }

        fn tick(&mut self, observer: DVec3) {
            self.terrain
                .update(observer, &mut self.forge, &mut self.renderer);
            self.forge.update(&mut self.renderer);
        }
    }

    #[test]
    fn test_rejects_invalid_settings() {
        let mut forge: ChunkForge<TrackingRenderer> =
            ChunkForge::with_backend(Box::new(InlineBackend::new(1)));
        let mut renderer = TrackingRenderer::new();
        let settings = TerrainSettings {
            merge_factor: 0.5,
            ..small_settings()
        };
        assert!(
            PlanetTerrain::new(RADIUS, flat_profile(), settings, &mut forge, &mut renderer)
                .is_err()
        );
    }

    #[test]
    fn test_six_root_chunks_appear() {
        let mut rig = Rig::new();
        assert_eq!(rig.forge.stats().chunks, 6);
        rig.settle();
        assert_eq!(rig.forge.stats().ready_chunks, 6);
        assert_eq!(rig.renderer.visible_count(), 6);
    }

    /// The no-hole invariant: from the first frame the root face is ready,
    /// through any number of splits and merges with builds completing in
    /// adversarial order, the observed face never drops to zero visible
    /// chunks.
    #[test]
    fn test_no_hole_invariant_through_split_and_merge() {
        let mut rig = Rig::new();
        rig.settle();
        let observer_near = DVec3::X * RADIUS * 1.01;
        let observer_far = DVec3::X * RADIUS * 50.0;

        let mut min_visible = usize::MAX;
        let check = |rig: &Rig, min_visible: &mut usize| {
            // Count visible chunks covering the +X face region.
            let covering = rig
                .renderer
                .records()
                .filter(|(_, r)| {
                    r.enabled && r.has_geometry && !r.disposed && r.label.starts_with("PosX")
                })
                .count();
            *min_visible = (*min_visible).min(covering);
        };

        // Approach: splits cascade, completing in LIFO order (newest job
        // first, maximally out of submission order).
        for _ in 0..24 {
            rig.terrain
                .update(observer_near, &mut rig.forge, &mut rig.renderer);
            while rig.backend.queued_count() > 0 {
                let last = rig.backend.queued_count() - 1;
                rig.backend.complete_at(last);
                rig.forge.update(&mut rig.renderer);
                check(&rig, &mut min_visible);
            }
            for _ in 0..8 {
                rig.forge.update(&mut rig.renderer);
                check(&rig, &mut min_visible);
            }
        }

        // Retreat: merges collapse the tree again.
        for _ in 0..24 {
            rig.terrain
                .update(observer_far, &mut rig.forge, &mut rig.renderer);
            while rig.backend.queued_count() > 0 {
                let last = rig.backend.queued_count() - 1;
                rig.backend.complete_at(last);
                rig.forge.update(&mut rig.renderer);
                check(&rig, &mut min_visible);
            }
            for _ in 0..8 {
                rig.forge.update(&mut rig.renderer);
                check(&rig, &mut min_visible);
            }
        }

        assert!(
            min_visible >= 1,
            "a tick left the +X face with no visible chunk"
        );
    }

    #[test]
    fn test_reset_regenerates_every_chunk() {
        let mut rig = Rig::new();
        rig.settle();
        for _ in 0..8 {
            rig.tick(DVec3::X * RADIUS);
            rig.settle();
        }
        let before = rig.forge.stats().chunks;
        assert!(before > 6);

        rig.terrain.reset(&mut rig.forge, &mut rig.renderer);
        assert_eq!(rig.forge.stats().chunks, 6, "reset should restart from roots");
        rig.settle();
        assert_eq!(rig.forge.stats().ready_chunks, 6);
        // No chunk leaked: live meshes equal live chunks.
        assert_eq!(rig.renderer.live_count(), 6);
    }

    #[test]
    fn test_dispose_releases_everything() {
        let mut rig = Rig::new();
        rig.settle();
        rig.terrain.dispose(&mut rig.forge, &mut rig.renderer);
        assert_eq!(rig.forge.stats().chunks, 0);
        assert_eq!(rig.renderer.live_count(), 0);
    }

    #[test]
    fn test_culling_hides_the_far_side() {
        let mut rig = Rig::new();
        rig.settle();
        assert_eq!(rig.renderer.visible_count(), 6);

        // Camera outside the planet on +X looking straight down -X: the
        // -X face is behind the planet horizon-distance-wise but still in
        // the frustum cone; a camera looking away from the planet sees
        // nothing at all.
        let view = DMat4::look_at_rh(
            DVec3::new(RADIUS * 4.0, 0.0, 0.0),
            DVec3::new(RADIUS * 8.0, 0.0, 0.0),
            DVec3::Y,
        );
        let proj = DMat4::perspective_rh(std::f64::consts::FRAC_PI_2, 1.0, 0.1, RADIUS * 100.0);
        let away = Frustum::from_matrix(proj * view);

        rig.terrain
            .compute_culling(&[away], &mut rig.forge, &mut rig.renderer);
        assert_eq!(
            rig.renderer.visible_count(),
            0,
            "looking away from the planet should cull every chunk"
        );

        // Looking back at the planet restores visibility.
        let view = DMat4::look_at_rh(
            DVec3::new(RADIUS * 4.0, 0.0, 0.0),
            DVec3::ZERO,
            DVec3::Y,
        );
        let toward = Frustum::from_matrix(proj * view);
        rig.terrain
            .compute_culling(&[toward], &mut rig.forge, &mut rig.renderer);
        assert!(rig.renderer.visible_count() >= 1);
    }

    #[test]
    fn test_culling_never_reveals_unbuilt_chunks() {
        let mut rig = Rig::new();
        // Nothing built yet; a frustum containing everything must not
        // enable anything.
        let proj = DMat4::perspective_rh(std::f64::consts::FRAC_PI_2, 1.0, 0.1, RADIUS * 100.0);
        let view = DMat4::look_at_rh(DVec3::X * RADIUS * 4.0, DVec3::ZERO, DVec3::Y);
        rig.terrain.compute_culling(
            &[Frustum::from_matrix(proj * view)],
            &mut rig.forge,
            &mut rig.renderer,
        );
        assert_eq!(rig.renderer.visible_count(), 0);
    }

    #[test]
    fn test_moving_planet_moves_the_lod_frame() {
        let mut rig = Rig::new();
        rig.settle();

        // Observer sits where the planet used to be; once the planet moves
        // far away, the observer is far in the planet frame and nothing
        // splits.
        rig.terrain.set_position(DVec3::Z * RADIUS * 500.0);
        rig.tick(DVec3::X * RADIUS * 1.01);
        rig.settle();
        assert_eq!(rig.forge.stats().chunks, 6, "distant planet must not refine");

        // Observer next to the moved planet does cause refinement.
        let near_moved = DVec3::Z * RADIUS * 500.0 + DVec3::X * RADIUS * 1.01;
        rig.tick(near_moved);
        rig.settle();
        assert!(rig.forge.stats().chunks > 6);
    }

    #[test]
    fn test_chunk_ids_cover_leaves() {
        let mut rig = Rig::new();
        rig.settle();
        let mut ids: Vec<ChunkId> = Vec::new();
        for tree in &rig.terrain.trees {
            tree.chunk_ids(&mut ids);
        }
        assert_eq!(ids.len(), 6);
    }
}
